use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::session::SessionRegistry;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub sessions: Arc<SessionRegistry>,
    pub dispatcher: Dispatcher,
}
