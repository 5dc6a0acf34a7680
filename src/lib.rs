pub mod auth;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod phone;
pub mod provider;
pub mod qr;
pub mod routes;
pub mod schedule;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod template;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::provider::ChatProvider;
use crate::session::SessionRegistry;
use crate::state::{AppState, SharedState};

pub fn build_app(
    pool: SqlitePool,
    config: Config,
    provider: Arc<dyn ChatProvider>,
) -> (Router, SharedState) {
    let sessions = Arc::new(SessionRegistry::new(
        provider,
        config.session_root.clone(),
    ));
    let dispatcher = Dispatcher::new(
        sessions.clone(),
        Duration::from_secs(config.send_timeout_secs),
    );

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        sessions,
        dispatcher,
    });

    let protected = routes::api_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth::require_secret,
    ));

    let app = Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}
