pub mod scheduler;
pub mod send;
pub mod session;

use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde_json::json;

use crate::state::SharedState;

/// Everything behind the shared-secret credential.
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/whatsapp/init", post(session::init))
        .route("/whatsapp/status", get(session::status))
        .route("/whatsapp/qr", get(session::qr))
        .route("/whatsapp/send", post(send::send))
        .route("/send-batch", post(send::send_batch))
        .route("/whatsapp/logout", post(session::logout))
        .route("/scheduler/run", post(scheduler::run))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "status": "ok",
        "time": chrono::Utc::now(),
    }))
}
