use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::dispatch::BatchItem;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub tenant_id: String,
    pub to: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
}

pub async fn send(
    State(state): State<SharedState>,
    Json(body): Json<SendRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let to = state
        .dispatcher
        .send_one(&body.tenant_id, &body.to, &body.message)
        .await?;
    Ok(Json(json!({
        "ok": true,
        "tenant_id": body.tenant_id,
        "to": to,
    })))
}

/// Batch send with partial-failure accounting. The response status keeps
/// the three outcomes distinct: 200 all delivered, 207 some failed, 502
/// every item failed.
pub async fn send_batch(
    State(state): State<SharedState>,
    Json(body): Json<BatchRequest>,
) -> Result<Response, AppError> {
    if body.items.is_empty() {
        return Err(AppError::InvalidInput("items must not be empty".into()));
    }

    let outcome = state.dispatcher.send_batch(&body.items).await;

    let status = if outcome.failed == 0 {
        StatusCode::OK
    } else if outcome.failed < outcome.total {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::BAD_GATEWAY
    };

    let response = json!({
        "ok": outcome.failed == 0,
        "total": outcome.total,
        "failed": outcome.failed,
        "results": outcome.results,
    });

    Ok((status, Json(response)).into_response())
}
