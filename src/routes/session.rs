use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::qr;
use crate::session::{SessionSnapshot, SessionStatus};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct TenantBody {
    pub tenant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub ok: bool,
    pub tenant_id: String,
    pub status: SessionStatus,
    pub has_qr: bool,
    pub last_error: Option<String>,
    pub last_event_at: DateTime<Utc>,
}

impl SessionResponse {
    fn from_snapshot(tenant_id: &str, snap: &SessionSnapshot) -> Self {
        Self {
            ok: true,
            tenant_id: tenant_id.to_string(),
            status: snap.status,
            has_qr: snap.qr_payload.is_some(),
            last_error: snap.last_error.clone(),
            last_event_at: snap.last_event_at,
        }
    }
}

fn require_tenant(tenant_id: &str) -> Result<&str, AppError> {
    let trimmed = tenant_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("tenant_id is required".into()));
    }
    Ok(trimmed)
}

/// Lazily create/start a tenant session and report its current state.
/// Idempotent for live sessions; a session that died (auth_failure,
/// disconnected, error) is replaced by a fresh one.
pub async fn init(
    State(state): State<SharedState>,
    Json(body): Json<TenantBody>,
) -> Result<Json<SessionResponse>, AppError> {
    let tenant_id = require_tenant(&body.tenant_id)?;
    let session = state.sessions.init(tenant_id);
    Ok(Json(SessionResponse::from_snapshot(
        tenant_id,
        &session.snapshot(),
    )))
}

/// Poll session state. Referencing an unknown tenant creates its session,
/// so after a logout this reports a freshly initializing one.
pub async fn status(
    State(state): State<SharedState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<SessionResponse>, AppError> {
    let tenant_id = require_tenant(&query.tenant_id)?;
    let session = state.sessions.ensure(tenant_id);
    Ok(Json(SessionResponse::from_snapshot(
        tenant_id,
        &session.snapshot(),
    )))
}

/// Current pairing QR as a PNG data-URL, or null outside the qr state.
pub async fn qr(
    State(state): State<SharedState>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tenant_id = require_tenant(&query.tenant_id)?;
    let session = state.sessions.ensure(tenant_id);
    let snap = session.snapshot();

    let qr_image = match &snap.qr_payload {
        Some(payload) => Some(qr::to_data_url(payload).map_err(AppError::Internal)?),
        None => None,
    };

    let mut body = serde_json::to_value(SessionResponse::from_snapshot(tenant_id, &snap))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    body["qr"] = match qr_image {
        Some(url) => json!(url),
        None => serde_json::Value::Null,
    };
    Ok(Json(body))
}

/// Tear the tenant's session down. The next call referencing the tenant
/// starts a brand-new one.
pub async fn logout(
    State(state): State<SharedState>,
    Json(body): Json<TenantBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tenant_id = require_tenant(&body.tenant_id)?;
    let removed = state.sessions.logout(tenant_id).await;
    Ok(Json(json!({
        "ok": true,
        "tenant_id": tenant_id,
        "status": if removed { "logged_out" } else { "not_found" },
    })))
}
