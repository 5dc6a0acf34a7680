use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::SharedState;

/// Shared-secret bearer check for everything except /health.
///
/// A missing configured secret is a deployment mistake: answer 500 at the
/// endpoint instead of letting the gateway run open or crash the process.
pub async fn require_secret(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.api_secret.as_deref() else {
        return Err(AppError::Configuration(
            "AVISA_API_SECRET is not configured".into(),
        ));
    };

    let presented = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer credential".into()))?;

    if presented.as_bytes().ct_eq(secret.as_bytes()).into() {
        Ok(next.run(request).await)
    } else {
        Err(AppError::Unauthorized("Invalid credential".into()))
    }
}
