use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::scheduler::{self, RunSummary};
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    /// Calendar date to run for; defaults to the server's local date.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// Trigger one scheduler pass. Meant to be hit on an external cadence
/// (e.g. hourly); each run is independent and dedups against the ledger.
pub async fn run(
    State(state): State<SharedState>,
    body: Option<Json<RunRequest>>,
) -> Result<Json<RunResponse>, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let today = request
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let summary = scheduler::run_once(&state, today).await?;
    Ok(Json(RunResponse { ok: true, summary }))
}
