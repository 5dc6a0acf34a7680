use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One notification attempt. The tuple (tenant_id, kind, installment_id,
/// send_date) is unique — the dedup key guaranteeing at most one
/// notification of a given kind per installment per calendar day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageLogEntry {
    pub id: String,
    pub tenant_id: String,
    pub kind: String,
    pub installment_id: String,
    pub loan_id: String,
    pub client_id: String,
    pub to_phone: String,
    pub message: String,
    /// queued | sent | failed
    pub status: String,
    pub send_date: NaiveDate,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
