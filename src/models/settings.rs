use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-tenant notification rules, maintained by the host application and
/// read-only here.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AutomationSettings {
    pub tenant_id: String,
    pub enabled: bool,
    /// How many days ahead the early-reminder window reaches.
    pub early_days: i64,
    pub send_due_today: bool,
    pub send_overdue: bool,
    pub send_early: bool,
    pub template_due_today: String,
    pub template_overdue: String,
    pub template_early: String,
    pub updated_at: DateTime<Utc>,
}
