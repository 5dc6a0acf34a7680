use chrono::NaiveDate;
use serde::Serialize;

/// Row of the read-only view the host application maintains: installments
/// that are unpaid and have a contactable phone. The selector applies only
/// date-window and settings filtering on top of this.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotifiableInstallment {
    pub installment_id: String,
    pub tenant_id: String,
    pub loan_id: String,
    pub client_id: String,
    pub installment_number: i64,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub client_name: String,
    pub phone: String,
}
