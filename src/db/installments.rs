use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::models::NotifiableInstallment;

/// Everything due up to and including `through` (overdue rows have no
/// lower bound — an installment stays notifiable until paid or removed
/// from the view by the host application).
pub async fn list_due_through(
    pool: &SqlitePool,
    tenant_id: &str,
    through: NaiveDate,
) -> Result<Vec<NotifiableInstallment>, sqlx::Error> {
    sqlx::query_as::<_, NotifiableInstallment>(
        "SELECT * FROM notifiable_installments
         WHERE tenant_id = ?1 AND due_date <= ?2
         ORDER BY due_date ASC, installment_id ASC",
    )
    .bind(tenant_id)
    .bind(through)
    .fetch_all(pool)
    .await
}

/// The view is populated by the host application; this insert exists for
/// it (and for tests) to feed rows in.
pub async fn insert(
    pool: &SqlitePool,
    row: &NotifiableInstallment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifiable_installments
             (installment_id, tenant_id, loan_id, client_id, installment_number,
              due_date, amount, client_name, phone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&row.installment_id)
    .bind(&row.tenant_id)
    .bind(&row.loan_id)
    .bind(&row.client_id)
    .bind(row.installment_number)
    .bind(row.due_date)
    .bind(row.amount)
    .bind(&row.client_name)
    .bind(&row.phone)
    .execute(pool)
    .await?;
    Ok(())
}
