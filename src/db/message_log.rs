use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::MessageLogEntry;
use crate::schedule::NotificationTarget;

/// Upstream failure payloads are kept for operator diagnosis but bounded.
const MAX_ERROR_LEN: usize = 500;

/// Dedup lookup: every (kind, installment_id) pair already attempted for
/// this tenant today, regardless of outcome. A `queued` row counts — the
/// attempt outcome is unknown and re-sending risks a duplicate message.
pub async fn attempted_keys(
    pool: &SqlitePool,
    tenant_id: &str,
    send_date: NaiveDate,
) -> Result<HashSet<(String, String)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT kind, installment_id FROM message_log
         WHERE tenant_id = ?1 AND send_date = ?2",
    )
    .bind(tenant_id)
    .bind(send_date)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Insert the `queued` row before the delivery attempt. The unique index
/// on (tenant_id, kind, installment_id, send_date) is the hard backstop
/// against double notification within a day.
pub async fn insert_queued(
    pool: &SqlitePool,
    target: &NotificationTarget,
    to_phone: &str,
    message: &str,
    send_date: NaiveDate,
) -> Result<MessageLogEntry, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, MessageLogEntry>(
        "INSERT INTO message_log
             (id, tenant_id, kind, installment_id, loan_id, client_id,
              to_phone, message, status, send_date, error, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'queued', ?9, NULL, ?10, ?10)
         RETURNING *",
    )
    .bind(Uuid::now_v7().to_string())
    .bind(&target.tenant_id)
    .bind(target.kind.as_str())
    .bind(&target.installment_id)
    .bind(&target.loan_id)
    .bind(&target.client_id)
    .bind(to_phone)
    .bind(message)
    .bind(send_date)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn mark_sent(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE message_log SET status = 'sent', updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_failed(pool: &SqlitePool, id: &str, error: &str) -> Result<(), sqlx::Error> {
    let truncated: String = error.chars().take(MAX_ERROR_LEN).collect();
    sqlx::query(
        "UPDATE message_log SET status = 'failed', error = ?2, updated_at = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(truncated)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// A row still `queued` long after its attempt means the process died
/// mid-dispatch. Mark it failed so operators see it; the unique key is
/// per-day, so the installment becomes eligible again on later days.
pub async fn reconcile_stale_queued(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE message_log
         SET status = 'failed', error = 'Reconciled: attempt outcome unknown', updated_at = ?2
         WHERE status = 'queued' AND created_at < ?1",
    )
    .bind(cutoff)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_for_day(
    pool: &SqlitePool,
    tenant_id: &str,
    send_date: NaiveDate,
) -> Result<Vec<MessageLogEntry>, sqlx::Error> {
    sqlx::query_as::<_, MessageLogEntry>(
        "SELECT * FROM message_log
         WHERE tenant_id = ?1 AND send_date = ?2
         ORDER BY created_at ASC",
    )
    .bind(tenant_id)
    .bind(send_date)
    .fetch_all(pool)
    .await
}
