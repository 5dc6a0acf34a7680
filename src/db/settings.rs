use sqlx::SqlitePool;

use crate::models::AutomationSettings;

/// Tenants whose automation is switched on — the scheduler's work list.
pub async fn list_enabled(pool: &SqlitePool) -> Result<Vec<AutomationSettings>, sqlx::Error> {
    sqlx::query_as::<_, AutomationSettings>(
        "SELECT * FROM automation_settings WHERE enabled = 1 ORDER BY tenant_id",
    )
    .fetch_all(pool)
    .await
}

/// Settings are owned by the host application; this upsert exists for it
/// (and for tests) to seed a tenant's rules.
pub async fn upsert(
    pool: &SqlitePool,
    settings: &AutomationSettings,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO automation_settings
             (tenant_id, enabled, early_days, send_due_today, send_overdue, send_early,
              template_due_today, template_overdue, template_early, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(tenant_id) DO UPDATE SET
             enabled = excluded.enabled,
             early_days = excluded.early_days,
             send_due_today = excluded.send_due_today,
             send_overdue = excluded.send_overdue,
             send_early = excluded.send_early,
             template_due_today = excluded.template_due_today,
             template_overdue = excluded.template_overdue,
             template_early = excluded.template_early,
             updated_at = excluded.updated_at",
    )
    .bind(&settings.tenant_id)
    .bind(settings.enabled)
    .bind(settings.early_days)
    .bind(settings.send_due_today)
    .bind(settings.send_overdue)
    .bind(settings.send_early)
    .bind(&settings.template_due_today)
    .bind(&settings.template_overdue)
    .bind(&settings.template_early)
    .bind(settings.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}
