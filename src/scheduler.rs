use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::db;
use crate::error::AppError;
use crate::schedule;
use crate::session::SessionStatus;
use crate::state::SharedState;
use crate::template;

/// Ledger rows still `queued` after this long are reconciled to `failed`
/// at the start of a run (attempt outcome unknown; see DESIGN.md).
const STALE_QUEUED_HOURS: i64 = 24;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub tenants: usize,
    pub tenants_not_ready: usize,
    pub selected: usize,
    pub skipped_duplicates: usize,
    pub skipped_blank: usize,
    pub sent: usize,
    pub failed: usize,
}

/// One scheduler pass: selection → dedup → render → dispatch → log, per
/// enabled tenant. Self-contained; the only state carried between runs is
/// the message log itself.
pub async fn run_once(state: &SharedState, today: NaiveDate) -> Result<RunSummary, AppError> {
    let cutoff = Utc::now() - ChronoDuration::hours(STALE_QUEUED_HOURS);
    match db::message_log::reconcile_stale_queued(&state.pool, cutoff).await {
        Ok(0) => {}
        Ok(n) => tracing::warn!("Reconciled {n} stale queued message log rows"),
        Err(e) => tracing::warn!("Stale queue reconciliation failed: {e}"),
    }

    let tenants = db::settings::list_enabled(&state.pool).await?;

    let mut summary = RunSummary {
        date: today,
        tenants: tenants.len(),
        tenants_not_ready: 0,
        selected: 0,
        skipped_duplicates: 0,
        skipped_blank: 0,
        sent: 0,
        failed: 0,
    };

    for settings in &tenants {
        let tenant_id = &settings.tenant_id;

        // Warm the session up regardless; if it is not ready yet, skip the
        // whole tenant rather than burning today's one attempt per target
        // on guaranteed failures.
        let session = state.sessions.ensure(tenant_id);
        if session.status() != SessionStatus::Ready {
            tracing::warn!(
                "Skipping tenant {tenant_id}: session status {}",
                session.status()
            );
            summary.tenants_not_ready += 1;
            continue;
        }

        let through = today + ChronoDuration::days(settings.early_days.max(0));
        let installments =
            db::installments::list_due_through(&state.pool, tenant_id, through).await?;
        let targets = schedule::select_targets(today, settings, &installments);
        summary.selected += targets.len();

        let attempted = db::message_log::attempted_keys(&state.pool, tenant_id, today).await?;

        for target in targets {
            let key = (target.kind.as_str().to_string(), target.installment_id.clone());
            if attempted.contains(&key) {
                summary.skipped_duplicates += 1;
                continue;
            }

            let body = template::render(
                schedule::template_for(settings, target.kind),
                &schedule::template_data(&target),
            );
            if template::is_blank(&body) {
                tracing::warn!(
                    "Skipping {} installment {} for {tenant_id}: rendered message is blank",
                    target.kind,
                    target.installment_id
                );
                summary.skipped_blank += 1;
                continue;
            }

            let to_phone = crate::phone::normalize(&target.phone)
                .unwrap_or_else(|| target.phone.clone());

            // Queued row first; delivery second; outcome third. A unique
            // violation here means a concurrent run got there first.
            let entry = match db::message_log::insert_queued(
                &state.pool,
                &target,
                &to_phone,
                &body,
                today,
            )
            .await
            {
                Ok(entry) => entry,
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    summary.skipped_duplicates += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match state
                .dispatcher
                .send_one(tenant_id, &target.phone, &body)
                .await
            {
                Ok(_) => {
                    summary.sent += 1;
                    if let Err(e) = db::message_log::mark_sent(&state.pool, &entry.id).await {
                        tracing::warn!("Failed to mark message {} sent: {e}", entry.id);
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        "Dispatch of {} installment {} for {tenant_id} failed: {e}",
                        target.kind,
                        target.installment_id
                    );
                    if let Err(log_err) =
                        db::message_log::mark_failed(&state.pool, &entry.id, &e.to_string()).await
                    {
                        tracing::warn!("Failed to mark message {} failed: {log_err}", entry.id);
                    }
                }
            }
        }
    }

    tracing::info!(
        "Scheduler run for {today}: {} sent, {} failed, {} duplicate, {} blank ({} tenants, {} not ready)",
        summary.sent,
        summary.failed,
        summary.skipped_duplicates,
        summary.skipped_blank,
        summary.tenants,
        summary.tenants_not_ready,
    );

    Ok(summary)
}

/// Optional in-process cadence for deployments without an external cron.
/// Runs until the shutdown signal flips.
pub async fn run_loop(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let interval = std::time::Duration::from_secs(state.config.scheduler_interval_secs);
    tracing::info!("Scheduler loop started (every {}s)", interval.as_secs());

    loop {
        if *shutdown.borrow() {
            break;
        }

        let today = chrono::Local::now().date_naive();
        if let Err(e) = run_once(&state, today).await {
            tracing::error!("Scheduler run failed: {e}");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::info!("Scheduler loop stopped");
}
