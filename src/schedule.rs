use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AutomationSettings, NotifiableInstallment};

/// The three notification kinds, distinguished by the installment's due
/// date relative to today. Mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Early,
    DueToday,
    Overdue,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Early => "early",
            NotificationKind::DueToday => "due_today",
            NotificationKind::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One installment selected as needing contact today. Computed, never
/// stored; the ledger records the attempt.
#[derive(Debug, Clone)]
pub struct NotificationTarget {
    pub installment_id: String,
    pub tenant_id: String,
    pub loan_id: String,
    pub client_id: String,
    pub installment_number: i64,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub days_overdue: i64,
    pub client_name: String,
    pub phone: String,
    pub kind: NotificationKind,
}

/// Classify one due date against today and the tenant's rules.
/// Returns `None` when the installment needs no contact today.
pub fn classify(
    due_date: NaiveDate,
    today: NaiveDate,
    settings: &AutomationSettings,
) -> Option<NotificationKind> {
    if due_date == today {
        return settings.send_due_today.then_some(NotificationKind::DueToday);
    }
    if due_date < today {
        return settings.send_overdue.then_some(NotificationKind::Overdue);
    }
    // Due strictly after today: early window is [today+1, today+early_days].
    if settings.send_early {
        let days_ahead = (due_date - today).num_days();
        if days_ahead <= settings.early_days {
            return Some(NotificationKind::Early);
        }
    }
    None
}

/// Compute today's targets for one tenant. Installments whose due date
/// falls outside every configured window are dropped; everything else is
/// projected into a target with its kind and days-overdue count.
pub fn select_targets(
    today: NaiveDate,
    settings: &AutomationSettings,
    installments: &[NotifiableInstallment],
) -> Vec<NotificationTarget> {
    if !settings.enabled {
        return Vec::new();
    }

    installments
        .iter()
        .filter_map(|inst| {
            let kind = classify(inst.due_date, today, settings)?;
            let days_overdue = match kind {
                NotificationKind::Overdue => (today - inst.due_date).num_days(),
                _ => 0,
            };
            Some(NotificationTarget {
                installment_id: inst.installment_id.clone(),
                tenant_id: inst.tenant_id.clone(),
                loan_id: inst.loan_id.clone(),
                client_id: inst.client_id.clone(),
                installment_number: inst.installment_number,
                due_date: inst.due_date,
                amount: inst.amount,
                days_overdue,
                client_name: inst.client_name.clone(),
                phone: inst.phone.clone(),
                kind,
            })
        })
        .collect()
}

/// The tenant template configured for a given kind.
pub fn template_for<'a>(settings: &'a AutomationSettings, kind: NotificationKind) -> &'a str {
    match kind {
        NotificationKind::Early => &settings.template_early,
        NotificationKind::DueToday => &settings.template_due_today,
        NotificationKind::Overdue => &settings.template_overdue,
    }
}

/// Flat field map handed to the template renderer. Values are formatted
/// pt-BR style, matching what borrowers expect to read.
pub fn template_data(target: &NotificationTarget) -> HashMap<String, String> {
    let mut data = HashMap::new();
    data.insert("nome".to_string(), target.client_name.clone());
    data.insert(
        "valor".to_string(),
        format!("{:.2}", target.amount).replace('.', ","),
    );
    data.insert(
        "vencimento".to_string(),
        target.due_date.format("%d/%m/%Y").to_string(),
    );
    data.insert(
        "parcela".to_string(),
        target.installment_number.to_string(),
    );
    data.insert(
        "dias_atraso".to_string(),
        target.days_overdue.to_string(),
    );
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn settings() -> AutomationSettings {
        AutomationSettings {
            tenant_id: "t1".into(),
            enabled: true,
            early_days: 3,
            send_due_today: true,
            send_overdue: true,
            send_early: true,
            template_due_today: "due".into(),
            template_overdue: "late".into(),
            template_early: "soon".into(),
            updated_at: Utc::now(),
        }
    }

    fn installment(id: &str, due: NaiveDate) -> NotifiableInstallment {
        NotifiableInstallment {
            installment_id: id.into(),
            tenant_id: "t1".into(),
            loan_id: "l1".into(),
            client_id: "c1".into(),
            installment_number: 2,
            due_date: due,
            amount: 150.0,
            client_name: "Ana".into(),
            phone: "11999887766".into(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn kinds_are_mutually_exclusive_by_date() {
        let s = settings();
        let today = day("2025-03-10");
        assert_eq!(
            classify(today, today, &s),
            Some(NotificationKind::DueToday)
        );
        assert_eq!(
            classify(day("2025-03-09"), today, &s),
            Some(NotificationKind::Overdue)
        );
        assert_eq!(
            classify(day("2025-03-11"), today, &s),
            Some(NotificationKind::Early)
        );
    }

    #[test]
    fn early_window_is_inclusive_of_last_day() {
        let s = settings();
        let today = day("2025-03-10");
        // earlyDays=3: D+3 in, D+4 out, D itself is due_today not early.
        assert_eq!(
            classify(day("2025-03-13"), today, &s),
            Some(NotificationKind::Early)
        );
        assert_eq!(classify(day("2025-03-14"), today, &s), None);
        assert_ne!(
            classify(today, today, &s),
            Some(NotificationKind::Early)
        );
    }

    #[test]
    fn disabled_flags_suppress_each_kind() {
        let today = day("2025-03-10");
        let mut s = settings();
        s.send_due_today = false;
        assert_eq!(classify(today, today, &s), None);

        let mut s = settings();
        s.send_overdue = false;
        assert_eq!(classify(day("2025-03-01"), today, &s), None);

        let mut s = settings();
        s.send_early = false;
        assert_eq!(classify(day("2025-03-12"), today, &s), None);
    }

    #[test]
    fn disabled_tenant_selects_nothing() {
        let mut s = settings();
        s.enabled = false;
        let targets = select_targets(
            day("2025-03-10"),
            &s,
            &[installment("i1", day("2025-03-10"))],
        );
        assert!(targets.is_empty());
    }

    #[test]
    fn days_overdue_only_set_for_overdue() {
        let s = settings();
        let today = day("2025-03-10");
        let targets = select_targets(
            today,
            &s,
            &[
                installment("i1", day("2025-03-05")),
                installment("i2", today),
            ],
        );
        assert_eq!(targets.len(), 2);
        let overdue = targets.iter().find(|t| t.installment_id == "i1").unwrap();
        assert_eq!(overdue.kind, NotificationKind::Overdue);
        assert_eq!(overdue.days_overdue, 5);
        let due = targets.iter().find(|t| t.installment_id == "i2").unwrap();
        assert_eq!(due.days_overdue, 0);
    }

    #[test]
    fn template_data_formats_pt_br() {
        let s = settings();
        let today = day("2025-03-10");
        let targets = select_targets(today, &s, &[installment("i1", day("2025-03-05"))]);
        let data = template_data(&targets[0]);
        assert_eq!(data["nome"], "Ana");
        assert_eq!(data["valor"], "150,00");
        assert_eq!(data["vencimento"], "05/03/2025");
        assert_eq!(data["parcela"], "2");
        assert_eq!(data["dias_atraso"], "5");
    }
}
