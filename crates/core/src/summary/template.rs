//! Deterministic narrative used when the narrative oracle is unavailable

use chrono::NaiveDate;
use focusledger_domain::constants::DEFAULT_TOP_APPS;
use focusledger_domain::utils::format::format_duration;
use focusledger_domain::{MemberReport, SummaryItem};

#[derive(Debug, Clone, Copy)]
pub struct NarrativeTemplate {
    top_apps: usize,
}

impl NarrativeTemplate {
    pub fn new(top_apps: usize) -> Self {
        Self { top_apps: top_apps.max(1) }
    }

    /// `items` are expected sorted by duration, longest first.
    pub fn daily(&self, subject: &str, date: NaiveDate, items: &[SummaryItem]) -> String {
        let total: f64 = items.iter().map(|i| i.total_seconds).sum();
        if items.is_empty() || total <= 0.0 {
            return format!("No tracked activity for {subject} on {date}.");
        }
        let billable: f64 = items.iter().map(|i| i.billable_seconds).sum();
        format!(
            "{subject} tracked {} on {date} ({} billable). Top apps: {}.",
            format_duration(total),
            format_duration(billable),
            self.top_list(items)
        )
    }

    pub fn team(
        &self,
        project: &str,
        date: NaiveDate,
        items: &[SummaryItem],
        members: &[MemberReport],
    ) -> String {
        let total: f64 = items.iter().map(|i| i.total_seconds).sum();
        if items.is_empty() || total <= 0.0 {
            return format!(
                "No tracked activity on {project} for {date} across {} member(s).",
                members.len()
            );
        }
        let billable: f64 = items.iter().map(|i| i.billable_seconds).sum();
        let active = members.iter().filter(|m| m.total_seconds > 0.0).count();
        format!(
            "{project}: {active} of {} member(s) tracked {} on {date} ({} billable). Top apps: {}.",
            members.len(),
            format_duration(total),
            format_duration(billable),
            self.top_list(items)
        )
    }

    fn top_list(&self, items: &[SummaryItem]) -> String {
        items
            .iter()
            .take(self.top_apps)
            .map(|item| format!("{} ({})", item.app_name, format_duration(item.total_seconds)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for NarrativeTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_APPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(app: &str, total: f64, billable: f64) -> SummaryItem {
        SummaryItem {
            app_name: app.into(),
            total_seconds: total,
            billable_seconds: billable,
            interval_count: 1,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn daily_lists_top_apps_and_totals() {
        let text = NarrativeTemplate::new(2).daily(
            "alice",
            date(),
            &[item("code", 3_600.0, 3_600.0), item("slack", 600.0, 0.0), item("zoom", 60.0, 0.0)],
        );
        assert_eq!(
            text,
            "alice tracked 1h 11m on 2026-03-02 (1h 00m billable). Top apps: code (1h 00m), slack (10m 00s)."
        );
    }

    #[test]
    fn empty_day_has_explicit_text() {
        assert_eq!(
            NarrativeTemplate::default().daily("bob", date(), &[]),
            "No tracked activity for bob on 2026-03-02."
        );
    }
}
