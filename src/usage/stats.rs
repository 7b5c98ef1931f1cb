//! Read-side aggregation over ledger entries.

use super::UsageEntry;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Totals for one summary provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderTotals {
    pub cost_usd: f64,
    pub tokens: u64,
    pub videos: usize,
}

/// Totals over a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_cost_usd: f64,
    pub total_tokens: u64,
    pub total_minutes: f64,
    pub videos: usize,
    /// Keyed by summary provider (the model name).
    pub by_provider: BTreeMap<String, ProviderTotals>,
}

/// Totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub summary: UsageSummary,
}

impl MonthlyTotal {
    /// `YYYY-MM`.
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

pub fn summarize<'a>(entries: impl IntoIterator<Item = &'a UsageEntry>) -> UsageSummary {
    let mut summary = UsageSummary::default();
    for entry in entries {
        summary.total_cost_usd += entry.cost_usd;
        summary.total_tokens += u64::from(entry.tokens_used);
        summary.total_minutes += entry.audio_duration_seconds / 60.0;
        summary.videos += 1;

        let provider = summary
            .by_provider
            .entry(entry.summary_provider.clone())
            .or_default();
        provider.cost_usd += entry.cost_usd;
        provider.tokens += u64::from(entry.tokens_used);
        provider.videos += 1;
    }
    summary
}

/// Entries whose UTC timestamp falls in the given month.
pub fn entries_in_month(entries: &[UsageEntry], year: i32, month: u32) -> Vec<&UsageEntry> {
    entries
        .iter()
        .filter(|e| e.timestamp.year() == year && e.timestamp.month() == month)
        .collect()
}

/// One total per month that has entries, most recent month first.
pub fn monthly_totals(entries: &[UsageEntry]) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<(i32, u32), Vec<&UsageEntry>> = BTreeMap::new();
    for entry in entries {
        months
            .entry((entry.timestamp.year(), entry.timestamp.month()))
            .or_default()
            .push(entry);
    }

    months
        .into_iter()
        .rev()
        .map(|((year, month), items)| MonthlyTotal {
            year,
            month,
            summary: summarize(items),
        })
        .collect()
}
