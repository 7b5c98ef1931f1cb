//! Usage command - cost and token reports from the usage ledger.

use crate::cli::{format_cost, preview, Output, UsageAction};
use crate::config::Settings;
use crate::usage::{entries_in_month, monthly_totals, summarize, UsageLedger, UsageSummary};
use anyhow::{anyhow, Result};
use chrono::{Datelike, Local};
use console::style;
use std::io::{self, Write};

/// Runs shown by `--list`.
const HISTORY_ROWS: usize = 50;

/// Parse `YYYY-MM`.
fn parse_month(value: &str) -> Result<(i32, u32)> {
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| anyhow!("Invalid month '{}', expected YYYY-MM", value))?;
    let year: i32 = year.parse().map_err(|_| anyhow!("Invalid year in '{}'", value))?;
    let month: u32 = month.parse().map_err(|_| anyhow!("Invalid month in '{}'", value))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("Month must be between 01 and 12, got '{}'", value));
    }
    Ok((year, month))
}

/// Run the usage command.
pub fn run_usage(
    action: Option<&UsageAction>,
    all: bool,
    month: Option<&str>,
    list: bool,
    settings: &Settings,
) -> Result<()> {
    let ledger = UsageLedger::from_settings(settings)?;

    if let Some(UsageAction::Clear { yes }) = action {
        return clear(&ledger, *yes);
    }

    let entries = ledger.entries();
    if entries.is_empty() {
        Output::info("No usage recorded yet.");
        Output::kv("Ledger", &ledger.location());
        return Ok(());
    }

    if all {
        Output::header("Usage - all time");
        print_summary(&summarize(&entries));

        Output::header("By month");
        for month in monthly_totals(&entries) {
            println!(
                "  {}  {:>10}  {:>4} videos  {:>9} tokens",
                style(month.label()).bold(),
                format_cost(month.summary.total_cost_usd),
                month.summary.videos,
                month.summary.total_tokens
            );
        }
    } else {
        let (year, month) = match month {
            Some(value) => parse_month(value)?,
            None => {
                let now = Local::now();
                (now.year(), now.month())
            }
        };
        Output::header(&format!("Usage - {:04}-{:02}", year, month));
        print_summary(&summarize(entries_in_month(&entries, year, month)));
    }

    if list {
        Output::header("Recent runs");
        for entry in entries.iter().rev().take(HISTORY_ROWS) {
            println!(
                "  {}  {:<50}  {:>8}  {:>6} tokens  {}",
                style(entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")).dim(),
                preview(&entry.video_title, 47),
                format_cost(entry.cost_usd),
                entry.tokens_used,
                style(&entry.summary_provider).dim()
            );
        }
    }

    println!();
    Output::kv("Ledger", &format!("{} ({} entries)", ledger.location(), entries.len()));
    Ok(())
}

fn print_summary(summary: &UsageSummary) {
    Output::kv("Total cost", &format_cost(summary.total_cost_usd));
    Output::kv("Videos", &summary.videos.to_string());
    Output::kv("Tokens", &summary.total_tokens.to_string());
    Output::kv("Audio", &format!("{:.0} min", summary.total_minutes));

    if !summary.by_provider.is_empty() {
        println!();
        for (provider, totals) in &summary.by_provider {
            Output::list_item(&format!(
                "{}: {} ({} videos, {} tokens)",
                provider,
                format_cost(totals.cost_usd),
                totals.videos,
                totals.tokens
            ));
        }
    }
}

fn clear(ledger: &UsageLedger, yes: bool) -> Result<()> {
    if ledger.is_empty() {
        Output::info("Usage history is already empty.");
        return Ok(());
    }

    if !yes && !confirm(&format!("Delete {} usage entries?", ledger.len()))? {
        Output::info("Nothing deleted.");
        return Ok(());
    }

    ledger.clear()?;
    Output::success("Usage history cleared.");
    Ok(())
}

fn confirm(message: &str) -> io::Result<bool> {
    print!("{} {} {} ", style("?").cyan(), message, style("[y/N]").dim());
    io::stdout().flush()?;

    let answer = console::Term::stdout().read_line()?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
