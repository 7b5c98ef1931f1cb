//! Usage ledger: a bounded, persisted history of completed runs.
//!
//! [`UsageLedger`] owns the in-memory sequence and writes it through a
//! [`LedgerStore`] backend on every mutation.

mod json;
mod ledger;
mod memory;
mod sqlite;
mod stats;

pub use json::JsonFileStore;
pub use ledger::{UsageLedger, MAX_ENTRIES};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use stats::{entries_in_month, monthly_totals, summarize, MonthlyTotal, ProviderTotals, UsageSummary};

use crate::audio_source::VideoInfo;
use crate::error::Result;
use crate::summary::SummaryResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cost and consumption of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub video_title: String,
    pub video_url: String,
    pub transcription_provider: String,
    pub summary_provider: String,
    pub audio_duration_seconds: f64,
    pub tokens_used: u32,
    pub cost_usd: f64,
}

impl UsageEntry {
    /// Record a finished run from values the run already computed.
    pub fn for_run(
        video: &VideoInfo,
        video_url: &str,
        transcription_provider: &str,
        summary_model: &str,
        summary: &SummaryResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            video_title: video.title.clone(),
            video_url: video_url.to_string(),
            transcription_provider: transcription_provider.to_string(),
            summary_provider: summary_model.to_string(),
            audio_duration_seconds: video.duration_seconds as f64,
            tokens_used: summary.total_tokens,
            cost_usd: summary.cost_usd,
        }
    }
}

/// Durable storage for the ledger's entry sequence.
///
/// `save` overwrites the whole sequence.
pub trait LedgerStore: Send + Sync {
    /// The persisted entries, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<UsageEntry>>>;

    fn save(&self, entries: &[UsageEntry]) -> Result<()>;

    /// Human-readable location, e.g. a file path.
    fn describe(&self) -> String;
}
