//! Sophia - YouTube video summaries
//!
//! Turns a YouTube link into a stored, cost-tracked summary: the audio is
//! downloaded with yt-dlp, transcribed with Groq Whisper, summarized with
//! Claude, and saved as Markdown and/or a Notion page.
//!
//! # Architecture
//!
//! - `pipeline` - Stage state machine, progress event bus, run log
//! - `orchestrator` - Drives one run through every stage
//! - `audio_source` / `audio` - Video metadata and audio download
//! - `transcription` - Speech-to-text
//! - `summary` - Summary generation and pricing
//! - `export` - Markdown and Notion destinations
//! - `usage` - Persisted usage ledger and cost reports
//! - `deps` - External tool probe
//! - `config` - Settings file and per-run configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use sophia::config::Settings;
//! use sophia::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::from_settings(&settings)?;
//!
//!     let report = orchestrator
//!         .run("https://youtu.be/dQw4w9WgXcQ", &settings.run_configuration()?)
//!         .await?;
//!     if let Some(result) = report.result() {
//!         println!("{}", result.summary.summary_text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod audio_source;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod export;
pub mod http;
pub mod orchestrator;
pub mod pipeline;
pub mod summary;
pub mod transcription;
pub mod usage;

pub use error::{PipelineError, Result, SophiaError, ValidationError};
