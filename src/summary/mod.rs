//! LLM summarization of transcripts.

mod anthropic;
mod pricing;

pub use anthropic::{AnthropicSummarizer, ANTHROPIC_API_URL, DEFAULT_MAX_TOKENS};
pub use pricing::{ModelPrice, PricingTable};

use crate::audio_source::VideoInfo;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Input to a summarization call.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub transcript: &'a str,
    pub video: &'a VideoInfo,
    pub api_key: &'a str,
    pub model: &'a str,
    /// The prompt template with every known placeholder substituted.
    pub system_prompt: &'a str,
}

/// A generated summary with its token accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary_text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
}

impl SummaryResult {
    /// Build a result; `total_tokens` is always `input_tokens + output_tokens`.
    pub fn new(summary_text: impl Into<String>, input_tokens: u32, output_tokens: u32, cost_usd: f64) -> Self {
        Self {
            summary_text: summary_text.into(),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            cost_usd,
        }
    }
}

/// Trait for summarization services.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a transcript with the given model and system prompt.
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<SummaryResult>;
}
