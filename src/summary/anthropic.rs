//! Anthropic Messages API summarizer.

use super::{PricingTable, SummaryRequest, SummaryResult, Summarizer};
use crate::audio_source::VideoInfo;
use crate::error::{Result, SophiaError};
use crate::http::{create_http_client, error_body, DEFAULT_TIMEOUT_SECS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Summarizer backed by Claude models.
pub struct AnthropicSummarizer {
    client: reqwest::Client,
    api_url: String,
    max_tokens: u32,
    pricing: PricingTable,
}

impl AnthropicSummarizer {
    /// Create a summarizer with default limits and built-in pricing.
    pub fn new() -> Result<Self> {
        Self::with_config(
            DEFAULT_MAX_TOKENS,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            PricingTable::new(),
        )
    }

    pub fn with_config(max_tokens: u32, timeout: Duration, pricing: PricingTable) -> Result<Self> {
        Ok(Self {
            client: create_http_client(timeout)?,
            api_url: ANTHROPIC_API_URL.to_string(),
            max_tokens,
            pricing,
        })
    }

    /// Send requests to a different Messages endpoint.
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

/// The user turn: video header followed by the transcript.
fn user_message(video: &VideoInfo, transcript: &str) -> String {
    format!(
        "Video: \"{}\"\nChannel: {}\nDuration: {}\n\nTranscript:\n{}",
        video.title,
        video.channel,
        video.formatted_duration(),
        transcript
    )
}

fn summary_from_response(
    response: MessagesResponse,
    model: &str,
    pricing: &PricingTable,
) -> Result<SummaryResult> {
    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .find_map(|block| block.text)
        .ok_or_else(|| SophiaError::Summary("Unexpected response from Anthropic: no text content".into()))?;

    let input_tokens = response.usage.input_tokens;
    let output_tokens = response.usage.output_tokens;
    let cost = pricing.cost(model, input_tokens, output_tokens);

    Ok(SummaryResult::new(text, input_tokens, output_tokens, cost))
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<SummaryResult> {
        let body = MessagesRequest {
            model: request.model,
            max_tokens: self.max_tokens,
            system: request.system_prompt,
            messages: vec![Message {
                role: "user",
                content: user_message(request.video, request.transcript),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", request.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| SophiaError::Summary(format!("Could not reach Anthropic: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = if status == reqwest::StatusCode::UNAUTHORIZED {
                "Invalid Anthropic API key. Check your configuration.".to_string()
            } else {
                format!("Anthropic error ({}): {}", status, error_body(response).await)
            };
            return Err(SophiaError::Summary(message));
        }

        let payload: MessagesResponse = response
            .json()
            .await
            .map_err(|e| SophiaError::Summary(format!("Failed to parse Anthropic response: {}", e)))?;

        let result = summary_from_response(payload, request.model, &self.pricing)?;
        info!(
            "Summary generated: {} input + {} output tokens",
            result.input_tokens, result.output_tokens
        );
        Ok(result)
    }
}
