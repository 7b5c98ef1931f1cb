//! HTTP client configuration with sensible defaults.

use crate::error::{Result, SophiaError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a reqwest client with the given timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SophiaError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create an OpenAI-compatible client pointed at `api_base`.
pub fn create_openai_client(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let config = OpenAIConfig::new()
        .with_api_base(api_base)
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(create_http_client(timeout)?))
}

/// Read an error response body, tolerating read failures.
pub async fn error_body(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}
