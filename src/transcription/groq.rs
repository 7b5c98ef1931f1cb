//! Groq Whisper transcription.

use super::{Transcriber, TranscriptionRequest};
use crate::error::{Result, SophiaError};
use crate::http::{create_openai_client, DEFAULT_TIMEOUT_SECS};
use async_openai::error::OpenAIError;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "whisper-large-v3";
/// Groq's upload limit.
pub const DEFAULT_MAX_FILE_MB: f64 = 25.0;

/// Groq-hosted Whisper transcriber.
pub struct GroqTranscriber {
    api_base: String,
    model: String,
    max_file_mb: f64,
    timeout: Duration,
}

impl GroqTranscriber {
    /// Create a transcriber with default settings.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MODEL, DEFAULT_MAX_FILE_MB, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transcriber with a custom model, size limit and HTTP timeout.
    pub fn with_config(model: &str, max_file_mb: f64, timeout: Duration) -> Self {
        Self {
            api_base: GROQ_API_BASE.to_string(),
            model: model.to_string(),
            max_file_mb,
            timeout,
        }
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.to_string();
        self
    }

    fn check_size(&self, size_bytes: u64) -> Result<()> {
        let size_mb = size_bytes as f64 / 1_048_576.0;
        if size_mb > self.max_file_mb {
            return Err(SophiaError::Transcription(format!(
                "Audio file ({:.1} MB) exceeds Groq's {:.0} MB limit. Try a shorter video.",
                size_mb, self.max_file_mb
            )));
        }
        Ok(())
    }
}

impl Default for GroqTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_api_error(err: OpenAIError) -> String {
    match err {
        OpenAIError::ApiError(api) if api.message.to_lowercase().contains("invalid api key") => {
            "Invalid Groq API key. Check your configuration.".to_string()
        }
        other => format!("Groq Whisper API error: {}", other),
    }
}

#[async_trait]
impl Transcriber for GroqTranscriber {
    fn provider_name(&self) -> &str {
        "Groq Whisper"
    }

    #[instrument(skip(self, request), fields(audio_path = %request.audio.path.display()))]
    async fn transcribe(&self, request: TranscriptionRequest<'_>) -> Result<String> {
        let file_bytes = tokio::fs::read(&request.audio.path).await.map_err(|e| {
            SophiaError::Transcription(format!("Could not read audio file: {}", e))
        })?;
        self.check_size(file_bytes.len() as u64)?;

        let filename = request
            .audio
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(filename, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json);

        if let Some(lang) = request.language {
            request_builder.language(lang);
        }

        let api_request = request_builder
            .build()
            .map_err(|e| SophiaError::Transcription(format!("Failed to build request: {}", e)))?;

        debug!("Sending audio to {} ({})", self.api_base, self.model);
        let client = create_openai_client(&self.api_base, request.api_key, self.timeout)?;
        let response = client
            .audio()
            .transcribe(api_request)
            .await
            .map_err(|e| SophiaError::Transcription(describe_api_error(e)))?;

        let transcript = response.text.trim().to_string();
        info!("Transcribed {} characters", transcript.len());
        Ok(transcript)
    }
}
