//! Speech-to-text transcription.
//!
//! [`Transcriber`] is the seam the orchestrator calls; [`GroqTranscriber`]
//! sends audio to Groq's OpenAI-compatible Whisper endpoint.

mod groq;

pub use groq::GroqTranscriber;

use crate::audio_source::AudioArtifact;
use crate::error::Result;
use async_trait::async_trait;

/// Language hint for transcription: `auto` or an ISO code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguageHint {
    #[default]
    Auto,
    Code(String),
}

impl LanguageHint {
    /// Parse `auto` (or empty) as [`LanguageHint::Auto`], anything else as a code.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            LanguageHint::Auto
        } else {
            LanguageHint::Code(value.to_lowercase())
        }
    }

    /// The code to send, or `None` to let the service detect the language.
    pub fn as_code(&self) -> Option<&str> {
        match self {
            LanguageHint::Auto => None,
            LanguageHint::Code(code) => Some(code),
        }
    }
}

impl std::fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code().unwrap_or("auto"))
    }
}

/// Input to a transcription call.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptionRequest<'a> {
    pub audio: &'a AudioArtifact,
    pub api_key: &'a str,
    /// `None` omits the language parameter entirely.
    pub language: Option<&'a str>,
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Name recorded in the usage ledger, e.g. "Groq Whisper".
    fn provider_name(&self) -> &str;

    /// Transcribe an audio file to plain text.
    async fn transcribe(&self, request: TranscriptionRequest<'_>) -> Result<String>;
}
