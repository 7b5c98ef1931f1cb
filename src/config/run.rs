//! Immutable per-run configuration snapshot.

use super::prompts::{render_with_custom, summary_variables};
use crate::audio_source::{VideoInfo, VideoReference};
use crate::error::ValidationError;
use crate::export::NotionTarget;
use crate::transcription::LanguageHint;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Resolved credentials. Blank values are stored as `None`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    groq_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    notion_api_key: Option<String>,
    notion_database_id: Option<String>,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl Credentials {
    pub fn new(groq: &str, anthropic: &str, notion: &str, notion_database_id: &str) -> Self {
        Self {
            groq_api_key: non_blank(groq),
            anthropic_api_key: non_blank(anthropic),
            notion_api_key: non_blank(notion),
            notion_database_id: non_blank(notion_database_id),
        }
    }

    pub fn transcription_key(&self) -> Option<&str> {
        self.groq_api_key.as_deref()
    }

    pub fn summary_key(&self) -> Option<&str> {
        self.anthropic_api_key.as_deref()
    }

    /// Notion key and database id, only when both are present.
    pub fn notion_target(&self) -> Option<NotionTarget> {
        Some(NotionTarget {
            api_key: self.notion_api_key.clone()?,
            database_id: self.notion_database_id.clone()?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("groq_api_key", &mask(&self.groq_api_key))
            .field("anthropic_api_key", &mask(&self.anthropic_api_key))
            .field("notion_api_key", &mask(&self.notion_api_key))
            .field("notion_database_id", &mask(&self.notion_database_id))
            .finish()
    }
}

/// Export destinations requested for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportPreferences {
    pub save_locally: bool,
    pub output_dir: Option<PathBuf>,
    pub send_to_notion: bool,
}

impl ExportPreferences {
    /// Directory to save into, when local save is on and a directory is set.
    pub fn local_dir(&self) -> Option<&PathBuf> {
        self.output_dir.as_ref().filter(|_| self.save_locally)
    }

    pub fn any_enabled(&self) -> bool {
        self.local_dir().is_some() || self.send_to_notion
    }
}

/// Per-step deadlines. `None` leaves the step unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepTimeouts {
    pub fetch: Option<Duration>,
    pub download: Option<Duration>,
    pub transcribe: Option<Duration>,
    pub summarize: Option<Duration>,
    pub save: Option<Duration>,
    pub publish: Option<Duration>,
}

/// Everything one run needs, captured when the run starts.
#[derive(Debug, Clone, Default)]
pub struct RunConfiguration {
    pub credentials: Credentials,
    pub summary_model: String,
    pub language: LanguageHint,
    pub prompt_template: String,
    pub prompt_variables: HashMap<String, String>,
    pub export: ExportPreferences,
    pub timeouts: StepTimeouts,
    pub keep_audio: bool,
}

impl RunConfiguration {
    /// Check the preconditions of a run, in order: link shape, transcription
    /// key, summary key.
    pub fn validate(&self, input: &str) -> Result<VideoReference, ValidationError> {
        let video = VideoReference::parse(input)
            .ok_or_else(|| ValidationError::InvalidVideoReference(input.trim().to_string()))?;
        if self.credentials.transcription_key().is_none() {
            return Err(ValidationError::MissingTranscriptionKey);
        }
        if self.credentials.summary_key().is_none() {
            return Err(ValidationError::MissingSummaryKey);
        }
        Ok(video)
    }

    /// The system prompt for a video, with custom and standard variables substituted.
    pub fn render_prompt(&self, video: &VideoInfo, transcript: &str) -> String {
        render_with_custom(
            &self.prompt_template,
            &self.prompt_variables,
            &summary_variables(video, transcript),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfiguration {
        RunConfiguration {
            credentials: Credentials::new("gsk", "sk-ant", "", ""),
            summary_model: "claude-sonnet-4-6".to_string(),
            prompt_template: "{{video_title}} ({{duration}}) {{tone}} {{missing}}".to_string(),
            prompt_variables: HashMap::from([("tone".to_string(), "brief".to_string())]),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_order() {
        let mut config = config();
        assert_eq!(
            config.validate("not a link"),
            Err(ValidationError::InvalidVideoReference("not a link".to_string()))
        );

        config.credentials = Credentials::new(" ", "", "", "");
        assert_eq!(
            config.validate("https://youtu.be/abc12345678"),
            Err(ValidationError::MissingTranscriptionKey)
        );

        config.credentials = Credentials::new("gsk", "", "", "");
        assert_eq!(
            config.validate("https://youtu.be/abc12345678"),
            Err(ValidationError::MissingSummaryKey)
        );
    }

    #[test]
    fn test_validate_ok() {
        let video = config().validate("https://youtu.be/abc12345678").unwrap();
        assert_eq!(video.video_id(), "abc12345678");
    }

    #[test]
    fn test_notion_target_needs_both_values() {
        assert!(Credentials::new("", "", "secret", "").notion_target().is_none());
        let target = Credentials::new("", "", "secret", "db").notion_target().unwrap();
        assert_eq!(target.database_id, "db");
    }

    #[test]
    fn test_render_prompt() {
        let video = VideoInfo {
            title: "Lifetimes".to_string(),
            channel: "Ferris".to_string(),
            duration_seconds: 125,
            url: "https://youtu.be/abc12345678".to_string(),
            thumbnail: None,
            description: None,
            upload_date: None,
        };
        assert_eq!(
            config().render_prompt(&video, "words"),
            "Lifetimes (2m 05s) brief {{missing}}"
        );
    }

    #[test]
    fn test_local_dir_requires_flag() {
        let prefs = ExportPreferences {
            save_locally: false,
            output_dir: Some(PathBuf::from("/tmp")),
            send_to_notion: false,
        };
        assert!(prefs.local_dir().is_none());
        assert!(!prefs.any_enabled());
    }

    #[test]
    fn test_debug_masks_keys() {
        let debug = format!("{:?}", Credentials::new("gsk_secret", "", "", ""));
        assert!(!debug.contains("gsk_secret"));

        let debug = format!("{:?}", Credentials::new("gsk_secret", "sk-ant-secret", "secret_notion", "db-4242"));
        for value in ["gsk_secret", "sk-ant-secret", "secret_notion", "db-4242"] {
            assert!(!debug.contains(value), "{debug}");
        }
        assert_eq!(debug.matches("<set>").count(), 4);
    }
}
