//! Configuration settings for Sophia.

use super::prompts::DEFAULT_SUMMARY_PROMPT;
use super::run::{Credentials, ExportPreferences, RunConfiguration, StepTimeouts};
use crate::error::{Result, SophiaError};
use crate::export::NotionSchema;
use crate::summary::ModelPrice;
use crate::transcription::LanguageHint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub credentials: CredentialSettings,
    pub metadata: MetadataSettings,
    pub transcription: TranscriptionSettings,
    pub summary: SummarySettings,
    pub export: ExportSettings,
    pub notion: NotionSchema,
    pub prompts: PromptSettings,
    pub usage: UsageSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for downloaded audio.
    pub temp_dir: String,
    /// Keep downloaded audio after transcription.
    pub keep_audio: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sophia".to_string(),
            temp_dir: "/tmp/sophia".to_string(),
            keep_audio: false,
        }
    }
}

/// API credentials. Environment variables take precedence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CredentialSettings {
    pub groq_api_key: String,
    pub anthropic_api_key: String,
    pub notion_api_key: String,
    pub notion_database_id: String,
}

impl CredentialSettings {
    /// Replace each credential with its environment variable when set and non-empty.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields = [
            ("GROQ_API_KEY", &mut self.groq_api_key),
            ("ANTHROPIC_API_KEY", &mut self.anthropic_api_key),
            ("NOTION_API_KEY", &mut self.notion_api_key),
            ("NOTION_DATABASE_ID", &mut self.notion_database_id),
        ];
        for (var, field) in fields {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
        self
    }
}

/// yt-dlp step limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    pub fetch_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 60,
            download_timeout_secs: 1800,
        }
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// `auto` or an ISO language code.
    pub language: String,
    pub model: String,
    /// Upload size limit in megabytes.
    pub max_file_mb: f64,
    pub timeout_secs: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            language: "auto".to_string(),
            model: "whisper-large-v3".to_string(),
            max_file_mb: 25.0,
            timeout_secs: 600,
        }
    }
}

/// Summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Price overrides keyed by model family, e.g. `claude-sonnet-4`.
    pub pricing: HashMap<String, ModelPrice>,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-6".to_string(),
            max_tokens: 4096,
            timeout_secs: 300,
            pricing: HashMap::new(),
        }
    }
}

/// Where finished summaries go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub save_locally: bool,
    /// Defaults to `<Documents>/Sophia`.
    pub output_dir: Option<String>,
    pub send_to_notion: bool,
    pub save_timeout_secs: u64,
    pub publish_timeout_secs: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            save_locally: true,
            output_dir: None,
            send_to_notion: false,
            save_timeout_secs: 60,
            publish_timeout_secs: 120,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Inline summary prompt template.
    pub template: Option<String>,
    /// File holding the summary prompt template; wins over `template`.
    pub template_file: Option<String>,
    /// Custom variables available in the prompt as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

/// Usage ledger storage backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UsageBackend {
    #[default]
    Json,
    Sqlite,
}

impl std::str::FromStr for UsageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(UsageBackend::Json),
            "sqlite" => Ok(UsageBackend::Sqlite),
            _ => Err(format!("Unknown usage backend: {}", s)),
        }
    }
}

impl std::fmt::Display for UsageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageBackend::Json => write!(f, "json"),
            UsageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Usage ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageSettings {
    pub backend: UsageBackend,
    /// Defaults to `usage.json` or `usage.db` in the data directory.
    pub path: Option<String>,
    pub max_entries: usize,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            backend: UsageBackend::Json,
            path: None,
            max_entries: 200,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Credential environment variables are applied on top of the file.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.credentials = settings
            .credentials
            .with_env_overrides(|var| std::env::var(var).ok());
        Ok(settings)
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| SophiaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sophia")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Directory for Markdown summaries.
    pub fn output_dir(&self) -> PathBuf {
        match &self.export.output_dir {
            Some(dir) if !dir.trim().is_empty() => Self::expand_path(dir),
            _ => dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Sophia"),
        }
    }

    /// Location of the persisted usage ledger.
    pub fn usage_path(&self) -> PathBuf {
        match &self.usage.path {
            Some(path) => Self::expand_path(path),
            None => {
                let file = match self.usage.backend {
                    UsageBackend::Json => "usage.json",
                    UsageBackend::Sqlite => "usage.db",
                };
                self.data_dir().join(file)
            }
        }
    }

    /// The summary prompt template: `template_file`, then `template`, then the default.
    pub fn summary_prompt(&self) -> Result<String> {
        if let Some(file) = &self.prompts.template_file {
            let path = Self::expand_path(file);
            return std::fs::read_to_string(&path).map_err(|e| {
                SophiaError::Config(format!("Could not read prompt file {}: {}", path.display(), e))
            });
        }
        Ok(self
            .prompts
            .template
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUMMARY_PROMPT.to_string()))
    }

    /// Snapshot everything a run needs.
    pub fn run_configuration(&self) -> Result<RunConfiguration> {
        let secs = |s: u64| Some(Duration::from_secs(s));

        Ok(RunConfiguration {
            credentials: Credentials::new(
                &self.credentials.groq_api_key,
                &self.credentials.anthropic_api_key,
                &self.credentials.notion_api_key,
                &self.credentials.notion_database_id,
            ),
            summary_model: self.summary.model.clone(),
            language: LanguageHint::parse(&self.transcription.language),
            prompt_template: self.summary_prompt()?,
            prompt_variables: self.prompts.variables.clone(),
            export: ExportPreferences {
                save_locally: self.export.save_locally,
                output_dir: Some(self.output_dir()),
                send_to_notion: self.export.send_to_notion,
            },
            timeouts: StepTimeouts {
                fetch: secs(self.metadata.fetch_timeout_secs),
                download: secs(self.metadata.download_timeout_secs),
                transcribe: secs(self.transcription.timeout_secs),
                summarize: secs(self.summary.timeout_secs),
                save: secs(self.export.save_timeout_secs),
                publish: secs(self.export.publish_timeout_secs),
            },
            keep_audio: self.general.keep_audio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.transcription.language, "auto");
        assert_eq!(settings.summary.max_tokens, 4096);
        assert_eq!(settings.usage.max_entries, 200);
        assert!(settings.export.save_locally);
        assert!(!settings.export.send_to_notion);
        assert!(settings.usage_path().ends_with("usage.json"));
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [summary]
            model = "claude-haiku-4-5"

            [summary.pricing.claude-haiku-4]
            input_per_million = 1.0
            output_per_million = 5.0

            [usage]
            backend = "sqlite"

            [notion]
            title = "Name"
            "#,
        )
        .unwrap();

        assert_eq!(settings.summary.model, "claude-haiku-4-5");
        assert_eq!(settings.summary.max_tokens, 4096);
        assert_eq!(settings.summary.pricing["claude-haiku-4"].output_per_million, 5.0);
        assert_eq!(settings.usage.backend, UsageBackend::Sqlite);
        assert!(settings.usage_path().ends_with("usage.db"));
        assert_eq!(settings.notion.title, "Name");
        assert_eq!(settings.notion.channel, "Channel");
    }

    #[test]
    fn test_env_overrides_skip_empty_values() {
        let credentials = CredentialSettings {
            groq_api_key: "from-file".to_string(),
            anthropic_api_key: "from-file".to_string(),
            ..Default::default()
        }
        .with_env_overrides(|var| match var {
            "GROQ_API_KEY" => Some("from-env".to_string()),
            "ANTHROPIC_API_KEY" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(credentials.groq_api_key, "from-env");
        assert_eq!(credentials.anthropic_api_key, "from-file");
        assert_eq!(credentials.notion_api_key, "");
    }

    #[test]
    fn test_run_configuration_snapshot() {
        let mut settings = Settings::default();
        settings.transcription.language = "es".to_string();
        settings.export.output_dir = Some("/tmp/sophia-out".to_string());
        settings.prompts.template = Some("{{video_title}}".to_string());

        let config = settings.run_configuration().unwrap();
        assert_eq!(config.language.as_code(), Some("es"));
        assert_eq!(config.export.output_dir, Some(PathBuf::from("/tmp/sophia-out")));
        assert_eq!(config.prompt_template, "{{video_title}}");
        assert_eq!(config.timeouts.summarize, Some(Duration::from_secs(300)));
        assert!(config.credentials.transcription_key().is_none());
    }

    #[test]
    fn test_template_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prompt.md");
        std::fs::write(&file, "From file {{transcript}}").unwrap();

        let mut settings = Settings::default();
        settings.prompts.template = Some("inline".to_string());
        settings.prompts.template_file = Some(file.to_string_lossy().to_string());
        assert_eq!(settings.summary_prompt().unwrap(), "From file {{transcript}}");

        settings.prompts.template_file = Some(dir.path().join("missing.md").to_string_lossy().to_string());
        assert!(settings.summary_prompt().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut settings = Settings::default();
        settings.summary.model = "claude-opus-4-1".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.summary.model, "claude-opus-4-1");
    }
}
