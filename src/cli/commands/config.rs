//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Copy of `settings` safe to print: credentials reduced to set/unset markers.
fn redacted(settings: &Settings) -> Settings {
    let mut settings = settings.clone();
    let creds = &mut settings.credentials;
    for value in [
        &mut creds.groq_api_key,
        &mut creds.anthropic_api_key,
        &mut creds.notion_api_key,
    ] {
        if !value.trim().is_empty() {
            *value = "<set>".to_string();
        }
    }
    settings
}

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings, config_path: Option<&PathBuf>) -> Result<()> {
    let path = config_path.cloned().unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&redacted(settings))
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }

        ConfigAction::Init { force } => {
            if path.exists() && !force {
                Output::warning(&format!("Config already exists at {}", path.display()));
                Output::info("Use --force to overwrite it with defaults.");
                return Ok(());
            }
            Settings::default().save_to(&path)?;
            Output::success(&format!("Wrote default config to {}", path.display()));
            Output::info("Add your API keys there or export GROQ_API_KEY and ANTHROPIC_API_KEY.");
        }
    }

    Ok(())
}
