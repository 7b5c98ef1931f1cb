//! Configuration module for Sophia.
//!
//! Handles the settings file, the summary prompt template, and the immutable
//! [`RunConfiguration`] handed to the orchestrator.

mod prompts;
mod run;
mod settings;

pub use prompts::{render, render_with_custom, summary_variables, DEFAULT_SUMMARY_PROMPT};
pub use run::{Credentials, ExportPreferences, RunConfiguration, StepTimeouts};
pub use settings::{
    CredentialSettings, ExportSettings, GeneralSettings, MetadataSettings, PromptSettings,
    Settings, SummarySettings, TranscriptionSettings, UsageBackend, UsageSettings,
};
