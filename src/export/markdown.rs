//! Markdown file writer.

use super::{LocalWriter, SummaryDocument};
use crate::error::{Result, SophiaError};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Writes `<title>_<timestamp>.md` files.
#[derive(Debug, Default, Clone)]
pub struct MarkdownWriter;

impl MarkdownWriter {
    pub fn new() -> Self {
        Self
    }
}

/// Replace everything except alphanumerics, spaces and dashes with `_`,
/// then turn spaces into `_`.
pub fn safe_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == ' ' || c == '-' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim().replace(' ', "_");
    if cleaned.is_empty() {
        "summary".to_string()
    } else {
        cleaned
    }
}

/// Render the Markdown body of a summary file.
pub fn render_markdown(document: &SummaryDocument<'_>, processed_at: DateTime<Local>) -> String {
    format!(
        "# {}\n\n**Channel:** {}  \n**URL:** {}  \n**Duration:** {}  \n**Processed:** {}\n\n---\n\n## Summary\n\n{}\n\n---\n\n## Full transcript\n\n{}\n",
        document.video.title,
        document.video.channel,
        document.video.url,
        document.video.formatted_duration(),
        processed_at.format("%Y-%m-%d %H:%M"),
        document.summary,
        document.transcript
    )
}

#[async_trait]
impl LocalWriter for MarkdownWriter {
    #[instrument(skip(self, document), fields(title = %document.video.title))]
    async fn save(&self, document: SummaryDocument<'_>, output_dir: &Path) -> Result<PathBuf> {
        let now = Local::now();
        let filename = format!(
            "{}_{}.md",
            safe_filename(&document.video.title),
            now.format("%Y%m%d_%H%M%S")
        );

        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            SophiaError::LocalSave(format!("Could not create {}: {}", output_dir.display(), e))
        })?;

        let path = output_dir.join(filename);
        tokio::fs::write(&path, render_markdown(&document, now))
            .await
            .map_err(|e| SophiaError::LocalSave(format!("Could not write {}: {}", path.display(), e)))?;

        info!("Saved summary to {}", path.display());
        Ok(path)
    }
}
