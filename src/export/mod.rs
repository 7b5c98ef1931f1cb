//! Persisting finished summaries.
//!
//! Two destinations: a [`LocalWriter`] that writes a file and returns its
//! path, and a [`NotePublisher`] that creates a remote page and returns its URL.

mod markdown;
mod notion;

pub use markdown::{render_markdown, safe_filename, MarkdownWriter};
pub use notion::{
    build_blocks, build_page_request, detect_category, parse_section, truncate_chars,
    NotionPublisher, NotionSchema, CATEGORIES, NOTION_API_URL,
};

use crate::audio_source::VideoInfo;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Everything an export destination needs from a finished run.
#[derive(Debug, Clone, Copy)]
pub struct SummaryDocument<'a> {
    pub video: &'a VideoInfo,
    pub summary: &'a str,
    pub transcript: &'a str,
}

/// Credentials and database for note publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionTarget {
    pub api_key: String,
    pub database_id: String,
}

/// Writes a summary to the local filesystem.
#[async_trait]
pub trait LocalWriter: Send + Sync {
    /// Save into `output_dir`, returning the written file's path.
    async fn save(&self, document: SummaryDocument<'_>, output_dir: &Path) -> Result<PathBuf>;
}

/// Publishes a summary to a note service.
#[async_trait]
pub trait NotePublisher: Send + Sync {
    /// Create a page, returning its URL.
    async fn publish(&self, document: SummaryDocument<'_>, target: &NotionTarget) -> Result<String>;
}
