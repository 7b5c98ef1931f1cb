//! Video metadata and audio acquisition.
//!
//! The [`MetadataProvider`] trait is the seam the orchestrator calls through;
//! [`YoutubeSource`] implements it with yt-dlp.

mod youtube;

pub use youtube::YoutubeSource;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// A validated video link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    url: String,
    video_id: String,
}

impl VideoReference {
    /// Parse a `youtube.com/watch?v=`, `youtu.be/` or `youtube.com/shorts/` link.
    pub fn parse(input: &str) -> Option<Self> {
        static LINK_RE: OnceLock<Regex> = OnceLock::new();
        let re = LINK_RE.get_or_init(|| {
            Regex::new(
                r"(?x)
                ^(?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/shorts/)
                ([A-Za-z0-9_-]{11})
                ",
            )
            .expect("Invalid regex")
        });

        let url = input.trim();
        let caps = re.captures(url)?;
        Some(Self {
            url: url.to_string(),
            video_id: caps.get(1)?.as_str().to_string(),
        })
    }

    /// The link as the user supplied it (trimmed).
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The 11-character video id.
    pub fn video_id(&self) -> &str {
        &self.video_id
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Metadata about a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub channel: String,
    pub duration_seconds: u64,
    pub url: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    pub upload_date: Option<String>,
}

impl VideoInfo {
    /// Duration as `1h 02m 03s` or `2m 03s`.
    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

/// Format seconds as `1h 02m 03s`, or `2m 03s` under an hour.
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else {
        format!("{}m {:02}s", m, s)
    }
}

/// A downloaded audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Download progress callback: `(percent, message)`.
pub type DownloadProgress = Box<dyn Fn(f32, &str) + Send + Sync>;

/// Resolves video references to metadata and local audio.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch title, channel, duration and friends.
    async fn fetch_info(&self, video: &VideoReference) -> Result<VideoInfo>;

    /// Download the audio track, reporting intermediate progress through `progress`.
    async fn download_audio(
        &self,
        video: &VideoReference,
        progress: DownloadProgress,
    ) -> Result<AudioArtifact>;
}
