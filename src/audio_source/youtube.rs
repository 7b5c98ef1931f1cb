//! YouTube source implementation backed by yt-dlp.

use super::{AudioArtifact, DownloadProgress, MetadataProvider, VideoInfo, VideoReference};
use crate::audio::download_audio;
use crate::error::{Result, SophiaError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Maximum characters of the video description kept in [`VideoInfo`].
const DESCRIPTION_LIMIT: usize = 500;

/// YouTube metadata and audio provider.
pub struct YoutubeSource {
    temp_dir: PathBuf,
}

impl YoutubeSource {
    /// Create a source that downloads audio into `temp_dir`.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Fetch metadata using `yt-dlp --dump-json`.
    async fn fetch_metadata_ytdlp(&self, video: &VideoReference) -> Result<VideoInfo> {
        let output = tokio::process::Command::new("yt-dlp")
            .args(["--dump-json", "--no-playlist", "--no-warnings", video.as_str()])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SophiaError::ToolNotFound("yt-dlp".to_string())
                } else {
                    SophiaError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SophiaError::VideoSource(format!(
                "Video {} not found or unavailable: {}",
                video.video_id(),
                stderr.trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            SophiaError::VideoSource(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        Ok(parse_video_info(&json, video.as_str()))
    }
}

/// Build [`VideoInfo`] from a yt-dlp `--dump-json` document.
pub(crate) fn parse_video_info(json: &serde_json::Value, url: &str) -> VideoInfo {
    let title = json["title"].as_str().unwrap_or("Untitled").to_string();

    let channel = json["uploader"]
        .as_str()
        .or_else(|| json["channel"].as_str())
        .unwrap_or("Unknown")
        .to_string();

    let duration_seconds = json["duration"]
        .as_u64()
        .or_else(|| json["duration"].as_f64().map(|d| d.max(0.0) as u64))
        .unwrap_or(0);

    let description = json["description"]
        .as_str()
        .map(|s| s.chars().take(DESCRIPTION_LIMIT).collect());

    // yt-dlp returns date as YYYYMMDD
    let upload_date = json["upload_date"].as_str().and_then(|d| {
        chrono::NaiveDate::parse_from_str(d, "%Y%m%d")
            .ok()
            .map(|date| date.format("%Y-%m-%d").to_string())
    });

    VideoInfo {
        title,
        channel,
        duration_seconds,
        url: url.to_string(),
        thumbnail: json["thumbnail"].as_str().map(|s| s.to_string()),
        description,
        upload_date,
    }
}

#[async_trait]
impl MetadataProvider for YoutubeSource {
    #[instrument(skip(self), fields(video_id = %video.video_id()))]
    async fn fetch_info(&self, video: &VideoReference) -> Result<VideoInfo> {
        let info = self.fetch_metadata_ytdlp(video).await?;
        info!("Fetched metadata: {} ({}s)", info.title, info.duration_seconds);
        Ok(info)
    }

    #[instrument(skip(self, progress), fields(video_id = %video.video_id()))]
    async fn download_audio(
        &self,
        video: &VideoReference,
        progress: DownloadProgress,
    ) -> Result<AudioArtifact> {
        let path = download_audio(video.as_str(), video.video_id(), &self.temp_dir, &*progress).await?;
        let size_bytes = tokio::fs::metadata(&path).await?.len();
        Ok(AudioArtifact { path, size_bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_video_info_full() {
        let doc = json!({
            "title": "Rust in 100 Seconds",
            "uploader": "Fireship",
            "channel": "Fireship Channel",
            "duration": 152,
            "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg",
            "description": "x".repeat(800),
            "upload_date": "20230115"
        });

        let info = parse_video_info(&doc, "https://youtu.be/abc12345678");
        assert_eq!(info.title, "Rust in 100 Seconds");
        assert_eq!(info.channel, "Fireship");
        assert_eq!(info.duration_seconds, 152);
        assert_eq!(info.url, "https://youtu.be/abc12345678");
        assert_eq!(info.description.as_ref().map(|d| d.chars().count()), Some(500));
        assert_eq!(info.upload_date.as_deref(), Some("2023-01-15"));
    }

    #[test]
    fn test_parse_video_info_fallbacks() {
        let doc = json!({ "channel": "Only Channel", "duration": 61.7, "upload_date": "2023" });

        let info = parse_video_info(&doc, "https://youtu.be/abc12345678");
        assert_eq!(info.title, "Untitled");
        assert_eq!(info.channel, "Only Channel");
        assert_eq!(info.duration_seconds, 61);
        assert!(info.thumbnail.is_none());
        assert!(info.upload_date.is_none());
    }
}
