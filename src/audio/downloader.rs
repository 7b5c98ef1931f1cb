//! Audio download utilities.
//!
//! Downloads audio with yt-dlp, streaming its `--newline` progress output,
//! and normalizes leftovers to MP3 with ffmpeg.

use crate::error::{Result, SophiaError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// A progress line recognized in yt-dlp output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// `[download]  42.0% of ...`
    Percent(f32),
    /// `[ExtractAudio] Destination: ...`
    Converting,
}

/// Classify one line of yt-dlp stdout.
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    if line.contains("[ExtractAudio]") {
        return Some(ProgressLine::Converting);
    }
    if line.contains("[download]") {
        return parse_download_percent(line).map(ProgressLine::Percent);
    }
    None
}

/// Extract the number right before the first `%` in a line.
pub fn parse_download_percent(line: &str) -> Option<f32> {
    let trimmed = line.trim();
    let pos = trimmed.find('%')?;
    let before = &trimmed[..pos];
    let start = before
        .rfind(|c: char| c == ' ' || c == '[')
        .map(|i| i + 1)
        .unwrap_or(0);
    before[start..].parse::<f32>().ok()
}

/// Downloads audio from a URL and saves it as `<video_id>.mp3` in `output_dir`.
///
/// `progress` receives `(percent, message)` for every progress line yt-dlp prints.
/// An existing file for the same video id is reused without downloading.
#[instrument(skip(output_dir, progress), fields(video_id = %video_id))]
pub async fn download_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    progress: &(dyn Fn(f32, &str) + Send + Sync),
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let target_path = output_dir.join(format!("{}.mp3", video_id));

    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let spawned = Command::new("yt-dlp")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("0")
        .arg("--no-playlist")
        .arg("--newline")
        .arg("--no-warnings")
        .arg("--output").arg(&template)
        .arg(url)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SophiaError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(SophiaError::AudioDownload(format!("yt-dlp execution failed: {e}")));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SophiaError::AudioDownload("yt-dlp stdout unavailable".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SophiaError::AudioDownload("yt-dlp stderr unavailable".into()))?;

    let read_progress = async {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_progress_line(&line) {
                Some(ProgressLine::Percent(pct)) => {
                    progress(pct, &format!("Downloading audio... {:.0}%", pct));
                }
                Some(ProgressLine::Converting) => progress(95.0, "Converting to MP3..."),
                None => debug!("yt-dlp: {}", line),
            }
        }
    };

    let read_errors = async {
        let mut buf = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
        buf
    };

    let ((), stderr_text) = tokio::join!(read_progress, read_errors);

    let status = child
        .wait()
        .await
        .map_err(|e| SophiaError::AudioDownload(format!("Waiting for yt-dlp failed: {e}")))?;

    if !status.success() {
        return Err(SophiaError::AudioDownload(format!(
            "yt-dlp failed. Check that the URL is valid and the video is public. {}",
            stderr_text.trim()
        )));
    }

    // yt-dlp may output different formats; find and normalize to mp3
    let downloaded = find_audio_file(output_dir, video_id)?;

    if downloaded != target_path {
        normalize_to_mp3(&downloaded, &target_path).await?;
        let _ = tokio::fs::remove_file(&downloaded).await;
    }

    Ok(target_path)
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in &["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SophiaError::AudioDownload(format!("Cannot read directory: {e}")))?;

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(video_id) {
            return Ok(entry.path());
        }
    }

    Err(SophiaError::AudioDownload("Audio file not found after download".into()))
}

/// Converts an audio file to MP3 using ffmpeg.
async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let result = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(SophiaError::AudioDownload(format!("ffmpeg conversion failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SophiaError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(SophiaError::AudioDownload(format!("ffmpeg error: {e}"))),
    }
}
