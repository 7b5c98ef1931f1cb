//! Audio acquisition via yt-dlp and ffmpeg.

mod downloader;

pub use downloader::{download_audio, parse_download_percent, parse_progress_line, ProgressLine};
