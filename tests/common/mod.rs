#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use sophia::audio_source::{AudioArtifact, DownloadProgress, MetadataProvider, VideoInfo, VideoReference};
use sophia::config::{Credentials, ExportPreferences, RunConfiguration};
use sophia::export::{LocalWriter, NotePublisher, NotionTarget, SummaryDocument};
use sophia::orchestrator::{Capabilities, Orchestrator};
use sophia::summary::{SummaryRequest, SummaryResult, Summarizer};
use sophia::transcription::{LanguageHint, Transcriber, TranscriptionRequest};
use sophia::usage::{MemoryStore, UsageLedger};
use sophia::{Result, SophiaError};

pub const VIDEO_URL: &str = "https://youtu.be/abc12345678";
pub const TRANSCRIPT: &str = "ownership moves values borrowing lends them";
pub const SUMMARY: &str = "## Core Idea\nOwnership.\n\n## Keywords\nrust, ownership";

/// What a mocked capability does when called.
#[derive(Debug, Clone, Default)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail(String),
    Panic(String),
    /// Never completes; only a timeout ends the call.
    Hang,
}

/// Call counter plus a failure switch and an optional gate for one capability.
#[derive(Default)]
pub struct Switch {
    behavior: Mutex<Behavior>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Arc<Notify>,
}

impl Switch {
    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Hold calls until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Resolves once a call has started.
    pub async fn wait_entered(&self) {
        if self.calls() > 0 {
            return;
        }
        self.entered.notified().await;
    }

    async fn enter(&self, error: fn(String) -> SophiaError) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(message) => Err(error(message)),
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::Hang => futures::future::pending().await,
        }
    }
}

pub fn video_info() -> VideoInfo {
    VideoInfo {
        title: "Ownership Explained".to_string(),
        channel: "Rustacean Station".to_string(),
        duration_seconds: 754,
        url: VIDEO_URL.to_string(),
        thumbnail: None,
        description: None,
        upload_date: Some("2026-01-15".to_string()),
    }
}

pub struct MockMetadata {
    pub fetch: Switch,
    pub download: Switch,
    /// Percents reported through the download callback.
    pub progress: Mutex<Vec<f32>>,
    audio_dir: TempDir,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self {
            fetch: Switch::default(),
            download: Switch::default(),
            progress: Mutex::new(Vec::new()),
            audio_dir: tempfile::tempdir().expect("create audio dir"),
        }
    }

    pub fn audio_path(&self) -> PathBuf {
        self.audio_dir.path().join("abc12345678.mp3")
    }
}

#[async_trait]
impl MetadataProvider for MockMetadata {
    async fn fetch_info(&self, _video: &VideoReference) -> Result<VideoInfo> {
        self.fetch.enter(SophiaError::VideoSource).await?;
        Ok(video_info())
    }

    async fn download_audio(
        &self,
        _video: &VideoReference,
        progress: DownloadProgress,
    ) -> Result<AudioArtifact> {
        let steps = self.progress.lock().unwrap().clone();
        for percent in steps {
            progress(percent, &format!("Downloading: {:.1}%", percent));
        }
        self.download.enter(SophiaError::AudioDownload).await?;

        let path = self.audio_path();
        tokio::fs::write(&path, b"ID3 fake mp3").await?;
        Ok(AudioArtifact { path, size_bytes: 12 })
    }
}

#[derive(Default)]
pub struct MockTranscriber {
    pub switch: Switch,
    pub languages: Mutex<Vec<Option<String>>>,
    pub keys: Mutex<Vec<String>>,
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn provider_name(&self) -> &str {
        "Mock Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest<'_>) -> Result<String> {
        self.languages
            .lock()
            .unwrap()
            .push(request.language.map(str::to_string));
        self.keys.lock().unwrap().push(request.api_key.to_string());
        self.switch.enter(SophiaError::Transcription).await?;
        Ok(TRANSCRIPT.to_string())
    }
}

#[derive(Default)]
pub struct MockSummarizer {
    pub switch: Switch,
    pub prompts: Mutex<Vec<String>>,
    pub models: Mutex<Vec<String>>,
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<SummaryResult> {
        self.prompts.lock().unwrap().push(request.system_prompt.to_string());
        self.models.lock().unwrap().push(request.model.to_string());
        self.switch.enter(SophiaError::Summary).await?;
        Ok(SummaryResult::new(SUMMARY, 1200, 300, 0.0081))
    }
}

#[derive(Default)]
pub struct MockWriter {
    pub switch: Switch,
    pub dirs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl LocalWriter for MockWriter {
    async fn save(&self, document: SummaryDocument<'_>, output_dir: &Path) -> Result<PathBuf> {
        self.dirs.lock().unwrap().push(output_dir.to_path_buf());
        self.switch.enter(SophiaError::LocalSave).await?;
        Ok(output_dir.join(format!("{}.md", document.video.title.replace(' ', "_"))))
    }
}

#[derive(Default)]
pub struct MockPublisher {
    pub switch: Switch,
    pub targets: Mutex<Vec<NotionTarget>>,
}

#[async_trait]
impl NotePublisher for MockPublisher {
    async fn publish(&self, _document: SummaryDocument<'_>, target: &NotionTarget) -> Result<String> {
        self.targets.lock().unwrap().push(target.clone());
        self.switch.enter(SophiaError::Notion).await?;
        Ok("https://www.notion.so/Ownership-Explained-0123456789abcdef".to_string())
    }
}

/// Mock capabilities, an in-memory ledger and handles to inspect both.
pub struct Harness {
    pub metadata: Arc<MockMetadata>,
    pub transcriber: Arc<MockTranscriber>,
    pub summarizer: Arc<MockSummarizer>,
    pub writer: Arc<MockWriter>,
    pub publisher: Arc<MockPublisher>,
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<UsageLedger>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            metadata: Arc::new(MockMetadata::new()),
            transcriber: Arc::new(MockTranscriber::default()),
            summarizer: Arc::new(MockSummarizer::default()),
            writer: Arc::new(MockWriter::default()),
            publisher: Arc::new(MockPublisher::default()),
            ledger: Arc::new(UsageLedger::open(store.clone())),
            store,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        let caps = Capabilities {
            metadata: self.metadata.clone(),
            transcriber: self.transcriber.clone(),
            summarizer: self.summarizer.clone(),
            local_writer: self.writer.clone(),
            publisher: self.publisher.clone(),
        };
        Orchestrator::new(caps, Arc::clone(&self.ledger))
    }
}

/// Valid credentials, no exports.
pub fn run_config() -> RunConfiguration {
    RunConfiguration {
        credentials: Credentials::new("gsk_test", "sk-ant-test", "", ""),
        summary_model: "claude-sonnet-4-6".to_string(),
        language: LanguageHint::Auto,
        prompt_template: "Summarize {{video_title}} by {{channel}}".to_string(),
        ..Default::default()
    }
}

/// Valid credentials with local save into `dir` and Notion publishing.
pub fn run_config_with_exports(dir: &Path) -> RunConfiguration {
    RunConfiguration {
        credentials: Credentials::new("gsk_test", "sk-ant-test", "secret_notion", "db-123"),
        export: ExportPreferences {
            save_locally: true,
            output_dir: Some(dir.to_path_buf()),
            send_to_notion: true,
        },
        ..run_config()
    }
}

/// Isolated HOME and XDG directories for running the binary.
pub struct TestEnv {
    home: TempDir,
    config: TempDir,
    data: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create temporary HOME dir"),
            config: tempfile::tempdir().expect("create temporary XDG config dir"),
            data: tempfile::tempdir().expect("create temporary XDG data dir"),
        }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_sophia"))
            .args(args)
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.config.path())
            .env("XDG_DATA_HOME", self.data.path())
            .env_remove("GROQ_API_KEY")
            .env_remove("ANTHROPIC_API_KEY")
            .env_remove("NOTION_API_KEY")
            .env_remove("NOTION_DATABASE_ID")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to execute sophia binary")
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    /// Write a config file and return its path, for use with `--config`.
    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.config.path().join("sophia").join("config.toml");
        std::fs::create_dir_all(path.parent().expect("config parent")).expect("create config dir");
        std::fs::write(&path, contents).expect("write config file");
        path
    }
}
