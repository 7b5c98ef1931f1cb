//! Pipeline orchestrator for Sophia.
//!
//! Drives one run from a video link to a stored summary: metadata, audio
//! download, transcription, summary, then the optional exports. Progress is
//! published on a [`ProgressBus`]; the outcome of every run is returned as a
//! [`RunReport`] and successful runs are recorded in the [`UsageLedger`].

use crate::audio_source::{
    AudioArtifact, DownloadProgress, MetadataProvider, VideoInfo, YoutubeSource,
};
use crate::config::{RunConfiguration, Settings};
use crate::error::{PipelineError, Result};
use crate::export::{LocalWriter, MarkdownWriter, NotePublisher, NotionPublisher, SummaryDocument};
use crate::pipeline::{
    InvalidTransition, ListenerGuard, ProgressBus, ProgressEvent, RunLog, Stage, StageMachine,
    Subscription,
};
use crate::summary::{AnthropicSummarizer, PricingTable, SummaryRequest, SummaryResult, Summarizer};
use crate::transcription::{GroqTranscriber, Transcriber, TranscriptionRequest};
use crate::usage::{UsageEntry, UsageLedger};
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// The external collaborators a run calls through.
#[derive(Clone)]
pub struct Capabilities {
    pub metadata: Arc<dyn MetadataProvider>,
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,
    pub local_writer: Arc<dyn LocalWriter>,
    pub publisher: Arc<dyn NotePublisher>,
}

impl Capabilities {
    /// Production implementations configured from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let secs = Duration::from_secs;

        let transcriber = GroqTranscriber::with_config(
            &settings.transcription.model,
            settings.transcription.max_file_mb,
            secs(settings.transcription.timeout_secs),
        );
        let summarizer = AnthropicSummarizer::with_config(
            settings.summary.max_tokens,
            secs(settings.summary.timeout_secs),
            PricingTable::new().with_overrides(settings.summary.pricing.clone()),
        )?;
        let publisher = NotionPublisher::with_config(
            settings.notion.clone(),
            secs(settings.export.publish_timeout_secs),
        )?;

        Ok(Self {
            metadata: Arc::new(YoutubeSource::new(settings.temp_dir())),
            transcriber: Arc::new(transcriber),
            summarizer: Arc::new(summarizer),
            local_writer: Arc::new(MarkdownWriter::new()),
            publisher: Arc::new(publisher),
        })
    }
}

/// Terminal payload of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub video_info: VideoInfo,
    pub transcript: String,
    pub summary: SummaryResult,
    pub audio_duration_seconds: f64,
    pub saved_path: Option<PathBuf>,
    pub notion_url: Option<String>,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: std::result::Result<ProcessResult, PipelineError>,
    pub log: RunLog,
    /// Stages visited, starting at idle.
    pub stages: Vec<Stage>,
    pub elapsed: Duration,
}

impl RunReport {
    /// `Done` or `Error`.
    pub fn final_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&ProcessResult> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&PipelineError> {
        self.outcome.as_ref().err()
    }
}

/// A run started with [`Orchestrator::spawn_run`].
pub struct RunHandle {
    /// Progress of this run. The stream ends once the run has finished.
    pub events: Subscription,
    pub join: JoinHandle<std::result::Result<RunReport, PipelineError>>,
}

/// The pipeline orchestrator.
pub struct Orchestrator {
    caps: Capabilities,
    ledger: Arc<UsageLedger>,
    bus: ProgressBus,
    running: Arc<AtomicBool>,
    cancel_requested: Arc<AtomicBool>,
}

/// Clears the running flag when a run ends, however it ends.
struct RunningGuard {
    running: Arc<AtomicBool>,
    cancel_requested: Arc<AtomicBool>,
}

impl RunningGuard {
    fn acquire(running: &Arc<AtomicBool>, cancel_requested: &Arc<AtomicBool>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            running: Arc::clone(running),
            cancel_requested: Arc::clone(cancel_requested),
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.cancel_requested.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    /// Create an orchestrator over the given capabilities and ledger.
    pub fn new(caps: Capabilities, ledger: Arc<UsageLedger>) -> Self {
        Self {
            caps,
            ledger,
            bus: ProgressBus::new(),
            running: Arc::new(AtomicBool::new(false)),
            cancel_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Production capabilities and the configured ledger backend.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let caps = Capabilities::from_settings(settings)?;
        let ledger = Arc::new(UsageLedger::from_settings(settings)?);
        Ok(Self::new(caps, ledger))
    }

    /// The bus progress events are published on.
    pub fn progress(&self) -> &ProgressBus {
        &self.bus
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the current run to stop before its next step.
    ///
    /// A call already in flight is not interrupted. Returns false when no
    /// run is in progress.
    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.cancel_requested.store(true, Ordering::Release);
        info!("Cancellation requested");
        true
    }

    /// Start a run on the runtime, subscribed to its progress before it begins.
    ///
    /// When another run is active the returned stream is already closed and
    /// the join handle resolves to [`PipelineError::RunAlreadyInProgress`].
    pub fn spawn_run(self: &Arc<Self>, input: String, config: RunConfiguration) -> RunHandle {
        let Some(running) = RunningGuard::acquire(&self.running, &self.cancel_requested) else {
            let events = self.bus.subscribe();
            self.bus.unsubscribe(events.id());
            let join = tokio::spawn(async { Err(PipelineError::RunAlreadyInProgress) });
            return RunHandle { events, join };
        };

        let events = self.bus.subscribe();
        let guard = self.bus.guard(events.id());
        let orchestrator = Arc::clone(self);

        let join = tokio::spawn(async move {
            // Dropping the guard ends the caller's event stream.
            let _guard: ListenerGuard = guard;
            Ok(orchestrator.run_acquired(running, &input, &config).await)
        });

        RunHandle { events, join }
    }

    /// Execute one run.
    ///
    /// The outer error is only [`PipelineError::RunAlreadyInProgress`]; every
    /// other failure is reported in [`RunReport::outcome`].
    pub async fn run(
        &self,
        input: &str,
        config: &RunConfiguration,
    ) -> std::result::Result<RunReport, PipelineError> {
        let running = RunningGuard::acquire(&self.running, &self.cancel_requested)
            .ok_or(PipelineError::RunAlreadyInProgress)?;
        Ok(self.run_acquired(running, input, config).await)
    }

    #[instrument(skip(self, _running, input, config), fields(input = %input))]
    async fn run_acquired(
        &self,
        _running: RunningGuard,
        input: &str,
        config: &RunConfiguration,
    ) -> RunReport {
        // Internal listener; dropping it unsubscribes on every exit path.
        let mut listener = self.bus.subscribe();
        let started = Instant::now();
        let mut ctx = RunContext::new(self.bus.clone());

        let outcome = self.execute(&mut ctx, input, config).await;

        match &outcome {
            Ok(result) => info!(
                "Run complete: \"{}\" ({} tokens)",
                result.video_info.title, result.summary.total_tokens
            ),
            Err(err) => {
                warn!("Run failed ({}): {}", err.kind(), err);
                ctx.fail(err);
            }
        }

        let mut log = RunLog::new();
        for event in listener.drain() {
            log.push(event);
        }
        drop(listener);

        RunReport {
            outcome,
            log,
            stages: ctx.machine.history().to_vec(),
            elapsed: started.elapsed(),
        }
    }

    fn check_cancelled(&self, before: Stage) -> std::result::Result<(), PipelineError> {
        if self.cancel_requested.load(Ordering::Acquire) {
            return Err(PipelineError::Cancelled(before));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &mut RunContext,
        input: &str,
        config: &RunConfiguration,
    ) -> std::result::Result<ProcessResult, PipelineError> {
        let video = config.validate(input)?;
        let started = Instant::now();
        let timeouts = config.timeouts;

        // Metadata
        ctx.enter(Stage::FetchingInfo)?;
        self.check_cancelled(Stage::FetchingInfo)?;
        ctx.info("Fetching video info...");
        let video_info = call(timeouts.fetch, self.caps.metadata.fetch_info(&video))
            .await
            .map_err(|f| f.into_error(PipelineError::MetadataFetchFailed))?;
        ctx.info(format!(
            "Video: \"{}\" ({})",
            video_info.title,
            video_info.formatted_duration()
        ));

        // Audio
        ctx.enter(Stage::Downloading)?;
        self.check_cancelled(Stage::Downloading)?;
        ctx.emit(ProgressEvent::info(Stage::Downloading, "Starting audio download...").with_percent(0.0));
        let reporter = ctx.reporter.clone();
        let on_progress: DownloadProgress = Box::new(move |percent: f32, message: &str| {
            reporter.emit(ProgressEvent::info(Stage::Downloading, message).with_percent(percent));
        });
        let audio = call(
            timeouts.download,
            self.caps.metadata.download_audio(&video, on_progress),
        )
        .await
        .map_err(|f| f.into_error(PipelineError::AudioDownloadFailed))?;
        ctx.emit(ProgressEvent::info(Stage::Downloading, "Audio downloaded.").with_percent(100.0));

        // Transcription; the audio file is discarded whatever the outcome.
        let transcript = self.transcribe(ctx, &audio, config).await;
        discard_audio(&audio, config.keep_audio).await;
        let transcript = transcript?;

        // Summary
        ctx.enter(Stage::Summarizing)?;
        self.check_cancelled(Stage::Summarizing)?;
        ctx.info(format!("Generating summary with {}...", config.summary_model));
        let system_prompt = config.render_prompt(&video_info, &transcript);
        let summary_key = config.credentials.summary_key().unwrap_or_default();
        let summary = call(
            timeouts.summarize,
            self.caps.summarizer.summarize(SummaryRequest {
                transcript: &transcript,
                video: &video_info,
                api_key: summary_key,
                model: &config.summary_model,
                system_prompt: &system_prompt,
            }),
        )
        .await
        .map_err(|f| f.into_error(PipelineError::SummarizationFailed))?;
        ctx.emit(
            ProgressEvent::info(
                Stage::Summarizing,
                format!(
                    "Summary generated: {} tokens (~${:.4}).",
                    group_thousands(u64::from(summary.total_tokens)),
                    summary.cost_usd
                ),
            )
            .with_percent(100.0),
        );

        // Exports
        ctx.enter(Stage::Saving)?;
        let document = SummaryDocument {
            video: &video_info,
            summary: &summary.summary_text,
            transcript: &transcript,
        };

        let mut saved_path = None;
        if let Some(output_dir) = config.export.local_dir() {
            self.check_cancelled(Stage::Saving)?;
            ctx.info("Saving Markdown file...");
            let path = call(timeouts.save, self.caps.local_writer.save(document, output_dir))
                .await
                .map_err(|f| f.into_error(PipelineError::LocalSaveFailed))?;
            ctx.info(format!("Saved to: {}", path.display()));
            saved_path = Some(path);
        }

        let mut notion_url = None;
        if config.export.send_to_notion {
            match config.credentials.notion_target() {
                None => ctx.warn("Notion skipped: API key or database ID missing."),
                Some(target) => {
                    self.check_cancelled(Stage::Saving)?;
                    ctx.info("Sending to Notion...");
                    match call(timeouts.publish, self.caps.publisher.publish(document, &target)).await {
                        Ok(url) => {
                            ctx.info(format!("Notion page created: {}", url));
                            notion_url = Some(url);
                        }
                        Err(failure) => {
                            // Any publish failure, a panic included, leaves the run intact.
                            let err = failure.into_publish_error();
                            warn!("{}", err);
                            ctx.warn(err.to_string());
                        }
                    }
                }
            }
        }

        // Done
        ctx.enter(Stage::Done)?;
        ctx.emit(
            ProgressEvent::info(
                Stage::Done,
                format!("Processing completed in {:.1}s", started.elapsed().as_secs_f64()),
            )
            .with_percent(100.0),
        );

        let entry = UsageEntry::for_run(
            &video_info,
            video.as_str(),
            self.caps.transcriber.provider_name(),
            &config.summary_model,
            &summary,
        );
        if !self.ledger.append(entry) {
            debug!("Usage entry not recorded; run result unaffected");
        }

        Ok(ProcessResult {
            audio_duration_seconds: video_info.duration_seconds as f64,
            video_info,
            transcript,
            summary,
            saved_path,
            notion_url,
        })
    }

    async fn transcribe(
        &self,
        ctx: &mut RunContext,
        audio: &AudioArtifact,
        config: &RunConfiguration,
    ) -> std::result::Result<String, PipelineError> {
        ctx.enter(Stage::Transcribing)?;
        self.check_cancelled(Stage::Transcribing)?;
        ctx.info(format!(
            "Sending audio to {} for transcription...",
            self.caps.transcriber.provider_name()
        ));

        let transcript = call(
            config.timeouts.transcribe,
            self.caps.transcriber.transcribe(TranscriptionRequest {
                audio,
                api_key: config.credentials.transcription_key().unwrap_or_default(),
                language: config.language.as_code(),
            }),
        )
        .await
        .map_err(|f| f.into_error(PipelineError::TranscriptionFailed))?;

        let words = transcript.split_whitespace().count() as u64;
        ctx.emit(
            ProgressEvent::info(
                Stage::Transcribing,
                format!("Transcription complete: {} words.", group_thousands(words)),
            )
            .with_percent(100.0),
        );
        Ok(transcript)
    }
}

async fn discard_audio(audio: &AudioArtifact, keep: bool) {
    if keep {
        debug!("Keeping audio at {:?}", audio.path);
        return;
    }
    match tokio::fs::remove_file(&audio.path).await {
        Ok(()) => debug!("Removed audio {:?}", audio.path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to clean up audio file {:?}: {}", audio.path, e),
    }
}

/// Publishes events, stripping any percent that would move backwards within a stage.
#[derive(Clone)]
struct StageReporter {
    bus: ProgressBus,
    last_percent: Arc<Mutex<Option<(Stage, f32)>>>,
}

impl StageReporter {
    fn new(bus: ProgressBus) -> Self {
        Self {
            bus,
            last_percent: Arc::new(Mutex::new(None)),
        }
    }

    fn emit(&self, mut event: ProgressEvent) {
        if let Some(percent) = event.percent {
            let mut last = self.last_percent.lock().unwrap_or_else(PoisonError::into_inner);
            match *last {
                Some((stage, previous)) if stage == event.stage && percent < previous => {
                    event.percent = None;
                }
                _ => *last = Some((event.stage, percent)),
            }
        }
        self.bus.publish(event);
    }
}

/// Run-scoped state: the stage machine and the progress reporter.
struct RunContext {
    machine: StageMachine,
    reporter: StageReporter,
}

impl RunContext {
    fn new(bus: ProgressBus) -> Self {
        Self {
            machine: StageMachine::new(),
            reporter: StageReporter::new(bus),
        }
    }

    fn stage(&self) -> Stage {
        self.machine.current()
    }

    fn enter(&mut self, stage: Stage) -> std::result::Result<(), PipelineError> {
        self.machine
            .advance(stage)
            .map_err(|e: InvalidTransition| PipelineError::Unknown(e.to_string()))?;
        debug!("Stage: {}", stage);
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        self.reporter.emit(event);
    }

    fn info(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::info(self.stage(), message));
    }

    fn warn(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::warning(self.stage(), message));
    }

    /// Move to the error stage and publish the one error event of the run.
    fn fail(&mut self, err: &PipelineError) {
        if !self.stage().is_terminal() {
            // Legal from every non-terminal stage.
            let _ = self.machine.fail();
        }
        self.emit(ProgressEvent::error(Stage::Error, format!("Error: {}", err)));
    }
}

/// Why a capability call produced no value.
#[derive(Debug)]
enum StepFailure {
    Failed(String),
    TimedOut(Duration),
    Panicked(String),
}

impl StepFailure {
    /// Classify under the step's error kind. Panics are never attributed to a step.
    fn into_error(self, kind: fn(String) -> PipelineError) -> PipelineError {
        match self {
            StepFailure::Failed(message) => kind(message),
            StepFailure::TimedOut(limit) => kind(format!("timed out after {}s", limit.as_secs())),
            StepFailure::Panicked(message) => PipelineError::Unknown(message),
        }
    }

    /// Classify a publish failure. A panic here stays a non-fatal `NotePublishFailed`.
    fn into_publish_error(self) -> PipelineError {
        match self {
            StepFailure::Panicked(message) => PipelineError::NotePublishFailed(message),
            other => other.into_error(PipelineError::NotePublishFailed),
        }
    }
}

/// Await one capability call with an optional deadline, catching panics.
async fn call<T, F>(timeout: Option<Duration>, future: F) -> std::result::Result<T, StepFailure>
where
    F: Future<Output = Result<T>>,
{
    let guarded = AssertUnwindSafe(future).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(StepFailure::TimedOut(limit)),
        },
        None => guarded.await,
    };

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StepFailure::Failed(e.to_string())),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "capability panicked".to_string());
            Err(StepFailure::Panicked(message))
        }
    }
}

/// `1234567` as `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SophiaError;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[tokio::test]
    async fn test_call_classifies_failures() {
        let ok = call(None, async { Ok::<_, SophiaError>(5) }).await;
        assert_eq!(ok.unwrap(), 5);

        let failed = call(None, async { Err::<(), _>(SophiaError::Summary("quota".into())) })
            .await
            .unwrap_err()
            .into_error(PipelineError::SummarizationFailed);
        assert!(matches!(failed, PipelineError::SummarizationFailed(m) if m.contains("quota")));

        let timed_out = call(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, SophiaError>(())
        })
        .await
        .unwrap_err()
        .into_error(PipelineError::AudioDownloadFailed);
        assert!(matches!(timed_out, PipelineError::AudioDownloadFailed(m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_call_turns_panics_into_unknown() {
        let err = call(None, async {
            if true {
                panic!("provider exploded");
            }
            Ok::<(), SophiaError>(())
        })
        .await
        .unwrap_err()
        .into_error(PipelineError::SummarizationFailed);
        assert_eq!(err, PipelineError::Unknown("provider exploded".to_string()));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_publish_panic_stays_non_fatal() {
        let err = call(None, async {
            if true {
                panic!("notion exploded");
            }
            Ok::<(), SophiaError>(())
        })
        .await
        .unwrap_err()
        .into_publish_error();
        assert_eq!(err, PipelineError::NotePublishFailed("notion exploded".to_string()));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_reporter_strips_regressing_percent() {
        let bus = ProgressBus::new();
        let mut sub = bus.subscribe();
        let reporter = StageReporter::new(bus.clone());

        reporter.emit(ProgressEvent::info(Stage::Downloading, "a").with_percent(40.0));
        reporter.emit(ProgressEvent::info(Stage::Downloading, "b").with_percent(20.0));
        reporter.emit(ProgressEvent::info(Stage::Downloading, "c").with_percent(60.0));
        reporter.emit(ProgressEvent::info(Stage::Transcribing, "d").with_percent(10.0));

        let events = sub.drain();
        let percents: Vec<Option<f32>> = events.iter().map(|e| e.percent).collect();
        assert_eq!(percents, [Some(40.0), None, Some(60.0), Some(10.0)]);
        assert_eq!(events[1].message, "b");
    }
}
