//! Process command implementation.

use crate::cli::{format_cost, Output, ProcessArgs, ProgressRenderer};
use crate::config::Settings;
use crate::deps::{DependencyProbe, SystemProbe};
use crate::orchestrator::{Orchestrator, ProcessResult, RunHandle, RunReport};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

/// Fold command-line overrides into the loaded settings.
fn apply_overrides(settings: &mut Settings, args: &ProcessArgs) {
    if let Some(language) = &args.language {
        settings.transcription.language = language.clone();
    }
    if let Some(model) = &args.model {
        settings.summary.model = model.clone();
    }
    if let Some(dir) = &args.output_dir {
        settings.export.output_dir = Some(dir.clone());
    }
    if args.no_save {
        settings.export.save_locally = false;
    }
    if args.notion {
        settings.export.send_to_notion = true;
    }
    if args.no_notion {
        settings.export.send_to_notion = false;
    }
    if args.keep_audio {
        settings.general.keep_audio = true;
    }
}

/// Machine-readable result for `--json`.
#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ProcessResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    stages: Vec<String>,
    elapsed_secs: f64,
}

impl<'a> JsonReport<'a> {
    fn from_report(report: &'a RunReport) -> Self {
        Self {
            success: report.is_success(),
            result: report.result(),
            error: report.error().map(|e| e.to_string()),
            error_kind: report.error().map(|e| e.kind()),
            stages: report.stages.iter().map(|s| s.to_string()).collect(),
            elapsed_secs: report.elapsed.as_secs_f64(),
        }
    }
}

/// Run the process command.
pub async fn run_process(args: &ProcessArgs, mut settings: Settings) -> Result<()> {
    apply_overrides(&mut settings, args);

    let probe = SystemProbe::new();
    let status = probe.check().await;
    if !status.is_ready() {
        Output::error(&format!("{} is not installed.", probe.required_tool()));
        Output::info("Run 'sophia doctor' for detailed diagnostics.");
        anyhow::bail!("{} not found", probe.required_tool());
    }
    if !status.optional_tool_available && !args.json {
        Output::warning(&format!(
            "{} not found; audio conversion may fail.",
            probe.optional_tool()
        ));
    }

    let config = settings.run_configuration()?;
    let orchestrator = Arc::new(Orchestrator::from_settings(&settings)?);

    if !args.json {
        Output::info(&format!("Processing: {}", args.url));
    }

    let RunHandle { mut events, join } = orchestrator.spawn_run(args.url.clone(), config);
    let mut renderer = if args.json {
        ProgressRenderer::quiet()
    } else {
        ProgressRenderer::new()
    };

    let mut cancel_sent = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => renderer.handle(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                cancel_sent = true;
                if orchestrator.cancel() {
                    renderer.finish();
                    Output::warning("Cancelling after the current step...");
                }
            }
        }
    }
    renderer.finish();

    let report = join.await??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&JsonReport::from_report(&report))?);
        if let Some(err) = report.error() {
            anyhow::bail!("{}", err);
        }
        return Ok(());
    }

    match &report.outcome {
        Ok(result) => {
            print_result(result);
            Ok(())
        }
        Err(err) => {
            Output::error(&err.to_string());
            Err(anyhow::anyhow!("run failed ({})", err.kind()))
        }
    }
}

fn print_result(result: &ProcessResult) {
    Output::header(&result.video_info.title);
    println!();
    println!("{}", result.summary.summary_text);

    Output::header("Run");
    Output::kv("Channel", &result.video_info.channel);
    Output::kv("Duration", &result.video_info.formatted_duration());
    Output::kv(
        "Tokens",
        &format!(
            "{} ({} in / {} out)",
            result.summary.total_tokens, result.summary.input_tokens, result.summary.output_tokens
        ),
    );
    Output::kv("Cost", &format_cost(result.summary.cost_usd));
    if let Some(path) = &result.saved_path {
        Output::kv("Saved to", &path.display().to_string());
    }
    if let Some(url) = &result.notion_url {
        Output::kv("Notion", url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let mut settings = Settings::default();
        let args = ProcessArgs {
            url: "https://youtu.be/abc12345678".to_string(),
            language: Some("es".to_string()),
            model: Some("claude-haiku-4-5".to_string()),
            no_save: true,
            notion: true,
            ..Default::default()
        };
        apply_overrides(&mut settings, &args);

        assert_eq!(settings.transcription.language, "es");
        assert_eq!(settings.summary.model, "claude-haiku-4-5");
        assert!(!settings.export.save_locally);
        assert!(settings.export.send_to_notion);
        assert!(!settings.general.keep_audio);
    }

    #[test]
    fn test_no_notion_wins_over_config() {
        let mut settings = Settings::default();
        settings.export.send_to_notion = true;
        let args = ProcessArgs {
            no_notion: true,
            ..Default::default()
        };
        apply_overrides(&mut settings, &args);
        assert!(!settings.export.send_to_notion);
    }
}
