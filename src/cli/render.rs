//! Terminal rendering of pipeline progress events.

use super::Output;
use crate::pipeline::{EventLevel, ProgressEvent, Stage};
use console::style;
use indicatif::ProgressBar;

/// Turns a run's progress events into a bar (downloads) or a spinner (everything else).
pub struct ProgressRenderer {
    stage: Option<Stage>,
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            stage: None,
            bar: None,
            quiet: false,
        }
    }

    /// A renderer that draws nothing.
    pub fn quiet() -> Self {
        Self {
            stage: None,
            bar: None,
            quiet: true,
        }
    }

    pub fn handle(&mut self, event: &ProgressEvent) {
        if self.quiet {
            return;
        }

        if self.stage != Some(event.stage) {
            self.finish();
            self.stage = Some(event.stage);
            if !event.stage.is_terminal() {
                self.bar = Some(match event.stage {
                    Stage::Downloading => Output::percent_bar(&event.message),
                    _ => Output::spinner(&event.message),
                });
            }
        }

        // Intermediate download percents only move the bar.
        let transient = event.stage == Stage::Downloading
            && event.level == EventLevel::Info
            && event.percent.is_some_and(|p| p > 0.0 && p < 100.0);

        let Some(bar) = &self.bar else {
            print_line(event);
            return;
        };

        if let Some(percent) = event.percent {
            bar.set_position(percent.round() as u64);
        }
        bar.set_message(event.message.clone());
        if !transient {
            bar.suspend(|| print_line(event));
        }
    }

    /// Clear any bar still on screen.
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressRenderer {
    fn drop(&mut self) {
        self.finish();
    }
}

fn print_line(event: &ProgressEvent) {
    match event.level {
        EventLevel::Info if event.stage == Stage::Done => {
            println!("{} {}", style("✓").green().bold(), event.message)
        }
        EventLevel::Info => println!("  {} {}", style(event.stage.label()).dim(), event.message),
        EventLevel::Warning => eprintln!("{} {}", style("!").yellow().bold(), event.message),
        EventLevel::Error => eprintln!("{} {}", style("✗").red().bold(), event.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_renderer_draws_nothing() {
        let mut renderer = ProgressRenderer::quiet();
        renderer.handle(&ProgressEvent::info(Stage::Downloading, "Starting audio download...").with_percent(0.0));
        assert!(renderer.bar.is_none());
        assert!(renderer.stage.is_none());
    }

    #[test]
    fn test_terminal_stage_clears_bar() {
        let mut renderer = ProgressRenderer::new();
        renderer.handle(&ProgressEvent::info(Stage::Summarizing, "Generating summary..."));
        assert!(renderer.bar.is_some());

        renderer.handle(&ProgressEvent::info(Stage::Done, "Processing completed in 1.0s"));
        assert!(renderer.bar.is_none());
        assert_eq!(renderer.stage, Some(Stage::Done));
    }
}
