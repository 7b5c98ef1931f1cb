//! CLI module for Sophia.

pub mod commands;
mod output;
mod render;

pub use output::{format_cost, preview, Output};
pub use render::ProgressRenderer;

use clap::{Args, Parser, Subcommand};

/// Sophia - YouTube video summaries
///
/// Downloads the audio of a video, transcribes it, summarizes the transcript
/// with Claude and stores the result as Markdown and/or a Notion page.
#[derive(Parser, Debug)]
#[command(name = "sophia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a YouTube video
    Process(ProcessArgs),

    /// Show API usage and costs
    Usage {
        #[command(subcommand)]
        action: Option<UsageAction>,

        /// Totals across the whole history instead of one month
        #[arg(long, conflicts_with = "month")]
        all: bool,

        /// Month to report on (YYYY-MM, default: current month)
        #[arg(long)]
        month: Option<String>,

        /// List recent runs
        #[arg(short, long)]
        list: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Per-run overrides for the `process` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ProcessArgs {
    /// YouTube URL (youtube.com/watch?v=..., youtu.be/..., youtube.com/shorts/...)
    pub url: String,

    /// Transcription language (ISO code or "auto")
    #[arg(short, long)]
    pub language: Option<String>,

    /// Claude model used for the summary
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory for the Markdown file
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Skip the Markdown file
    #[arg(long)]
    pub no_save: bool,

    /// Also create a Notion page
    #[arg(long, conflicts_with = "no_notion")]
    pub notion: bool,

    /// Do not create a Notion page even if enabled in the config
    #[arg(long)]
    pub no_notion: bool,

    /// Keep the downloaded audio file
    #[arg(long)]
    pub keep_audio: bool,

    /// Print the result as JSON instead of progress and summary text
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum UsageAction {
    /// Delete the usage history
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (credentials masked)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::parse_from([
            "sophia",
            "-v",
            "process",
            "https://youtu.be/abc12345678",
            "--language",
            "es",
            "--no-save",
            "--notion",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.url, "https://youtu.be/abc12345678");
                assert_eq!(args.language.as_deref(), Some("es"));
                assert!(args.no_save);
                assert!(args.notion);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_notion_flags_conflict() {
        let result = Cli::try_parse_from([
            "sophia",
            "process",
            "https://youtu.be/abc12345678",
            "--notion",
            "--no-notion",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_usage_clear() {
        let cli = Cli::parse_from(["sophia", "usage", "clear", "--yes"]);
        assert!(matches!(
            cli.command,
            Commands::Usage {
                action: Some(UsageAction::Clear { yes: true }),
                ..
            }
        ));
    }
}
