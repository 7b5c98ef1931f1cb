//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::deps::{DependencyProbe, DependencyStatus, SystemProbe};
use crate::usage::UsageLedger;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Sophia Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let probe = SystemProbe::new();
    let tools = check_tools(&probe, &probe.check().await);
    print_section("External Tools", &tools);

    let credentials = check_credentials(settings);
    print_section("API Configuration", &credentials);

    let directories = check_directories(settings);
    print_section("Directories", &directories);

    let config = vec![check_config_file()];
    print_section("Configuration", &config);

    let checks: Vec<&CheckResult> = tools
        .iter()
        .chain(&credentials)
        .chain(&directories)
        .chain(&config)
        .collect();
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Sophia.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Sophia is ready to use.");
    }

    Ok(())
}

fn check_tools(probe: &SystemProbe, status: &DependencyStatus) -> Vec<CheckResult> {
    let required = match &status.required_tool_version {
        Some(version) => CheckResult::ok(probe.required_tool(), &truncate(version, 50)),
        None => CheckResult::error(probe.required_tool(), "not found", install_hint_ytdlp()),
    };
    let optional = if status.optional_tool_available {
        CheckResult::ok(probe.optional_tool(), "installed")
    } else {
        CheckResult::warning(
            probe.optional_tool(),
            "not found (needed when audio is not delivered as MP3)",
            install_hint_ffmpeg(),
        )
    };
    vec![required, optional]
}

/// `gsk_abc...wxyz` style preview of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_key(name: &str, value: &str, missing: CheckStatus, hint: &str) -> CheckResult {
    let value = value.trim();
    if !value.is_empty() {
        return CheckResult::ok(name, &format!("configured ({})", mask(value)));
    }
    match missing {
        CheckStatus::Error => CheckResult::error(name, "not set", hint),
        _ => CheckResult::warning(name, "not set", hint),
    }
}

fn check_credentials(settings: &Settings) -> Vec<CheckResult> {
    let creds = &settings.credentials;
    let notion_level = if settings.export.send_to_notion {
        CheckStatus::Error
    } else {
        CheckStatus::Warning
    };

    vec![
        check_key(
            "GROQ_API_KEY",
            &creds.groq_api_key,
            CheckStatus::Error,
            "Set with: export GROQ_API_KEY='gsk_...' (https://console.groq.com/keys)",
        ),
        check_key(
            "ANTHROPIC_API_KEY",
            &creds.anthropic_api_key,
            CheckStatus::Error,
            "Set with: export ANTHROPIC_API_KEY='sk-ant-...'",
        ),
        check_key(
            "NOTION_API_KEY",
            &creds.notion_api_key,
            notion_level,
            "Only needed for Notion export",
        ),
        check_key(
            "NOTION_DATABASE_ID",
            &creds.notion_database_id,
            notion_level,
            "Share the database with your integration and copy its ID",
        ),
    ]
}

fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let output_dir = settings.output_dir();
    if !settings.export.save_locally {
        results.push(CheckResult::ok("Output directory", "local save disabled"));
    } else if output_dir.exists() {
        results.push(CheckResult::ok("Output directory", &output_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Output directory",
            &format!("{} (will be created)", output_dir.display()),
            "Created when the first summary is saved",
        ));
    }

    match UsageLedger::from_settings(settings) {
        Ok(ledger) => results.push(CheckResult::ok(
            "Usage ledger",
            &format!("{} ({} entries)", ledger.location(), ledger.len()),
        )),
        Err(e) => results.push(CheckResult::error(
            "Usage ledger",
            &e.to_string(),
            "Check [usage] path and backend in the config file",
        )),
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: sophia config init",
        )
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
