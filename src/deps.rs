//! External tool availability checks.

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

/// Result of probing the external tools a run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyStatus {
    /// Version of the required tool, `None` when it is missing.
    pub required_tool_version: Option<String>,
    pub optional_tool_available: bool,
}

impl DependencyStatus {
    /// Whether a run can start.
    pub fn is_ready(&self) -> bool {
        self.required_tool_version.is_some()
    }
}

/// Read-only check consulted before starting a run.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    async fn check(&self) -> DependencyStatus;
}

/// Probes `yt-dlp` (required) and `ffmpeg` (optional) on the PATH.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    required: String,
    optional: String,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::with_tools("yt-dlp", "ffmpeg")
    }

    pub fn with_tools(required: &str, optional: &str) -> Self {
        Self {
            required: required.to_string(),
            optional: optional.to_string(),
        }
    }

    /// Name of the required tool.
    pub fn required_tool(&self) -> &str {
        &self.required
    }

    /// Name of the optional tool.
    pub fn optional_tool(&self) -> &str {
        &self.optional
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// First line of `<tool> <flag>` output, or `None` if the tool cannot run.
async fn tool_version(tool: &str, flag: &str) -> Option<String> {
    let output = Command::new(tool).arg(flag).output().await;
    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string()),
        Ok(out) => {
            debug!("{} {} exited with {}", tool, flag, out.status);
            None
        }
        Err(e) => {
            debug!("{} not runnable: {}", tool, e);
            None
        }
    }
}

#[async_trait]
impl DependencyProbe for SystemProbe {
    async fn check(&self) -> DependencyStatus {
        let (required, optional) = tokio::join!(
            tool_version(&self.required, "--version"),
            tool_version(&self.optional, "-version"),
        );
        DependencyStatus {
            required_tool_version: required,
            optional_tool_available: optional.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tools_are_reported() {
        let probe = SystemProbe::with_tools("sophia-no-such-tool", "sophia-no-such-tool-either");
        let status = probe.check().await;
        assert_eq!(status.required_tool_version, None);
        assert!(!status.optional_tool_available);
        assert!(!status.is_ready());
    }
}
