//! Pipeline stages and their legal transitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    FetchingInfo,
    Downloading,
    Transcribing,
    Summarizing,
    Saving,
    Done,
    Error,
}

impl Stage {
    /// Stages of a successful run, in order.
    pub const FORWARD_PATH: [Stage; 7] = [
        Stage::Idle,
        Stage::FetchingInfo,
        Stage::Downloading,
        Stage::Transcribing,
        Stage::Summarizing,
        Stage::Saving,
        Stage::Done,
    ];

    /// Whether no further transitions are accepted (except a reset to idle).
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Error)
    }

    /// Whether a run is in flight in this stage.
    pub fn is_active(self) -> bool {
        !self.is_terminal() && self != Stage::Idle
    }

    /// The next stage on the forward path, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::FetchingInfo),
            Stage::FetchingInfo => Some(Stage::Downloading),
            Stage::Downloading => Some(Stage::Transcribing),
            Stage::Transcribing => Some(Stage::Summarizing),
            Stage::Summarizing => Some(Stage::Saving),
            Stage::Saving => Some(Stage::Done),
            Stage::Done | Stage::Error => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    ///
    /// Resets to idle go through [`StageMachine::reset`] and are not covered here.
    pub fn can_transition_to(self, to: Stage) -> bool {
        match (self, to) {
            (from, Stage::Error) => !from.is_terminal(),
            // No export destination enabled: saving may be skipped logically.
            (Stage::Summarizing, Stage::Done) => true,
            (from, to) => from.next() == Some(to),
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::FetchingInfo => "Fetching info",
            Stage::Downloading => "Downloading",
            Stage::Transcribing => "Transcribing",
            Stage::Summarizing => "Summarizing",
            Stage::Saving => "Saving",
            Stage::Done => "Done",
            Stage::Error => "Error",
        }
    }

    /// Wire name (`fetching_info`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::FetchingInfo => "fetching_info",
            Stage::Downloading => "downloading",
            Stage::Transcribing => "transcribing",
            Stage::Summarizing => "summarizing",
            Stage::Saving => "saving",
            Stage::Done => "done",
            Stage::Error => "error",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Stage::Idle),
            "fetching_info" => Ok(Stage::FetchingInfo),
            "downloading" => Ok(Stage::Downloading),
            "transcribing" => Ok(Stage::Transcribing),
            "summarizing" => Ok(Stage::Summarizing),
            "saving" => Ok(Stage::Saving),
            "done" => Ok(Stage::Done),
            "error" => Ok(Stage::Error),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// A rejected stage transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid stage transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: Stage,
    pub to: Stage,
}

/// Tracks the current stage of one run and every stage it has visited.
#[derive(Debug, Clone)]
pub struct StageMachine {
    current: Stage,
    history: Vec<Stage>,
}

impl StageMachine {
    /// Create a machine in the idle stage.
    pub fn new() -> Self {
        Self {
            current: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    /// The current stage.
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Every stage visited since the last reset, including the current one.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Move to `to`, or fail without changing state.
    pub fn advance(&mut self, to: Stage) -> std::result::Result<Stage, InvalidTransition> {
        if !self.current.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.current,
                to,
            });
        }
        self.current = to;
        self.history.push(to);
        Ok(to)
    }

    /// Move to the error stage. Legal from any non-terminal stage.
    pub fn fail(&mut self) -> std::result::Result<Stage, InvalidTransition> {
        self.advance(Stage::Error)
    }

    /// Return to idle for a new run, discarding the history.
    ///
    /// Only idle, done and error may be reset; an active run cannot.
    pub fn reset(&mut self) -> std::result::Result<(), InvalidTransition> {
        if self.current.is_active() {
            return Err(InvalidTransition {
                from: self.current,
                to: Stage::Idle,
            });
        }
        self.current = Stage::Idle;
        self.history.clear();
        self.history.push(Stage::Idle);
        Ok(())
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path_is_legal() {
        let mut machine = StageMachine::new();
        for stage in &Stage::FORWARD_PATH[1..] {
            machine.advance(*stage).unwrap();
        }
        assert_eq!(machine.current(), Stage::Done);
        assert_eq!(machine.history(), &Stage::FORWARD_PATH);
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut machine = StageMachine::new();
        machine.advance(Stage::FetchingInfo).unwrap();

        let err = machine.advance(Stage::Transcribing).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: Stage::FetchingInfo,
                to: Stage::Transcribing
            }
        );
        assert_eq!(machine.current(), Stage::FetchingInfo);
    }

    #[test]
    fn test_saving_may_be_skipped() {
        assert!(Stage::Summarizing.can_transition_to(Stage::Done));
        assert!(!Stage::Transcribing.can_transition_to(Stage::Done));
    }

    #[test]
    fn test_error_reachable_from_every_non_terminal_stage() {
        for stage in Stage::FORWARD_PATH.iter().filter(|s| !s.is_terminal()) {
            assert!(stage.can_transition_to(Stage::Error), "{stage}");
        }
        assert!(!Stage::Done.can_transition_to(Stage::Error));
        assert!(!Stage::Error.can_transition_to(Stage::Error));
    }

    #[test]
    fn test_terminal_stages_accept_nothing_but_reset() {
        let mut machine = StageMachine::new();
        machine.fail().unwrap();
        assert!(machine.advance(Stage::FetchingInfo).is_err());
        assert!(machine.fail().is_err());

        machine.reset().unwrap();
        assert_eq!(machine.current(), Stage::Idle);
        assert_eq!(machine.history(), &[Stage::Idle]);
    }

    #[test]
    fn test_active_run_cannot_be_reset() {
        let mut machine = StageMachine::new();
        machine.advance(Stage::FetchingInfo).unwrap();
        assert!(machine.reset().is_err());
        assert_eq!(machine.current(), Stage::FetchingInfo);
    }

    #[test]
    fn test_wire_names_round_trip() {
        for stage in Stage::FORWARD_PATH.iter().chain([Stage::Error].iter()) {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), *stage);
        }
        assert_eq!(
            serde_json::to_string(&Stage::FetchingInfo).unwrap(),
            "\"fetching_info\""
        );
    }
}
