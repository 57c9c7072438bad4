//! User action and run state types
//!
//! Shared between the run engine and any front-end that drives it.

use serde::{Deserialize, Serialize};

/// User actions that can be issued against a running playlist run
///
/// Exactly one action is "current" at any time; the run context keeps the
/// latest timestamp of every action kind ever issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// No action issued yet
    #[default]
    None,
    /// Skip the rest of the current track
    SkipTrack,
    /// Skip the rest of the current grouping (artist, album, folder...)
    SkipGrouping,
    /// Toggle pause
    Pause,
    /// Cancel the run; terminal for the run instance
    Cancel,
    /// Stop the application once the current track has finished
    ShutdownAfterTrack,
}

impl UserAction {
    /// All action kinds, in declaration order
    pub const ALL: [UserAction; 6] = [
        UserAction::None,
        UserAction::SkipTrack,
        UserAction::SkipGrouping,
        UserAction::Pause,
        UserAction::Cancel,
        UserAction::ShutdownAfterTrack,
    ];

    /// True for the actions that abandon the current track
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            UserAction::SkipTrack | UserAction::SkipGrouping | UserAction::Cancel
        )
    }
}

impl std::fmt::Display for UserAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserAction::None => write!(f, "None"),
            UserAction::SkipTrack => write!(f, "SkipTrack"),
            UserAction::SkipGrouping => write!(f, "SkipGrouping"),
            UserAction::Pause => write!(f, "Pause"),
            UserAction::Cancel => write!(f, "Cancel"),
            UserAction::ShutdownAfterTrack => write!(f, "ShutdownAfterTrack"),
        }
    }
}

/// Lifecycle state of a run as reported to front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Created, not executing yet
    #[default]
    Idle,
    /// Playback loop active
    Running,
    /// Loop returned normally (exhausted, total reached, shutdown)
    Complete,
    /// Loop returned because the run was cancelled
    Cancelled,
    /// Loop returned with a fatal error
    Failed,
}

impl RunState {
    /// True once the run will not play anything else
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Cancelled | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Complete => write!(f, "complete"),
            RunState::Cancelled => write!(f, "cancelled"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}
