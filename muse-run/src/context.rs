//! Run context
//!
//! Per-run record of the latest user action, the flags derived from it and the
//! time each action kind was last issued. Command threads write it through
//! [`RunContext::update_action`]; the playback thread reads snapshots and blocks
//! in [`RunContext::wait_until`] instead of sleeping.
//!
//! | Action | Effect |
//! |---|---|
//! | `None` | no flag change |
//! | `SkipTrack` | skip track + delay, unpause |
//! | `SkipGrouping` | as `SkipTrack`, plus skip grouping |
//! | `Pause` | toggle paused |
//! | `Cancel` | cancelled, skip track + delay, unpause |
//! | `ShutdownAfterTrack` | shut down once the current track ends |

use chrono::{DateTime, Utc};
use muse_common::UserAction;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Copy of the derived flags at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub user_action: UserAction,
    pub skip_track: bool,
    pub skip_delay: bool,
    pub skip_grouping: bool,
    pub is_paused: bool,
    pub is_cancelled: bool,
    pub shutdown_after_track: bool,
}

impl ContextSnapshot {
    /// Track (or grouping) skip requested
    pub fn should_skip(&self) -> bool {
        self.skip_track || self.skip_grouping
    }
}

#[derive(Debug, Default)]
struct ContextState {
    flags: ContextSnapshot,
    interaction_times: HashMap<UserAction, DateTime<Utc>>,
}

struct SharedContext {
    state: Mutex<ContextState>,
    changed: Condvar,
}

/// Shared handle to the state of one run
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct RunContext {
    shared: Arc<SharedContext>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedContext {
                state: Mutex::new(ContextState::default()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Record `action`, apply its flag changes and wake any waiter
    ///
    /// Returns the flags as they are after the update.
    pub fn update_action(&self, action: UserAction) -> ContextSnapshot {
        let snapshot = {
            let mut state = self.shared.state.lock().unwrap();
            state.interaction_times.insert(action, muse_common::time::now());

            let flags = &mut state.flags;
            flags.user_action = action;
            match action {
                UserAction::None => {}
                UserAction::SkipTrack => {
                    flags.skip_track = true;
                    flags.skip_delay = true;
                    flags.is_paused = false;
                }
                UserAction::SkipGrouping => {
                    flags.skip_track = true;
                    flags.skip_delay = true;
                    flags.skip_grouping = true;
                    flags.is_paused = false;
                }
                UserAction::Pause => {
                    flags.is_paused = !flags.is_paused;
                }
                UserAction::Cancel => {
                    flags.is_cancelled = true;
                    flags.skip_track = true;
                    flags.skip_delay = true;
                    flags.is_paused = false;
                }
                UserAction::ShutdownAfterTrack => {
                    flags.shutdown_after_track = true;
                }
            }
            *flags
        };

        debug!("User action {} -> {:?}", action, snapshot);
        self.shared.changed.notify_all();
        snapshot
    }

    /// When `action` was last issued in this run
    pub fn get_last_interaction_time(&self, action: UserAction) -> Option<DateTime<Utc>> {
        let state = self.shared.state.lock().unwrap();
        state.interaction_times.get(&action).copied()
    }

    /// Clear every flag and the interaction history
    pub fn reset(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = ContextState::default();
        }
        self.shared.changed.notify_all();
    }

    pub fn should_skip(&self) -> bool {
        self.snapshot().should_skip()
    }

    /// Cancel was issued at any point since the last reset
    pub fn was_cancelled(&self) -> bool {
        let state = self.shared.state.lock().unwrap();
        state.interaction_times.contains_key(&UserAction::Cancel)
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        self.shared.state.lock().unwrap().flags
    }

    pub fn skip_delay(&self) -> bool {
        self.snapshot().skip_delay
    }

    pub fn is_paused(&self) -> bool {
        self.snapshot().is_paused
    }

    pub fn shutdown_after_track(&self) -> bool {
        self.snapshot().shutdown_after_track
    }

    /// Clear the per-track flags once a track has been advanced past
    ///
    /// A pending grouping skip survives until the next fetch consumes it via
    /// [`RunContext::take_skip_grouping`]. Cancel, shutdown and history are kept.
    pub fn clear_one_shot_flags(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.flags.skip_track = false;
            state.flags.skip_delay = false;
            state.flags.is_paused = false;
        }
        self.shared.changed.notify_all();
    }

    /// Clear a skip aimed at speech or delay so it does not carry over to
    /// the track about to start
    ///
    /// A grouping skip issued here only shortens the wait as well; the group
    /// of the fetched track is not skipped.
    pub fn clear_skip_flags(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.flags.skip_track = false;
            state.flags.skip_delay = false;
            state.flags.skip_grouping = false;
        }
        self.shared.changed.notify_all();
    }

    /// Read and clear the grouping skip request
    pub fn take_skip_grouping(&self) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        std::mem::take(&mut state.flags.skip_grouping)
    }

    /// Block until `predicate` holds for the current flags or `timeout` elapses
    ///
    /// Returns whether the predicate held.
    pub fn wait_until<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&ContextSnapshot) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if predicate(&state.flags) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("flags", &self.snapshot())
            .finish()
    }
}
