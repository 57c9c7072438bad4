//! One play session
//!
//! A [`Run`] owns the [`RunContext`] and the [`Playback`] loop of a session.
//! `execute` blocks the thread it is called on; the command methods
//! (`next`, `pause`, `cancel`...) are meant to be called from other threads
//! while it runs, so a `Run` is usually shared through an `Arc`.

use crate::collaborators::Collaborators;
use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::playback::{Playback, PlaybackProgress, RunOutcome};
use muse_common::{RunState, UserAction};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use tracing::{error, info, warn};

/// Snapshot of a run for front-ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub state: RunState,
    pub user_action: UserAction,
    pub current_track: Option<String>,
    pub completed: i64,
    pub total: i64,
    pub is_paused: bool,
}

/// A play session
pub struct Run {
    ctx: RunContext,
    collaborators: Collaborators,
    playback: Mutex<Playback>,
    progress: Arc<Mutex<PlaybackProgress>>,
    state: Mutex<RunState>,
    complete: AtomicBool,
}

/// Completes the run when dropped, panics included
struct CompletionGuard<'a> {
    run: &'a Run,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.run.complete();
    }
}

impl Run {
    pub fn new(config: RunConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let ctx = RunContext::new();
        let playback = Playback::new(config, ctx.clone(), &collaborators)?;
        let progress = playback.progress_handle();

        Ok(Self {
            ctx,
            collaborators,
            playback: Mutex::new(playback),
            progress,
            state: Mutex::new(RunState::Idle),
            complete: AtomicBool::new(false),
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Play the session to its end
    ///
    /// A run that was cancelled refuses to start again and returns
    /// [`RunOutcome::Cancelled`] without touching the sequencer. Cleanup runs
    /// exactly once per call whatever the outcome. Shutdown outcomes ask the
    /// UI to close the application.
    pub fn execute(&self) -> Result<RunOutcome> {
        if self.ctx.was_cancelled() {
            warn!("Run was cancelled; not starting it again");
            return Ok(RunOutcome::Cancelled);
        }

        let mut playback = match self.playback.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                return Err(Error::Internal("Run is already executing".to_string()))
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        self.complete.store(false, Ordering::SeqCst);
        let guard = CompletionGuard { run: self };

        self.ctx.reset();
        self.set_state(RunState::Running);

        let result = playback.run();
        drop(playback);
        drop(guard);

        match &result {
            Ok(outcome) => {
                info!("Run finished: {}", outcome);
                self.set_state(if *outcome == RunOutcome::Cancelled {
                    RunState::Cancelled
                } else {
                    RunState::Complete
                });
                if outcome.requests_shutdown() {
                    self.collaborators.ui.shutdown_application();
                }
            }
            Err(e) => {
                error!("Run failed: {}", e);
                self.set_state(RunState::Failed);
            }
        }

        result
    }

    /// Skip the current track (or the delay before it)
    ///
    /// Stopping the backend ends the track before the next poll. During speech
    /// or the delay nothing is loaded and the stop does nothing.
    pub fn next(&self) {
        self.ctx.update_action(UserAction::SkipTrack);
        self.collaborators.player.stop();
    }

    /// Skip the rest of the current grouping
    pub fn next_grouping(&self) {
        self.ctx.update_action(UserAction::SkipGrouping);
        self.collaborators.player.stop();
    }

    /// Toggle pause
    ///
    /// Outside playback the backend call has no effect; the loop pauses the
    /// next track when it starts.
    pub fn pause(&self) {
        let flags = self.ctx.update_action(UserAction::Pause);
        if flags.is_paused {
            self.collaborators.player.pause();
        } else {
            self.collaborators.player.unpause();
        }
    }

    /// End the run; the run cannot be executed again afterwards
    ///
    /// The backend is stopped as in [`Run::next`].
    pub fn cancel(&self) {
        self.ctx.update_action(UserAction::Cancel);
        self.collaborators.player.stop();
    }

    /// Let the current track finish, then end the run and close the application
    pub fn shutdown_after_track(&self) {
        self.ctx.update_action(UserAction::ShutdownAfterTrack);
    }

    /// Cleanup has run for the latest `execute`
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.was_cancelled()
    }

    pub fn status(&self) -> RunStatus {
        let flags = self.ctx.snapshot();
        let progress = self.progress.lock().unwrap().clone();
        RunStatus {
            state: *self.state.lock().unwrap(),
            user_action: flags.user_action,
            current_track: progress.current_title,
            completed: progress.completed,
            total: progress.total,
            is_paused: flags.is_paused,
        }
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap() = state;
    }

    fn complete(&self) {
        if self.complete.swap(true, Ordering::SeqCst) {
            return;
        }
        self.collaborators.player.stop();
        self.collaborators.cleanup.clean();
        info!("Run cleanup done");
    }
}
