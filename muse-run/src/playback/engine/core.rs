//! Core playback loop
//!
//! **Per iteration:**
//! 1. Schedule checks (commentary only)
//! 2. Fetch the next track, validate it, publish it to the UI
//! 3. Prepare the spot synchronously unless one was started during the previous track
//! 4. Speak the spot
//! 5. Wait out the inter-track delay (not before the first track or after a failed start)
//! 6. Load and play; give the backend a grace period to start
//! 7. Poll progress, starting look-ahead preparation once
//! 8. Advance: stop, mark played, count unless skipped or failed
//! 9. Clear the per-track flags

use crate::collaborators::{Collaborators, Commentator, MediaPlayer, TrackSequencer, UiCallbacks};
use crate::config::RunConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::playback::delay::{compute_delay, remaining_after_prep};
use crate::playback::speech::Speaker;
use crate::playback::spots::SpotRegistry;
use crate::track::{Track, TrackToken};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

/// Why a run loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The sequencer had no more tracks
    Exhausted,
    /// The requested number of tracks was played
    Completed,
    /// The run was cancelled
    Cancelled,
    /// A shutdown was requested for the end of the track
    ShutdownAfterTrack,
    /// A commentary schedule asked for shutdown
    ScheduledShutdown,
}

impl RunOutcome {
    /// The application should quit after this outcome
    pub fn requests_shutdown(&self) -> bool {
        matches!(self, RunOutcome::ShutdownAfterTrack | RunOutcome::ScheduledShutdown)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Exhausted => write!(f, "no more tracks"),
            RunOutcome::Completed => write!(f, "all requested tracks played"),
            RunOutcome::Cancelled => write!(f, "cancelled"),
            RunOutcome::ShutdownAfterTrack => write!(f, "shutdown after track"),
            RunOutcome::ScheduledShutdown => write!(f, "scheduled shutdown"),
        }
    }
}

/// Position of the loop, readable from other threads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackProgress {
    pub current_title: Option<String>,
    /// Tracks played to the end (skips and failures excluded)
    pub completed: i64,
    pub total: i64,
}

/// Drives one run through its tracks
pub struct Playback {
    pub(super) config: RunConfig,
    pub(super) ctx: RunContext,
    pub(super) sequencer: Arc<dyn TrackSequencer>,
    pub(super) player: Arc<dyn MediaPlayer>,
    pub(super) ui: Arc<dyn UiCallbacks>,
    pub(super) commentator: Option<Arc<dyn Commentator>>,
    pub(super) speaker: Option<Speaker>,
    pub(super) spots: SpotRegistry,
    pub(super) prep_threads: Vec<JoinHandle<()>>,
    progress: Arc<Mutex<PlaybackProgress>>,

    /// Ordinal of the next track to complete
    pub(super) count: i64,
    pub(super) is_first: bool,
    pub(super) last_track_failed: bool,
    pub(super) previous: Option<Track>,
}

impl Playback {
    /// Create the loop; starts the speech worker when commentary can be spoken
    pub fn new(config: RunConfig, ctx: RunContext, collaborators: &Collaborators) -> Result<Self> {
        let speaker = match (&collaborators.commentator, &collaborators.voice) {
            (Some(_), Some(voice)) if config.commentary_enabled => {
                Some(Speaker::new(Arc::clone(voice), config.job_queue_capacity)?)
            }
            _ => None,
        };

        Ok(Self {
            config,
            ctx,
            sequencer: Arc::clone(&collaborators.sequencer),
            player: Arc::clone(&collaborators.player),
            ui: Arc::clone(&collaborators.ui),
            commentator: collaborators.commentator.clone(),
            speaker,
            spots: SpotRegistry::new(),
            prep_threads: Vec::new(),
            progress: Arc::new(Mutex::new(PlaybackProgress::default())),
            count: 1,
            is_first: true,
            last_track_failed: false,
            previous: None,
        })
    }

    pub fn progress_handle(&self) -> Arc<Mutex<PlaybackProgress>> {
        Arc::clone(&self.progress)
    }

    /// Play tracks until the sequence ends, the total is reached, the run is
    /// cancelled or a shutdown is requested
    ///
    /// Blocks the calling thread.
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.begin();
        let result = self.run_loop();
        self.finish();

        match result {
            Err(e) if e.is_scheduled_shutdown() => {
                info!("Scheduled shutdown reached");
                Ok(RunOutcome::ScheduledShutdown)
            }
            other => other,
        }
    }

    fn begin(&mut self) {
        self.count = 1;
        self.is_first = true;
        self.last_track_failed = false;
        self.previous = None;
        self.spots.clear();

        *self.progress.lock().unwrap() = PlaybackProgress {
            current_title: None,
            completed: 0,
            total: self.sequencer.total(),
        };

        if let Some(commentator) = self.active_commentator() {
            commentator.reset();
        }
        if let Some(handle) = self.ui.get_media_frame_handle() {
            self.player.set_output_window(handle);
        }
        self.player.audio_set_volume(self.config.volume);
    }

    fn run_loop(&mut self) -> Result<RunOutcome> {
        let total = self.sequencer.total();
        info!(
            "Starting run (total={}, commentary={})",
            if total == -1 { "unbounded".to_string() } else { total.to_string() },
            self.active_commentator().is_some()
        );

        loop {
            self.check_schedules()?;

            // FETCH_TRACK
            if self.ctx.was_cancelled() {
                info!("Run cancelled");
                return Ok(RunOutcome::Cancelled);
            }
            let skip_grouping = self.ctx.take_skip_grouping();
            let transition = match self.sequencer.next_track(skip_grouping)? {
                Some(transition) => transition,
                None => {
                    info!("No more tracks to play");
                    return Ok(RunOutcome::Exhausted);
                }
            };
            let track = transition.track.clone();
            track.validate()?;

            let token = TrackToken::new();
            info!("Track {}: {} ({})", self.count, track.readable_title(), token);
            self.announce(&track);

            // Preparation and speech
            let mut delay = compute_delay(&self.config, track.duration_seconds(), &mut rand::thread_rng());
            if let Some(spent) = self.prepare_for(token, &transition) {
                delay = remaining_after_prep(delay, spent);
            }
            self.speak(&token);

            // DELAY
            if self.is_first || self.last_track_failed {
                debug!("No delay before {}", track.title());
            } else {
                self.wait_delay(delay);
            }

            if self.ctx.was_cancelled() {
                self.spots.remove(&token);
                info!("Run cancelled before {}", track.title());
                return Ok(RunOutcome::Cancelled);
            }
            // A skip issued during speech or delay only shortens the wait
            self.ctx.clear_skip_flags();

            // PLAY
            self.last_track_failed = false;
            self.set_current(Some(track.readable_title()));
            self.player.load(&track)?;
            self.player.play()?;
            if self.ctx.is_paused() {
                // Pause issued during speech or delay reached no loaded track
                debug!("Starting {} paused", track.title());
                self.player.pause();
            }

            if self.wait_for_start() {
                self.poll_progress(&track);
            } else {
                warn!(
                    "Track did not start within {}ms: {}",
                    self.config.start_grace_ms,
                    track.path().display()
                );
                self.last_track_failed = true;
            }

            // ADVANCE
            if let Some(outcome) = self.advance(&token, &track, total) {
                return Ok(outcome);
            }

            self.ctx.clear_one_shot_flags();
        }
    }

    fn announce(&self, track: &Track) {
        self.ui.track_details(track);
        self.ui.update_album_artwork(track.artwork());

        let prior = self
            .previous
            .as_ref()
            .map(|t| t.readable_title())
            .unwrap_or_default();
        self.ui.update_prior_track(&prior);

        match self.sequencer.upcoming_track() {
            Some(next) => self.ui.update_next_up(&next.track.readable_title(), false),
            None => self.ui.update_next_up("", true),
        }
    }

    fn advance(&mut self, token: &TrackToken, track: &Track, total: i64) -> Option<RunOutcome> {
        self.player.stop();
        self.sequencer.mark_played(track);
        self.spots.remove(token);

        let skipped = self.ctx.snapshot().should_skip();
        if skipped || self.last_track_failed {
            debug!(
                "Not counting {} (skipped={}, failed={})",
                track.title(),
                skipped,
                self.last_track_failed
            );
        } else {
            self.count += 1;
            self.progress.lock().unwrap().completed = self.count - 1;
        }

        self.previous = Some(track.clone());
        self.is_first = false;

        if total != -1 && self.count > total {
            info!("Played {} of {} tracks", self.count - 1, total);
            return Some(RunOutcome::Completed);
        }
        if self.ctx.shutdown_after_track() {
            info!("Shutdown requested after {}", track.title());
            return Some(RunOutcome::ShutdownAfterTrack);
        }
        None
    }

    fn set_current(&self, title: Option<String>) {
        self.progress.lock().unwrap().current_title = title;
    }

    fn finish(&mut self) {
        self.join_prep_threads();
        self.spots.clear();
        if let Some(speaker) = &self.speaker {
            speaker.cancel();
        }
        self.set_current(None);
    }
}
