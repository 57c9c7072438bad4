//! Interfaces to the systems around the run engine
//!
//! The engine never touches the media library, the commentary generator, the
//! audio backend or the GUI directly; it talks to them through these traits.
//! All of them must be usable from the playback thread and the command
//! threads at the same time, hence the `Send + Sync` bounds and `&self`
//! receivers. Implementations use interior mutability where they need state.

use crate::error::Result;
use crate::playback::spots::{SpotProfile, SpotRequest};
use crate::track::{Track, TrackTransition};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of the tracks of a run
pub trait TrackSequencer: Send + Sync {
    /// Next track; `skip_grouping` asks to leave the current grouping first.
    /// `None` when the sequence is exhausted.
    fn next_track(&self, skip_grouping: bool) -> Result<Option<TrackTransition>>;

    /// Peek at the track `next_track(false)` would return
    fn upcoming_track(&self) -> Option<TrackTransition>;

    /// Tracks to play in this run, -1 for unbounded
    fn total(&self) -> i64;

    /// Name of the grouping the sequencer walks by ("album", "directory"...)
    fn sort_type(&self) -> Option<String> {
        None
    }

    /// Called once a track has finished (played, skipped or failed)
    fn mark_played(&self, _track: &Track) {}
}

/// Generator of commentary spots
pub trait Commentator: Send + Sync {
    /// Refresh time-based schedules
    fn check_schedules(&self) {}

    /// Fails with [`crate::Error::ScheduledShutdown`] when a schedule says to stop
    fn check_for_shutdowns(&self) -> Result<()> {
        Ok(())
    }

    /// Plan (not yet prepare) the spot for a transition
    fn get_spot_profile(&self, request: SpotRequest) -> SpotProfile {
        SpotProfile::new(&request)
    }

    /// Fill in the utterances of `profile`; may be slow
    fn prepare(&self, profile: &SpotProfile, ui: &dyn UiCallbacks) -> Result<()>;

    /// Whether look-ahead preparation should start at this point of the track
    fn ready_to_prepare(&self, elapsed_seconds: f64, remaining_seconds: f64) -> bool;

    /// Forget per-run state
    fn reset(&self) {}
}

/// Speech output
pub trait Voice: Send + Sync {
    /// Speak `text`, returning once it has been said
    fn say(&self, text: &str) -> Result<()>;
}

/// Native media backend
///
/// Times are milliseconds; -1 means unknown.
pub trait MediaPlayer: Send + Sync {
    fn load(&self, track: &Track) -> Result<()>;
    fn play(&self) -> Result<()>;
    fn stop(&self);
    fn pause(&self);
    fn unpause(&self);
    fn is_playing(&self) -> bool;
    fn get_time(&self) -> i64;
    fn get_length(&self) -> i64;
    fn audio_set_volume(&self, volume: u8);

    /// Render video into a native window
    fn set_output_window(&self, _handle: u64) {}
}

/// Front-end notifications
///
/// Every method defaults to doing nothing.
pub trait UiCallbacks: Send + Sync {
    fn update_progress(&self, _percent: f64, _elapsed_ms: i64, _total_ms: i64) {}
    fn track_details(&self, _track: &Track) {}
    fn update_next_up(&self, _text: &str, _no_title: bool) {}
    fn update_prior_track(&self, _text: &str) {}
    fn update_spot_profile_topics(&self, _text: &str) {}
    fn update_album_artwork(&self, _path: Option<&Path>) {}

    /// Native window handle for video output
    fn get_media_frame_handle(&self) -> Option<u64> {
        None
    }

    /// Ask the application to quit
    fn shutdown_application(&self) {}
}

/// UI that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUi;

impl UiCallbacks for NoUi {}

/// Removal of temporary files produced during a run
pub trait TransientCleanup: Send + Sync {
    fn clean(&self);
}

/// Cleanup that empties one scratch directory
#[derive(Debug, Clone)]
pub struct TransientDir {
    dir: PathBuf,
}

impl TransientDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl TransientCleanup for TransientDir {
    fn clean(&self) {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("No transient files to clean in {}: {}", self.dir.display(), e);
                return;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove transient file {}: {}", path.display(), e),
            }
        }
        debug!("Removed {} transient entries from {}", removed, self.dir.display());
    }
}

/// Cleanup that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCleanup;

impl TransientCleanup for NoCleanup {
    fn clean(&self) {}
}

/// Everything a run talks to
#[derive(Clone)]
pub struct Collaborators {
    pub sequencer: Arc<dyn TrackSequencer>,
    pub player: Arc<dyn MediaPlayer>,
    pub ui: Arc<dyn UiCallbacks>,
    pub commentator: Option<Arc<dyn Commentator>>,
    pub voice: Option<Arc<dyn Voice>>,
    pub cleanup: Arc<dyn TransientCleanup>,
}

impl Collaborators {
    /// Sequencer and player only: no UI, commentary or cleanup
    pub fn new(sequencer: Arc<dyn TrackSequencer>, player: Arc<dyn MediaPlayer>) -> Self {
        Self {
            sequencer,
            player,
            ui: Arc::new(NoUi),
            commentator: None,
            voice: None,
            cleanup: Arc::new(NoCleanup),
        }
    }

    pub fn with_ui(mut self, ui: Arc<dyn UiCallbacks>) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_commentator(mut self, commentator: Arc<dyn Commentator>) -> Self {
        self.commentator = Some(commentator);
        self
    }

    pub fn with_voice(mut self, voice: Arc<dyn Voice>) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_cleanup(mut self, cleanup: Arc<dyn TransientCleanup>) -> Self {
        self.cleanup = cleanup;
        self
    }
}
