//! Plain announcer commentator
//!
//! Introduces the next track by name, mentions the one that just finished and
//! announces when playback moves to a new grouping. Optionally ends the session
//! at a fixed wall-clock time.

use crate::collaborators::{Commentator, UiCallbacks};
use crate::error::{Error, Result};
use crate::playback::spots::SpotProfile;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::{debug, info};

/// Commentator that reads out track names
pub struct Announcer {
    lead_seconds: f64,
    shutdown_at: Option<DateTime<Utc>>,
    spots_prepared: Mutex<u64>,
}

impl Announcer {
    /// Look-ahead preparation starts `lead_seconds` before the end of a track
    pub fn new(lead_seconds: f64) -> Self {
        Self {
            lead_seconds,
            shutdown_at: None,
            spots_prepared: Mutex::new(0),
        }
    }

    /// End the session at the first schedule check at or after `at`
    pub fn with_shutdown_at(mut self, at: DateTime<Utc>) -> Self {
        self.shutdown_at = Some(at);
        self
    }

    pub fn spots_prepared(&self) -> u64 {
        *self.spots_prepared.lock().unwrap()
    }
}

impl Commentator for Announcer {
    fn check_schedules(&self) {
        if let Some(at) = self.shutdown_at {
            debug!("Shutdown scheduled at {}", at.to_rfc3339());
        }
    }

    fn check_for_shutdowns(&self) -> Result<()> {
        match self.shutdown_at {
            Some(at) if muse_common::time::now() >= at => {
                info!("Scheduled shutdown time {} reached", at.to_rfc3339());
                Err(Error::ScheduledShutdown)
            }
            _ => Ok(()),
        }
    }

    fn prepare(&self, profile: &SpotProfile, _ui: &dyn UiCallbacks) -> Result<()> {
        let track = profile.track();

        if let Some(previous) = profile.previous_track() {
            profile.add_utterance(format!("That was {}.", previous.readable_title()));
        }
        if profile.is_new_grouping() {
            if let Some(grouping) = profile.grouping() {
                profile.add_utterance(format!("Now playing from {}.", grouping));
            }
        }
        let intro = match track.artist() {
            Some(artist) => format!("Up next, {} by {}.", track.title(), artist),
            None => format!("Up next, {}.", track.title()),
        };
        profile.add_utterance(intro);
        profile.set_topics(profile.grouping().unwrap_or("music").to_string());

        *self.spots_prepared.lock().unwrap() += 1;
        Ok(())
    }

    fn ready_to_prepare(&self, _elapsed_seconds: f64, remaining_seconds: f64) -> bool {
        remaining_seconds <= self.lead_seconds
    }

    fn reset(&self) {
        *self.spots_prepared.lock().unwrap() = 0;
    }
}
