//! Commentary side of the loop
//!
//! Commentary never stops playback: failures are logged and the run carries
//! on silently. The one exception is a scheduled shutdown, which ends the run.

use super::core::Playback;
use crate::collaborators::{Commentator, UiCallbacks};
use crate::error::Result;
use crate::playback::spots::{SpotProfile, SpotRequest};
use crate::track::{Track, TrackToken, TrackTransition};
use muse_common::human_time::format_human_time;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

impl Playback {
    /// Commentator, if commentary is switched on
    pub(super) fn active_commentator(&self) -> Option<Arc<dyn Commentator>> {
        if self.config.commentary_enabled {
            self.commentator.clone()
        } else {
            None
        }
    }

    /// Propagates only [`crate::Error::ScheduledShutdown`]
    pub(super) fn check_schedules(&self) -> Result<()> {
        let Some(commentator) = self.active_commentator() else {
            return Ok(());
        };

        commentator.check_schedules();
        match commentator.check_for_shutdowns() {
            Ok(()) => Ok(()),
            Err(e) if e.is_scheduled_shutdown() => Err(e),
            Err(e) => {
                warn!("Shutdown schedule check failed: {}", e);
                Ok(())
            }
        }
    }

    /// Make sure the fetched track has a spot
    ///
    /// A look-ahead profile for the same file (or for the track an extension
    /// continues) is moved onto `token`. Otherwise the spot is prepared here and
    /// the time it took is returned so it can come off the delay.
    pub(super) fn prepare_for(
        &mut self,
        token: TrackToken,
        transition: &TrackTransition,
    ) -> Option<Duration> {
        let commentator = self.active_commentator()?;

        let adopted = self.spots.adopt(token, &transition.track);
        let stale = self.spots.discard_others(&token);
        if stale > 0 {
            debug!("Discarded {} stale spot profiles", stale);
        }
        if adopted && !self.is_first {
            debug!("Using look-ahead spot for {}", transition.track.title());
            return None;
        }

        let start = Instant::now();
        let request = SpotRequest {
            previous: self.previous.clone(),
            next: transition.clone(),
            sort_type: self.sequencer.sort_type(),
            is_first: self.is_first,
        };
        let profile = commentator.get_spot_profile(request);
        self.spots.remove(&token);
        self.spots.insert(token, profile.clone());

        info!("Preparing spot for {}", transition.track.title());
        run_preparation(commentator.as_ref(), &profile, self.ui.as_ref());

        let spent = start.elapsed();
        debug!("Spot preparation took {}", format_human_time(spent.as_secs_f64()));
        Some(spent)
    }

    /// Speak the spot of `token`, if it is ready
    pub(super) fn speak(&self, token: &TrackToken) {
        let (Some(speaker), Some(profile)) = (&self.speaker, self.spots.get(token)) else {
            return;
        };

        if !profile.is_prepared() {
            debug!("Spot for {} not ready, nothing to say", profile.track().title());
            return;
        }

        let outcome = speaker.speak(profile, &self.ctx, self.config.poll_interval());
        debug!("Spot for {}: {:?}", profile.track().title(), outcome);
    }

    /// Start background preparation for the upcoming track once the
    /// commentator says it is time
    ///
    /// Returns true once no further attempt is needed for the current track.
    pub(super) fn maybe_start_lookahead(
        &mut self,
        current: &Track,
        elapsed_seconds: f64,
        remaining_seconds: f64,
    ) -> bool {
        let Some(commentator) = self.active_commentator() else {
            return true;
        };
        if !commentator.ready_to_prepare(elapsed_seconds, remaining_seconds) {
            return false;
        }
        let Some(next) = self.sequencer.upcoming_track() else {
            debug!("Nothing upcoming after {}", current.title());
            return true;
        };

        let token = TrackToken::new();
        let request = SpotRequest {
            previous: Some(current.clone()),
            next,
            sort_type: self.sequencer.sort_type(),
            is_first: false,
        };
        let profile = commentator.get_spot_profile(request);
        self.spots.insert(token, profile.clone());

        info!(
            "Preparing spot for {} in background ({:.0}s remaining)",
            profile.track().title(),
            remaining_seconds
        );

        let ui = Arc::clone(&self.ui);
        let spawned = thread::Builder::new()
            .name("muse-prep".to_string())
            .spawn(move || run_preparation(commentator.as_ref(), &profile, ui.as_ref()));

        match spawned {
            Ok(handle) => self.prep_threads.push(handle),
            Err(e) => {
                error!("Failed to spawn preparation thread: {}", e);
                self.spots.remove(&token);
            }
        }

        self.prep_threads.retain(|handle| !handle.is_finished());
        true
    }

    pub(super) fn join_prep_threads(&mut self) {
        for handle in self.prep_threads.drain(..) {
            if let Err(e) = handle.join() {
                error!("Preparation thread panicked: {:?}", e);
            }
        }
    }
}

fn run_preparation(commentator: &dyn Commentator, profile: &SpotProfile, ui: &dyn UiCallbacks) {
    match commentator.prepare(profile, ui) {
        Ok(()) => {
            profile.mark_prepared();
            if let Some(topics) = profile.topics() {
                ui.update_spot_profile_topics(&topics);
            }
        }
        Err(e) => warn!(
            "Commentary unavailable for {}: {}",
            profile.track().title(),
            e
        ),
    }
}
