//! Waiting: delay, start detection and progress polling
//!
//! All waits block on the run context's condition variable, so a user action
//! ends them immediately and the poll interval only bounds how often the
//! backend is asked for its position.

use super::core::Playback;
use muse_common::human_time::format_human_time;
use crate::track::Track;
use std::time::{Duration, Instant};
use tracing::{debug, info};

impl Playback {
    /// Wait `delay`, returning early when `skip_delay` is raised
    pub(super) fn wait_delay(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }

        info!("Waiting {} before next track", format_human_time(delay.as_secs_f64()));
        if self.ctx.wait_until(delay, |flags| flags.skip_delay) {
            debug!("Delay skipped");
        }
    }

    /// Give the backend the start grace period to report playing
    ///
    /// A skip during the grace period counts as started; the progress loop
    /// then exits straight away. So does a pause, which the progress loop
    /// waits out.
    pub(super) fn wait_for_start(&self) -> bool {
        let deadline = Instant::now() + self.config.start_grace();
        loop {
            let flags = self.ctx.snapshot();
            if self.player.is_playing() || flags.should_skip() || flags.is_paused {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let step = self.config.poll_interval().min(deadline - now);
            self.ctx
                .wait_until(step, |flags| flags.should_skip() || flags.is_paused);
        }
    }

    /// Follow the track until it ends or is skipped
    pub(super) fn poll_progress(&mut self, track: &Track) {
        let mut lookahead_done = false;

        loop {
            let flags = self.ctx.snapshot();
            if flags.should_skip() {
                info!("Skipping {}", track.title());
                break;
            }
            if !flags.is_paused && !self.player.is_playing() {
                debug!("Finished {}", track.title());
                break;
            }

            self.ctx
                .wait_until(self.config.poll_interval(), |flags| flags.should_skip());

            let elapsed_ms = self.player.get_time();
            let length_ms = self.player.get_length();
            self.ui
                .update_progress(progress_percent(elapsed_ms, length_ms), elapsed_ms, length_ms);

            if !lookahead_done && elapsed_ms >= 0 && length_ms > 0 {
                let elapsed_s = elapsed_ms as f64 / 1000.0;
                let remaining_s = (length_ms - elapsed_ms).max(0) as f64 / 1000.0;
                lookahead_done = self.maybe_start_lookahead(track, elapsed_s, remaining_s);
            }
        }
    }
}

/// Percentage played, 0 when either time is unknown
pub(crate) fn progress_percent(elapsed_ms: i64, length_ms: i64) -> f64 {
    if elapsed_ms < 0 || length_ms <= 0 {
        return 0.0;
    }
    (elapsed_ms as f64 / length_ms as f64 * 100.0).clamp(0.0, 100.0)
}
