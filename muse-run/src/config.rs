//! Run configuration
//!
//! Deserialized from the `[playback]` table of the bootstrap TOML file. Every
//! field has a built-in default so an empty or missing section is valid.
//!
//! ```toml
//! [playback]
//! delay_seconds = 5.0
//! delay_jitter_seconds = 1.5
//! poll_interval_ms = 500
//! commentary_enabled = true
//! ```

use crate::error::{Error, Result};
use muse_common::config::TomlConfig;
use muse_common::time::millis_to_duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default capacity of the speech job queue
pub const DEFAULT_JOB_QUEUE_CAPACITY: usize = 50;

/// Playback run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base pause between tracks, before jitter
    pub delay_seconds: f64,

    /// Maximum random deviation applied to the base delay (either direction)
    pub delay_jitter_seconds: f64,

    /// Tracks shorter than this get half the base delay
    pub short_track_seconds: f64,

    /// Sleep increment of every wait in the playback loop
    pub poll_interval_ms: u64,

    /// How long to wait for the backend to report playing after `play()`
    pub start_grace_ms: u64,

    /// Backend volume (0-100)
    pub volume: u8,

    /// Master switch for commentary spots
    pub commentary_enabled: bool,

    /// Capacity of the speech job queue
    pub job_queue_capacity: usize,

    /// Seconds before the end of a track at which the next spot is prepared
    pub lead_seconds: f64,

    /// Number of tracks to play, -1 for unbounded
    pub total: i64,

    /// Command used by the process player (program followed by arguments)
    pub player_command: Vec<String>,

    /// Command used to speak commentary; text is appended as last argument
    pub voice_command: Option<Vec<String>>,

    /// Scratch directory emptied when a run ends
    pub transient_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 5.0,
            delay_jitter_seconds: 1.5,
            short_track_seconds: 90.0,
            poll_interval_ms: 500,
            start_grace_ms: 3000,
            volume: 60,
            commentary_enabled: true,
            job_queue_capacity: DEFAULT_JOB_QUEUE_CAPACITY,
            lead_seconds: 45.0,
            total: -1,
            player_command: vec![
                "ffplay".to_string(),
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],
            voice_command: None,
            transient_dir: None,
        }
    }
}

impl RunConfig {
    /// Extract and validate the `[playback]` section of a bootstrap config
    pub fn from_toml(toml: &TomlConfig) -> Result<Self> {
        let config: RunConfig = toml.playback_section()?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.delay_seconds >= 0.0) {
            return Err(Error::Config(format!(
                "delay_seconds must be >= 0, got {}",
                self.delay_seconds
            )));
        }
        if !(self.delay_jitter_seconds >= 0.0) {
            return Err(Error::Config(format!(
                "delay_jitter_seconds must be >= 0, got {}",
                self.delay_jitter_seconds
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be > 0".to_string()));
        }
        if self.volume > 100 {
            return Err(Error::Config(format!("volume must be 0-100, got {}", self.volume)));
        }
        if self.job_queue_capacity == 0 {
            return Err(Error::Config("job_queue_capacity must be > 0".to_string()));
        }
        if self.total < -1 || self.total == 0 {
            return Err(Error::Config(format!(
                "total must be -1 (unbounded) or positive, got {}",
                self.total
            )));
        }
        if self.player_command.is_empty() {
            return Err(Error::Config("player_command must name a program".to_string()));
        }
        if matches!(&self.voice_command, Some(cmd) if cmd.is_empty()) {
            return Err(Error::Config("voice_command must name a program".to_string()));
        }
        Ok(())
    }

    /// Poll increment as Duration
    pub fn poll_interval(&self) -> Duration {
        millis_to_duration(self.poll_interval_ms)
    }

    /// Start grace period as Duration
    pub fn start_grace(&self) -> Duration {
        millis_to_duration(self.start_grace_ms)
    }
}
