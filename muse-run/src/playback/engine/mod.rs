//! Playback run loop
//!
//! **Module Structure:**
//! - `core.rs`: Playback struct, per-track iteration, advance and outcome
//! - `commentary.rs`: schedule checks, spot preparation (synchronous and look-ahead), speech
//! - `progress.rs`: inter-track delay, start detection, progress polling

mod commentary;
mod core;
mod progress;

pub use self::core::{Playback, PlaybackProgress, RunOutcome};
