//! Playback run loop and its helpers

pub mod delay;
pub mod engine;
pub mod speech;
pub mod spots;

pub use engine::{Playback, PlaybackProgress, RunOutcome};
pub use speech::{Speaker, SpeechOutcome};
pub use spots::{SpotProfile, SpotRegistry, SpotRequest};
