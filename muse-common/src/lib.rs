//! # Muse Common Library
//!
//! Shared code for the Muse crates:
//! - Error type
//! - Configuration loading (TOML bootstrap, library folder resolution)
//! - User action and run state types
//! - Timestamp and human-readable time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod time;

pub use error::{Error, Result};
pub use events::{RunState, UserAction};
