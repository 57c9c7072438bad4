//! # Muse Run Engine (muse-run)
//!
//! Drives one continuous play session of a playlist: fetches tracks, prepares
//! and speaks commentary spots between them, waits out a jittered delay and
//! follows playback, while staying responsive to skip, pause and cancel.
//!
//! **Architecture:** the playback loop runs on the thread that calls
//! [`Run::execute`]; commentary is prepared on short-lived threads and spoken
//! by one persistent speech worker. Shared state lives behind `Mutex` +
//! `Condvar` pairs ([`RunContext`], [`JobQueue`]).
//!
//! The media library, commentary generator, audio backend and GUI are
//! reached through the traits in [`collaborators`]; [`local`] provides
//! implementations backed by a music folder and external commands.

pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod job_queue;
pub mod local;
pub mod playback;
pub mod run;
pub mod track;

pub use collaborators::Collaborators;
pub use config::RunConfig;
pub use context::{ContextSnapshot, RunContext};
pub use error::{Error, Result};
pub use job_queue::{JobQueue, JobWorker};
pub use playback::{Playback, RunOutcome};
pub use run::{Run, RunStatus};
pub use track::{Track, TrackToken, TrackTransition};
