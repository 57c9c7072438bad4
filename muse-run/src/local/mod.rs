//! Collaborators for running from the command line: a music folder, an
//! external player process, a plain announcer and a console UI

pub mod announcer;
pub mod library;
pub mod player;
pub mod ui;
pub mod voice;

pub use announcer::Announcer;
pub use library::DirectorySequencer;
pub use player::ProcessPlayer;
pub use ui::{ConsoleUi, UiEvent};
pub use voice::{CommandVoice, LogVoice};
