//! Speech output backends

use crate::collaborators::Voice;
use crate::error::{Error, Result};
use std::process::{Command, Stdio};
use tracing::info;

/// Speaks by running a command with the text as last argument
/// (`espeak`, `say`, `spd-say --wait`...)
pub struct CommandVoice {
    command: Vec<String>,
}

impl CommandVoice {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::Config("Voice command is empty".to_string()));
        }
        Ok(Self { command })
    }
}

impl Voice for CommandVoice {
    fn say(&self, text: &str) -> Result<()> {
        let status = Command::new(&self.command[0])
            .args(&self.command[1..])
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Commentary(format!("Failed to run {}: {}", self.command[0], e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Commentary(format!("{} exited with {}", self.command[0], status)))
        }
    }
}

/// Writes utterances to the log instead of speaking them
#[derive(Debug, Default)]
pub struct LogVoice;

impl Voice for LogVoice {
    fn say(&self, text: &str) -> Result<()> {
        info!("Muse: {}", text);
        Ok(())
    }
}
