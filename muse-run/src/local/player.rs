//! External process player backend
//!
//! Plays each track by spawning a command-line player (ffplay by default)
//! with the track path as last argument. Elapsed time is measured locally,
//! excluding paused spans. Pause and resume stop and continue the child
//! process (unix only).

use crate::collaborators::MediaPlayer;
use crate::error::{Error, Result};
use crate::track::Track;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Job control signals sent to the player process
#[derive(Debug, Clone, Copy)]
enum PlayerSignal {
    Stop,
    Continue,
}

#[derive(Default)]
struct PlayerState {
    loaded: Option<Track>,
    child: Option<Child>,
    started: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl PlayerState {
    fn elapsed(&self) -> Option<Duration> {
        let started = self.started?;
        let current_pause = self.paused_at.map(|p| p.elapsed()).unwrap_or_default();
        Some(
            started
                .elapsed()
                .saturating_sub(self.paused_total)
                .saturating_sub(current_pause),
        )
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if self.paused_at.is_some() {
                if let Err(e) = signal_child(&child, PlayerSignal::Continue) {
                    debug!("Failed to resume player before kill: {}", e);
                }
            }
            if let Err(e) = child.kill() {
                debug!("Player process already gone: {}", e);
            }
            let _ = child.wait();
        }
        self.started = None;
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }
}

/// Media backend running one player process per track
pub struct ProcessPlayer {
    command: Vec<String>,
    volume: AtomicU8,
    state: Mutex<PlayerState>,
}

impl ProcessPlayer {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.is_empty() {
            return Err(Error::Config("Player command is empty".to_string()));
        }
        Ok(Self {
            command,
            volume: AtomicU8::new(100),
            state: Mutex::new(PlayerState::default()),
        })
    }

    fn build_command(&self, track: &Track) -> Command {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        if self.command[0].ends_with("ffplay") {
            cmd.arg("-volume")
                .arg(self.volume.load(Ordering::Relaxed).to_string());
        }
        cmd.arg(track.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl MediaPlayer for ProcessPlayer {
    fn load(&self, track: &Track) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.kill_child();
        state.loaded = Some(track.clone());
        Ok(())
    }

    fn play(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let track = state
            .loaded
            .clone()
            .ok_or_else(|| Error::Backend("Nothing loaded".to_string()))?;
        state.kill_child();

        let child = self.build_command(&track).spawn().map_err(|e| {
            Error::Backend(format!("Failed to start {}: {}", self.command[0], e))
        })?;

        info!("Playing {} (pid {})", track.path().display(), child.id());
        state.child = Some(child);
        state.started = Some(Instant::now());
        Ok(())
    }

    fn stop(&self) {
        self.state.lock().unwrap().kill_child();
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if state.paused_at.is_some() {
            return;
        }
        let Some(child) = &state.child else {
            return;
        };
        match signal_child(child, PlayerSignal::Stop) {
            Ok(()) => state.paused_at = Some(Instant::now()),
            Err(e) => warn!("Failed to pause player: {}", e),
        }
    }

    fn unpause(&self) {
        let mut state = self.state.lock().unwrap();
        let Some(paused_at) = state.paused_at.take() else {
            return;
        };
        state.paused_total += paused_at.elapsed();
        if let Some(child) = &state.child {
            if let Err(e) = signal_child(child, PlayerSignal::Continue) {
                warn!("Failed to resume player: {}", e);
            }
        }
    }

    fn is_playing(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.paused_at.is_some() {
            return false;
        }
        match state.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("Player process exited: {}", status);
                false
            }
            Some(Err(e)) => {
                warn!("Failed to poll player process: {}", e);
                false
            }
            None => false,
        }
    }

    fn get_time(&self) -> i64 {
        let state = self.state.lock().unwrap();
        state.elapsed().map(|d| d.as_millis() as i64).unwrap_or(-1)
    }

    fn get_length(&self) -> i64 {
        let state = self.state.lock().unwrap();
        state
            .loaded
            .as_ref()
            .and_then(|t| t.duration_ms())
            .map(|ms| ms as i64)
            .unwrap_or(-1)
    }

    fn audio_set_volume(&self, volume: u8) {
        self.volume.store(volume.min(100), Ordering::Relaxed);
    }
}

impl Drop for ProcessPlayer {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.kill_child();
        }
    }
}

#[cfg(unix)]
fn signal_child(child: &Child, signal: PlayerSignal) -> std::io::Result<()> {
    let signum = match signal {
        PlayerSignal::Stop => libc::SIGSTOP,
        PlayerSignal::Continue => libc::SIGCONT,
    };
    let pid = child.id() as libc::pid_t;
    // SAFETY: kill(2) takes plain integers; pid is our own child process
    if unsafe { libc::kill(pid, signum) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn signal_child(_child: &Child, signal: PlayerSignal) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("{:?} is not supported on this platform", signal),
    ))
}
