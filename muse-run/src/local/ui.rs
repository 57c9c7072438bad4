//! Console front-end
//!
//! Logs UI notifications, or prints them to stdout as JSON lines for a
//! front-end process to consume.

use crate::collaborators::UiCallbacks;
use crate::track::Track;
use muse_common::human_time::format_track_time;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tracing::{debug, info, warn};

/// One UI notification as emitted in JSON mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    TrackDetails {
        title: String,
        path: PathBuf,
        album: Option<String>,
    },
    Progress {
        percent: f64,
        elapsed_ms: i64,
        total_ms: i64,
    },
    NextUp {
        text: String,
        no_title: bool,
    },
    PriorTrack {
        text: String,
    },
    Topics {
        text: String,
    },
    Artwork {
        path: Option<PathBuf>,
    },
    Shutdown,
}

/// UI printing to the terminal
pub struct ConsoleUi {
    json: bool,
    shutdown_requested: AtomicBool,
    /// Last 10-second bucket logged in plain mode
    last_reported_bucket: AtomicI64,
}

impl ConsoleUi {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            shutdown_requested: AtomicBool::new(false),
            last_reported_bucket: AtomicI64::new(-1),
        }
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    fn emit(&self, event: UiEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize UI event: {}", e),
        }
    }
}

impl UiCallbacks for ConsoleUi {
    fn update_progress(&self, percent: f64, elapsed_ms: i64, total_ms: i64) {
        if self.json {
            self.emit(UiEvent::Progress {
                percent,
                elapsed_ms,
                total_ms,
            });
            return;
        }

        let bucket = elapsed_ms / 10_000;
        if self.last_reported_bucket.swap(bucket, Ordering::Relaxed) != bucket {
            debug!(
                "{} / {} ({:.0}%)",
                format_track_time(elapsed_ms),
                format_track_time(total_ms),
                percent
            );
        }
    }

    fn track_details(&self, track: &Track) {
        self.last_reported_bucket.store(-1, Ordering::Relaxed);
        if self.json {
            self.emit(UiEvent::TrackDetails {
                title: track.readable_title(),
                path: track.path().to_path_buf(),
                album: track.album().map(str::to_string),
            });
        } else {
            info!("Now playing: {}", track.readable_title());
        }
    }

    fn update_next_up(&self, text: &str, no_title: bool) {
        if self.json {
            self.emit(UiEvent::NextUp {
                text: text.to_string(),
                no_title,
            });
        } else if !no_title {
            info!("Next up: {}", text);
        }
    }

    fn update_prior_track(&self, text: &str) {
        if self.json {
            self.emit(UiEvent::PriorTrack {
                text: text.to_string(),
            });
        } else if !text.is_empty() {
            debug!("Previously: {}", text);
        }
    }

    fn update_spot_profile_topics(&self, text: &str) {
        if self.json {
            self.emit(UiEvent::Topics {
                text: text.to_string(),
            });
        } else {
            debug!("Spot topics: {}", text);
        }
    }

    fn update_album_artwork(&self, path: Option<&Path>) {
        if self.json {
            self.emit(UiEvent::Artwork {
                path: path.map(Path::to_path_buf),
            });
        }
    }

    fn shutdown_application(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        if self.json {
            self.emit(UiEvent::Shutdown);
        } else {
            info!("Shutting down");
        }
    }
}
