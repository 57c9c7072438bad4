//! Track types

use crate::error::{Error, Result};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One playable media file
///
/// Immutable once built. Equality and hashing use the path only.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    path: PathBuf,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    /// Length in milliseconds, when known before playback
    duration_ms: Option<u64>,
    artwork: Option<PathBuf>,
    /// Set for a track appended to an already planned transition
    /// (second movement, bonus track...)
    is_extension: bool,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            title: None,
            artist: None,
            album: None,
            duration_ms: None,
            artwork: None,
            is_extension: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_artwork(mut self, artwork: impl Into<PathBuf>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    pub fn as_extension(mut self) -> Self {
        self.is_extension = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / 1000.0)
    }

    pub fn artwork(&self) -> Option<&Path> {
        self.artwork.as_deref()
    }

    pub fn is_extension(&self) -> bool {
        self.is_extension
    }

    /// Title, falling back to the file stem
    pub fn title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// "Title - Artist" when the artist is known
    pub fn readable_title(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", self.title(), artist),
            None => self.title(),
        }
    }

    /// Fail with [`Error::InvalidTrack`] unless the path is an existing regular file
    pub fn validate(&self) -> Result<()> {
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(Error::InvalidTrack(self.path.clone())),
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.readable_title())
    }
}

/// Identity of one track instance inside a run
///
/// The same file played twice gets two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TrackToken(Uuid);

impl TrackToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A track plus the grouping labels on either side of it
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTransition {
    pub track: Track,
    /// Grouping of the previous track (album, folder...)
    pub old_grouping: Option<String>,
    /// Grouping of `track`
    pub new_grouping: Option<String>,
}

impl TrackTransition {
    pub fn new(track: Track) -> Self {
        Self {
            track,
            old_grouping: None,
            new_grouping: None,
        }
    }

    pub fn with_groupings(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_grouping = old;
        self.new_grouping = new;
        self
    }

    /// The grouping label changed with this track
    pub fn is_new_grouping(&self) -> bool {
        self.new_grouping.is_some() && self.old_grouping != self.new_grouping
    }
}
