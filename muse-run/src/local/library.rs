//! Music folder sequencer
//!
//! Walks a library folder, groups media files by the directory holding them and
//! plays the groups one after another. A grouping skip jumps to the first track
//! of the next directory.

use crate::collaborators::TrackSequencer;
use crate::error::{Error, Result};
use crate::track::{Track, TrackTransition};
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// File extensions treated as playable media
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "opus", "wav", "m4a", "aac", "wma", "mp4", "mkv", "webm", "avi", "mov",
];

const ARTWORK_NAMES: &[&str] = &["cover.jpg", "cover.png", "folder.jpg", "folder.png"];

const IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", ".git", ".svn"];

/// Tracks of one directory
#[derive(Debug, Clone)]
pub struct TrackGroup {
    pub name: String,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Default)]
struct Cursor {
    group: usize,
    track: usize,
    /// Group of the last track handed out
    current: Option<usize>,
}

/// Sequencer over the groups of a music folder
pub struct DirectorySequencer {
    groups: Vec<TrackGroup>,
    total: i64,
    cursor: Mutex<Cursor>,
}

impl DirectorySequencer {
    /// Scan `root` recursively; `shuffle` randomizes the order of directories
    pub fn scan(root: &Path, total: i64, shuffle: bool) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Sequencer(format!(
                "Library folder not found: {}",
                root.display()
            )));
        }

        let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored(e));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_media_file(entry.path()) => {
                    let dir = entry
                        .path()
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    by_dir.entry(dir).or_default().push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!("Error accessing library entry: {}", e),
            }
        }

        let mut groups: Vec<TrackGroup> = by_dir
            .into_iter()
            .map(|(dir, files)| build_group(root, &dir, files))
            .collect();

        if shuffle {
            groups.shuffle(&mut rand::thread_rng());
        }

        let track_count: usize = groups.iter().map(|g| g.tracks.len()).sum();
        info!(
            "Library {}: {} tracks in {} directories",
            root.display(),
            track_count,
            groups.len()
        );

        Ok(Self::from_groups(groups, total))
    }

    pub fn from_groups(groups: Vec<TrackGroup>, total: i64) -> Self {
        let groups = groups.into_iter().filter(|g| !g.tracks.is_empty()).collect();
        Self {
            groups,
            total,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    pub fn groups(&self) -> &[TrackGroup] {
        &self.groups
    }

    pub fn track_count(&self) -> usize {
        self.groups.iter().map(|g| g.tracks.len()).sum()
    }

    fn transition_at(&self, cursor: &Cursor) -> Option<TrackTransition> {
        let group = self.groups.get(cursor.group)?;
        let track = group.tracks.get(cursor.track)?;
        let old = cursor.current.map(|i| self.groups[i].name.clone());
        Some(TrackTransition::new(track.clone()).with_groupings(old, Some(group.name.clone())))
    }
}

impl TrackSequencer for DirectorySequencer {
    fn next_track(&self, skip_grouping: bool) -> Result<Option<TrackTransition>> {
        let mut cursor = self.cursor.lock().unwrap();

        if skip_grouping && cursor.current == Some(cursor.group) {
            debug!("Skipping rest of {}", self.groups[cursor.group].name);
            cursor.group += 1;
            cursor.track = 0;
        }

        let Some(transition) = self.transition_at(&cursor) else {
            return Ok(None);
        };

        cursor.current = Some(cursor.group);
        cursor.track += 1;
        if cursor.track >= self.groups[cursor.group].tracks.len() {
            cursor.group += 1;
            cursor.track = 0;
        }

        Ok(Some(transition))
    }

    fn upcoming_track(&self) -> Option<TrackTransition> {
        let cursor = self.cursor.lock().unwrap();
        self.transition_at(&cursor)
    }

    fn total(&self) -> i64 {
        self.total
    }

    fn sort_type(&self) -> Option<String> {
        Some("directory".to_string())
    }

    fn mark_played(&self, track: &Track) {
        debug!("Played {}", track.path().display());
    }
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    IGNORED_NAMES.iter().any(|ignored| name == *ignored)
}

/// Media file by extension (case-insensitive)
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn build_group(root: &Path, dir: &Path, files: Vec<PathBuf>) -> TrackGroup {
    let name = dir
        .strip_prefix(root)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(|rel| rel.display().to_string())
        .unwrap_or_else(|| {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string())
        });

    let artwork = ARTWORK_NAMES
        .iter()
        .map(|n| dir.join(n))
        .find(|p| p.is_file());

    let tracks = files
        .into_iter()
        .map(|path| {
            let tags = read_tags(&path);
            let mut track = Track::new(path);
            if let Some(title) = tags.title {
                track = track.with_title(title);
            }
            if let Some(artist) = tags.artist {
                track = track.with_artist(artist);
            }
            if let Some(duration_ms) = tags.duration_ms {
                track = track.with_duration_ms(duration_ms);
            }
            track = track.with_album(tags.album.unwrap_or_else(|| name.clone()));
            match &artwork {
                Some(art) => track.with_artwork(art.clone()),
                None => track,
            }
        })
        .collect();

    TrackGroup { name, tracks }
}

/// Tags and length read from a media file
#[derive(Debug, Default, PartialEq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Probe `path` for tags and duration
///
/// Files lofty cannot parse (video containers, broken files) yield empty tags;
/// the track then plays with its file name and an unknown length.
pub fn read_tags(path: &Path) -> TrackTags {
    let tagged_file = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(file) => file,
        Err(e) => {
            debug!("No metadata for {}: {}", path.display(), e);
            return TrackTags::default();
        }
    };

    let duration = tagged_file.properties().duration();
    let duration_ms = u64::try_from(duration.as_millis())
        .ok()
        .filter(|ms| *ms > 0);

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
    let (title, artist, album) = match tag {
        Some(tag) => (
            tag.title().map(|s| s.to_string()),
            tag.artist().map(|s| s.to_string()),
            tag.album().map(|s| s.to_string()),
        ),
        None => (None, None, None),
    };

    TrackTags {
        title,
        artist,
        album,
        duration_ms,
    }
}
