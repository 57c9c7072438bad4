//! Commentary spot profiles and the per-run registry
//!
//! A [`SpotProfile`] is the commentary planned for one transition (previous
//! track → next track). It is shared between the thread preparing it and the
//! playback loop, so its mutable parts sit behind a mutex and an atomic.
//!
//! [`SpotRegistry`] maps each track instance to at most one profile.

use crate::track::{Track, TrackToken, TrackTransition};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What a commentator needs to plan a spot
#[derive(Debug, Clone)]
pub struct SpotRequest {
    /// Track that was playing before the transition
    pub previous: Option<Track>,
    /// Transition into the track the spot introduces
    pub next: TrackTransition,
    /// Grouping label of the sequencer ("album", "directory"...)
    pub sort_type: Option<String>,
    /// No track has been played in this run yet
    pub is_first: bool,
}

#[derive(Debug, Default)]
struct SpotContent {
    utterances: Vec<String>,
    topics: Option<String>,
}

struct SpotInner {
    previous: Option<Track>,
    track: Mutex<Track>,
    grouping: Option<String>,
    is_new_grouping: bool,
    content: Mutex<SpotContent>,
    prepared: AtomicBool,
}

/// Planned commentary for one transition
///
/// Cloning shares the same profile.
#[derive(Clone)]
pub struct SpotProfile {
    inner: Arc<SpotInner>,
}

impl SpotProfile {
    pub fn new(request: &SpotRequest) -> Self {
        Self {
            inner: Arc::new(SpotInner {
                previous: request.previous.clone(),
                track: Mutex::new(request.next.track.clone()),
                grouping: request.next.new_grouping.clone(),
                is_new_grouping: request.next.is_new_grouping(),
                content: Mutex::new(SpotContent::default()),
                prepared: AtomicBool::new(false),
            }),
        }
    }

    pub fn previous_track(&self) -> Option<&Track> {
        self.inner.previous.as_ref()
    }

    /// Track this spot introduces
    pub fn track(&self) -> Track {
        self.inner.track.lock().unwrap().clone()
    }

    /// Grouping label of the track this spot introduces
    pub fn grouping(&self) -> Option<&str> {
        self.inner.grouping.as_deref()
    }

    pub fn is_new_grouping(&self) -> bool {
        self.inner.is_new_grouping
    }

    /// Point the spot at a different track (an extension fetched late)
    pub fn retarget(&self, track: &Track) {
        *self.inner.track.lock().unwrap() = track.clone();
    }

    pub fn add_utterance(&self, text: impl Into<String>) {
        self.inner.content.lock().unwrap().utterances.push(text.into());
    }

    pub fn utterances(&self) -> Vec<String> {
        self.inner.content.lock().unwrap().utterances.clone()
    }

    pub fn set_topics(&self, topics: impl Into<String>) {
        self.inner.content.lock().unwrap().topics = Some(topics.into());
    }

    pub fn topics(&self) -> Option<String> {
        self.inner.content.lock().unwrap().topics.clone()
    }

    /// Called once preparation has finished filling in the utterances
    pub fn mark_prepared(&self) {
        self.inner.prepared.store(true, Ordering::Release);
    }

    pub fn is_prepared(&self) -> bool {
        self.inner.prepared.load(Ordering::Acquire)
    }

    /// Prepared and non-empty
    pub fn has_something_to_say(&self) -> bool {
        self.is_prepared() && !self.inner.content.lock().unwrap().utterances.is_empty()
    }
}

impl std::fmt::Debug for SpotProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotProfile")
            .field("track", &self.track().path().display().to_string())
            .field("prepared", &self.is_prepared())
            .finish()
    }
}

/// Spot profiles of one run, keyed by track instance
#[derive(Debug, Default)]
pub struct SpotRegistry {
    profiles: HashMap<TrackToken, SpotProfile>,
}

impl SpotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `profile` for `token`; returns false (and keeps the existing
    /// profile) when the token already has one
    pub fn insert(&mut self, token: TrackToken, profile: SpotProfile) -> bool {
        if self.profiles.contains_key(&token) {
            return false;
        }
        self.profiles.insert(token, profile);
        true
    }

    pub fn get(&self, token: &TrackToken) -> Option<&SpotProfile> {
        self.profiles.get(token)
    }

    pub fn contains(&self, token: &TrackToken) -> bool {
        self.profiles.contains_key(token)
    }

    pub fn remove(&mut self, token: &TrackToken) -> Option<SpotProfile> {
        self.profiles.remove(token)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }

    /// Drop every profile except the one for `keep`; returns how many went
    pub fn discard_others(&mut self, keep: &TrackToken) -> usize {
        let before = self.profiles.len();
        self.profiles.retain(|token, _| token == keep);
        before - self.profiles.len()
    }

    /// Move a look-ahead profile onto the token of the track actually fetched
    ///
    /// A profile planned for the same file is adopted; failing that, an
    /// extension track adopts any outstanding profile. Returns true when the
    /// token now has a profile.
    pub fn adopt(&mut self, token: TrackToken, track: &Track) -> bool {
        if self.profiles.contains_key(&token) {
            return true;
        }

        let found = self
            .profiles
            .iter()
            .find(|(_, p)| p.track().path() == track.path())
            .map(|(k, _)| *k)
            .or_else(|| {
                if track.is_extension() {
                    self.profiles.keys().next().copied()
                } else {
                    None
                }
            });

        match found.and_then(|old| self.profiles.remove(&old).map(|p| (old, p))) {
            Some((old, profile)) => {
                profile.retarget(track);
                debug!(
                    "Spot profile {} moved to {} for {}",
                    old,
                    token,
                    track.path().display()
                );
                self.profiles.insert(token, profile);
                true
            }
            None => false,
        }
    }
}
