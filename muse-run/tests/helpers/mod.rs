//! Test helpers for muse-run integration tests
//!
//! Provides scripted collaborators:
//! - TrackLibrary: real track files in a temp dir, grouped by folder
//! - ScriptedSequencer: plays a fixed list, records every fetch
//! - FakePlayer: clock-driven backend honoring track durations and pause
//! - ScriptedCommentator / RecordingVoice / RecordingUi / CountingCleanup
//! - EventLog: shared ordered log of player and voice calls

#![allow(dead_code)]

use muse_run::collaborators::{
    Collaborators, Commentator, MediaPlayer, TrackSequencer, TransientCleanup, UiCallbacks, Voice,
};
use muse_run::playback::SpotProfile;
use muse_run::{Error, Result, Run, RunConfig, RunOutcome, Track, TrackTransition};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ============================================================================
// Configuration and run plumbing
// ============================================================================

/// Config with short waits: 10ms polls, no jitter, no short-track halving
pub fn fast_config() -> RunConfig {
    RunConfig {
        delay_seconds: 0.05,
        delay_jitter_seconds: 0.0,
        short_track_seconds: 0.0,
        poll_interval_ms: 10,
        start_grace_ms: 200,
        ..RunConfig::default()
    }
}

/// Execute `run` on its own thread
pub fn spawn_run(run: &Arc<Run>) -> JoinHandle<Result<RunOutcome>> {
    let run = Arc::clone(run);
    thread::spawn(move || run.execute())
}

/// Poll `condition` every 5ms until it holds or `timeout` elapses
pub fn wait_for<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ============================================================================
// Event log
// ============================================================================

/// Ordered record of collaborator calls ("load:a1", "say:hello"...)
#[derive(Default)]
pub struct EventLog {
    entries: Mutex<Vec<(Instant, String)>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap()
            .push((Instant::now(), entry.into()));
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// When `entry` was first logged
    pub fn time_of(&self, entry: &str) -> Option<Instant> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(_, e)| e == entry)
            .map(|(at, _)| *at)
    }

    /// Time between the first `from` and the first `to`
    pub fn gap(&self, from: &str, to: &str) -> Option<Duration> {
        Some(self.time_of(to)?.saturating_duration_since(self.time_of(from)?))
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

// ============================================================================
// Track files
// ============================================================================

/// Temp directory of empty track files
pub struct TrackLibrary {
    dir: TempDir,
}

impl TrackLibrary {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create `<group>/<name>.mp3` lasting `duration_ms`
    pub fn track(&self, group: &str, name: &str, duration_ms: u64) -> Track {
        let dir = self.dir.path().join(group);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.mp3", name));
        std::fs::write(&path, b"fake audio").unwrap();
        Track::new(path).with_title(name).with_duration_ms(duration_ms)
    }

    /// Transitions for `groups` (name, track count), track names `<group><n>`
    /// in lower case starting at 1
    pub fn transitions(&self, groups: &[(&str, usize)], duration_ms: u64) -> Vec<TrackTransition> {
        let mut out = Vec::new();
        let mut previous: Option<String> = None;
        for (group, count) in groups {
            for n in 1..=*count {
                let name = format!("{}{}", group.to_lowercase(), n);
                let track = self.track(group, &name, duration_ms);
                out.push(
                    TrackTransition::new(track)
                        .with_groupings(previous.clone(), Some(group.to_string())),
                );
                previous = Some(group.to_string());
            }
        }
        out
    }
}

// ============================================================================
// Sequencer
// ============================================================================

/// Sequencer over a fixed list of transitions
pub struct ScriptedSequencer {
    queue: Mutex<VecDeque<TrackTransition>>,
    total: i64,
    fetch_flags: Mutex<Vec<bool>>,
    last_grouping: Mutex<Option<String>>,
    played: Mutex<Vec<PathBuf>>,
}

impl ScriptedSequencer {
    pub fn new(transitions: Vec<TrackTransition>, total: i64) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(transitions.into()),
            total,
            fetch_flags: Mutex::new(Vec::new()),
            last_grouping: Mutex::new(None),
            played: Mutex::new(Vec::new()),
        })
    }

    /// Number of `next_track` calls
    pub fn fetch_count(&self) -> usize {
        self.fetch_flags.lock().unwrap().len()
    }

    /// `skip_grouping` argument of every `next_track` call
    pub fn fetch_flags(&self) -> Vec<bool> {
        self.fetch_flags.lock().unwrap().clone()
    }

    pub fn played(&self) -> Vec<PathBuf> {
        self.played.lock().unwrap().clone()
    }
}

impl TrackSequencer for ScriptedSequencer {
    fn next_track(&self, skip_grouping: bool) -> Result<Option<TrackTransition>> {
        self.fetch_flags.lock().unwrap().push(skip_grouping);

        let mut queue = self.queue.lock().unwrap();
        let mut last = self.last_grouping.lock().unwrap();
        if skip_grouping {
            while queue
                .front()
                .map(|t| t.new_grouping == *last)
                .unwrap_or(false)
            {
                queue.pop_front();
            }
        }

        let next = queue.pop_front();
        if let Some(t) = &next {
            *last = t.new_grouping.clone();
        }
        Ok(next)
    }

    fn upcoming_track(&self) -> Option<TrackTransition> {
        self.queue.lock().unwrap().front().cloned()
    }

    fn total(&self) -> i64 {
        self.total
    }

    fn sort_type(&self) -> Option<String> {
        Some("folder".to_string())
    }

    fn mark_played(&self, track: &Track) {
        self.played.lock().unwrap().push(track.path().to_path_buf());
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Default)]
struct FakeState {
    loaded: Option<Track>,
    started: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl FakeState {
    fn elapsed(&self) -> Option<Duration> {
        let started = self.started?;
        let current = self.paused_at.map(|p| p.elapsed()).unwrap_or_default();
        Some(
            started
                .elapsed()
                .saturating_sub(self.paused_total)
                .saturating_sub(current),
        )
    }

    fn length_ms(&self) -> Option<u64> {
        self.loaded.as_ref().and_then(|t| t.duration_ms())
    }
}

/// Backend that "plays" a track for its duration on the wall clock
pub struct FakePlayer {
    log: Arc<EventLog>,
    state: Mutex<FakeState>,
    never_start: Mutex<HashSet<PathBuf>>,
    pauses: AtomicUsize,
    unpauses: AtomicUsize,
    volume: AtomicUsize,
}

impl FakePlayer {
    pub fn new(log: Arc<EventLog>) -> Arc<Self> {
        Arc::new(Self {
            log,
            state: Mutex::new(FakeState::default()),
            never_start: Mutex::new(HashSet::new()),
            pauses: AtomicUsize::new(0),
            unpauses: AtomicUsize::new(0),
            volume: AtomicUsize::new(0),
        })
    }

    /// `play()` succeeds for `track` but it never reports playing
    pub fn never_start(&self, track: &Track) {
        self.never_start
            .lock()
            .unwrap()
            .insert(track.path().to_path_buf());
    }

    pub fn load_count(&self) -> usize {
        self.log.count_prefix("load:")
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn unpauses(&self) -> usize {
        self.unpauses.load(Ordering::SeqCst)
    }

    pub fn volume(&self) -> usize {
        self.volume.load(Ordering::SeqCst)
    }
}

impl MediaPlayer for FakePlayer {
    fn load(&self, track: &Track) -> Result<()> {
        self.log.push(format!("load:{}", track.title()));
        let mut state = self.state.lock().unwrap();
        *state = FakeState {
            loaded: Some(track.clone()),
            ..FakeState::default()
        };
        Ok(())
    }

    fn play(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let track = state
            .loaded
            .clone()
            .ok_or_else(|| Error::Backend("nothing loaded".to_string()))?;
        if !self.never_start.lock().unwrap().contains(track.path()) {
            state.started = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.started = None;
        state.paused_at = None;
        state.paused_total = Duration::ZERO;
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if state.started.is_some() && state.paused_at.is_none() {
            state.paused_at = Some(Instant::now());
        }
    }

    fn unpause(&self) {
        self.unpauses.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(paused_at) = state.paused_at.take() {
            state.paused_total += paused_at.elapsed();
        }
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock().unwrap();
        if state.paused_at.is_some() {
            return false;
        }
        match (state.elapsed(), state.length_ms()) {
            (Some(elapsed), Some(length)) => elapsed < Duration::from_millis(length),
            _ => false,
        }
    }

    fn get_time(&self) -> i64 {
        let state = self.state.lock().unwrap();
        state.elapsed().map(|d| d.as_millis() as i64).unwrap_or(-1)
    }

    fn get_length(&self) -> i64 {
        let state = self.state.lock().unwrap();
        state.length_ms().map(|ms| ms as i64).unwrap_or(-1)
    }

    fn audio_set_volume(&self, volume: u8) {
        self.volume.store(volume as usize, Ordering::SeqCst);
    }
}

// ============================================================================
// Commentary
// ============================================================================

/// One `prepare` call
#[derive(Debug, Clone)]
pub struct PrepareCall {
    pub track: PathBuf,
    pub had_previous: bool,
}

/// Commentator producing fixed lines for every spot
pub struct ScriptedCommentator {
    lines: Vec<String>,
    prepare_delay: Duration,
    fail: bool,
    ready: bool,
    /// `check_for_shutdowns` fails on this call (1-based)
    shutdown_on_check: Option<usize>,
    checks: AtomicUsize,
    prepared: Mutex<Vec<PrepareCall>>,
}

impl ScriptedCommentator {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            prepare_delay: Duration::ZERO,
            fail: false,
            ready: true,
            shutdown_on_check: None,
            checks: AtomicUsize::new(0),
            prepared: Mutex::new(Vec::new()),
        }
    }

    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = delay;
        self
    }

    /// Never asks for look-ahead preparation, so every spot is prepared at fetch
    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn shutdown_on_check(mut self, n: usize) -> Self {
        self.shutdown_on_check = Some(n);
        self
    }

    pub fn prepared(&self) -> Vec<PrepareCall> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl Commentator for ScriptedCommentator {
    fn check_for_shutdowns(&self) -> Result<()> {
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        match self.shutdown_on_check {
            Some(at) if n >= at => Err(Error::ScheduledShutdown),
            _ => Ok(()),
        }
    }

    fn prepare(&self, profile: &SpotProfile, _ui: &dyn UiCallbacks) -> Result<()> {
        thread::sleep(self.prepare_delay);
        self.prepared.lock().unwrap().push(PrepareCall {
            track: profile.track().path().to_path_buf(),
            had_previous: profile.previous_track().is_some(),
        });
        if self.fail {
            return Err(Error::Commentary("generator offline".to_string()));
        }
        for line in &self.lines {
            profile.add_utterance(line.clone());
        }
        profile.set_topics("testing");
        Ok(())
    }

    fn ready_to_prepare(&self, _elapsed_seconds: f64, _remaining_seconds: f64) -> bool {
        self.ready
    }
}

/// Voice logging every utterance to the event log
pub struct RecordingVoice {
    log: Arc<EventLog>,
    pause: Duration,
}

impl RecordingVoice {
    pub fn new(log: Arc<EventLog>) -> Arc<Self> {
        Self::slow(log, Duration::ZERO)
    }

    /// Each utterance takes `pause` to say
    pub fn slow(log: Arc<EventLog>, pause: Duration) -> Arc<Self> {
        Arc::new(Self { log, pause })
    }
}

impl Voice for RecordingVoice {
    fn say(&self, text: &str) -> Result<()> {
        thread::sleep(self.pause);
        self.log.push(format!("say:{}", text));
        Ok(())
    }
}

// ============================================================================
// UI and cleanup
// ============================================================================

#[derive(Default)]
pub struct RecordingUi {
    pub details: Mutex<Vec<String>>,
    pub next_up: Mutex<Vec<(String, bool)>>,
    pub topics: Mutex<Vec<String>>,
    pub progress_updates: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl RecordingUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl UiCallbacks for RecordingUi {
    fn update_progress(&self, _percent: f64, _elapsed_ms: i64, _total_ms: i64) {
        self.progress_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn track_details(&self, track: &Track) {
        self.details.lock().unwrap().push(track.title());
    }

    fn update_next_up(&self, text: &str, no_title: bool) {
        self.next_up.lock().unwrap().push((text.to_string(), no_title));
    }

    fn update_spot_profile_topics(&self, text: &str) {
        self.topics.lock().unwrap().push(text.to_string());
    }

    fn shutdown_application(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct CountingCleanup {
    count: AtomicUsize,
}

impl CountingCleanup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl TransientCleanup for CountingCleanup {
    fn clean(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// Everything a run test needs, with handles kept for assertions
pub struct Fixture {
    pub log: Arc<EventLog>,
    pub sequencer: Arc<ScriptedSequencer>,
    pub player: Arc<FakePlayer>,
    pub ui: Arc<RecordingUi>,
    pub cleanup: Arc<CountingCleanup>,
    pub commentator: Option<Arc<ScriptedCommentator>>,
}

impl Fixture {
    pub fn new(transitions: Vec<TrackTransition>, total: i64) -> Self {
        let log = EventLog::new();
        Self {
            sequencer: ScriptedSequencer::new(transitions, total),
            player: FakePlayer::new(Arc::clone(&log)),
            ui: RecordingUi::new(),
            cleanup: CountingCleanup::new(),
            commentator: None,
            log,
        }
    }

    pub fn with_commentator(mut self, commentator: ScriptedCommentator) -> Self {
        self.commentator = Some(Arc::new(commentator));
        self
    }

    pub fn collaborators(&self, voice: Option<Arc<dyn Voice>>) -> Collaborators {
        let mut collaborators = Collaborators::new(self.sequencer.clone(), self.player.clone())
            .with_ui(self.ui.clone())
            .with_cleanup(self.cleanup.clone());
        if let Some(commentator) = &self.commentator {
            collaborators = collaborators.with_commentator(commentator.clone());
        }
        if let Some(voice) = voice {
            collaborators = collaborators.with_voice(voice);
        }
        collaborators
    }

    /// Run with a recording voice writing to the shared event log
    pub fn run(&self, config: RunConfig) -> Arc<Run> {
        let voice: Arc<dyn Voice> = RecordingVoice::new(Arc::clone(&self.log));
        Arc::new(Run::new(config, self.collaborators(Some(voice))).unwrap())
    }

    pub fn said(&self) -> Vec<String> {
        self.log
            .entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("say:").map(str::to_string))
            .collect()
    }
}
