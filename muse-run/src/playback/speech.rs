//! Serialized speech output
//!
//! Utterances of a spot are chained through a [`JobQueue`] drained by one
//! [`JobWorker`], so a spot is spoken in order and never overlaps another.

use crate::collaborators::Voice;
use crate::context::RunContext;
use crate::error::Result;
use crate::job_queue::{JobQueue, JobWorker};
use crate::playback::spots::SpotProfile;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a call to [`Speaker::speak`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// The profile had nothing to say
    Silent,
    /// Every utterance was spoken
    Finished,
    /// A skip cut the spot short
    Interrupted,
}

/// Speech queue plus its worker thread
pub struct Speaker {
    queue: JobQueue<String>,
    _worker: JobWorker<String>,
}

impl Speaker {
    pub fn new(voice: Arc<dyn Voice>, capacity: usize) -> Result<Self> {
        let queue = JobQueue::new(capacity);
        let worker = JobWorker::spawn("muse-speech", queue.clone(), move |text: String| {
            debug!("Speaking: {}", text);
            if let Err(e) = voice.say(&text) {
                warn!("Speech failed: {}", e);
            }
        })?;

        Ok(Self {
            queue,
            _worker: worker,
        })
    }

    pub fn queue(&self) -> &JobQueue<String> {
        &self.queue
    }

    /// Speak the utterances of `profile`, waiting until they are done or
    /// `skip_delay` is raised
    ///
    /// A skip drops the utterances not yet started.
    pub fn speak(
        &self,
        profile: &SpotProfile,
        ctx: &RunContext,
        poll_interval: Duration,
    ) -> SpeechOutcome {
        if !profile.has_something_to_say() {
            return SpeechOutcome::Silent;
        }

        let utterances = profile.utterances();
        info!("Speaking spot for {} ({} utterances)", profile.track().title(), utterances.len());

        for text in utterances {
            if let Err(e) = self.queue.add(text) {
                warn!("Dropping rest of spot: {}", e);
                break;
            }
        }

        loop {
            if ctx.skip_delay() {
                let dropped = self.queue.clear();
                debug!("Speech interrupted, dropped {} utterances", dropped);
                return SpeechOutcome::Interrupted;
            }
            if self.queue.wait_idle(poll_interval) {
                return SpeechOutcome::Finished;
            }
        }
    }

    /// Drop everything not yet spoken
    pub fn cancel(&self) {
        self.queue.clear();
    }
}
