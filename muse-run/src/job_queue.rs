//! Bounded FIFO job queue with a single persistent worker
//!
//! A [`JobQueue`] serializes dependent jobs (the utterances of one commentary
//! spot): at most one job runs at a time and jobs run in insertion order.
//! `job_running` stays true for the whole chain, from the first job taken until
//! `take()` finds the queue empty.
//!
//! A [`JobWorker`] owns one thread that sleeps on the queue's condition variable,
//! drains the queue through an executor closure and exits when dropped.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

struct QueueState<J> {
    jobs: VecDeque<J>,
    job_running: bool,
}

struct SharedQueue<J> {
    state: Mutex<QueueState<J>>,
    changed: Condvar,
    max_size: usize,
    stop_flag: AtomicBool,
}

/// Shared handle to a bounded job queue
pub struct JobQueue<J> {
    shared: Arc<SharedQueue<J>>,
}

impl<J> Clone for JobQueue<J> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<J> JobQueue<J> {
    /// Create an empty queue holding at most `max_size` pending jobs
    pub fn new(max_size: usize) -> Self {
        Self {
            shared: Arc::new(SharedQueue {
                state: Mutex::new(QueueState {
                    jobs: VecDeque::new(),
                    job_running: false,
                }),
                changed: Condvar::new(),
                max_size,
                stop_flag: AtomicBool::new(false),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.max_size
    }

    /// Append a job
    ///
    /// Fails with [`Error::QueueFull`] when `max_size` jobs are already pending.
    pub fn add(&self, job: J) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Internal("Job queue is shut down".to_string()));
        }
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.jobs.len() >= self.shared.max_size {
                return Err(Error::QueueFull {
                    capacity: self.shared.max_size,
                });
            }
            state.jobs.push_back(job);
        }
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Pop the oldest job; an empty queue ends the running chain
    pub fn take(&self) -> Option<J> {
        let job = {
            let mut state = self.shared.state.lock().unwrap();
            let job = state.jobs.pop_front();
            if job.is_none() {
                state.job_running = false;
            }
            job
        };
        if job.is_none() {
            self.shared.changed.notify_all();
        }
        job
    }

    /// Mark a chain as started; false if one is already running
    pub fn try_begin(&self) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        if state.job_running {
            false
        } else {
            state.job_running = true;
            true
        }
    }

    /// A job is executing or waiting
    pub fn has_pending(&self) -> bool {
        let state = self.shared.state.lock().unwrap();
        state.job_running || !state.jobs.is_empty()
    }

    /// Drop every waiting job; a job already executing runs to completion
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut state = self.shared.state.lock().unwrap();
            let dropped = state.jobs.len();
            state.jobs.clear();
            dropped
        };
        self.shared.changed.notify_all();
        dropped
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().unwrap().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().unwrap().job_running
    }

    /// Block until nothing is pending or `timeout` elapses; true when idle
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if !state.job_running && state.jobs.is_empty() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    fn is_closed(&self) -> bool {
        self.shared.stop_flag.load(Ordering::Relaxed)
    }

    /// Chain abandoned without draining the queue
    fn end_chain(&self) {
        self.shared.state.lock().unwrap().job_running = false;
        self.shared.changed.notify_all();
    }

    fn close(&self) {
        self.shared.stop_flag.store(true, Ordering::Relaxed);
        // Take the lock so a worker between its check and its wait sees the flag
        drop(self.shared.state.lock().unwrap());
        self.shared.changed.notify_all();
    }

    /// Block until a chain can start or the queue is closed; false on close
    fn wait_for_work(&self) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        loop {
            if self.is_closed() {
                return false;
            }
            if !state.jobs.is_empty() && !state.job_running {
                state.job_running = true;
                return true;
            }
            state = self.shared.changed.wait(state).unwrap();
        }
    }
}

/// Persistent thread draining one [`JobQueue`]
pub struct JobWorker<J> {
    queue: JobQueue<J>,
    thread: Option<JoinHandle<()>>,
}

impl<J: Send + 'static> JobWorker<J> {
    /// Spawn the worker; `executor` runs every job, one at a time
    pub fn spawn<F>(name: &str, queue: JobQueue<J>, executor: F) -> Result<Self>
    where
        F: FnMut(J) + Send + 'static,
    {
        let worker_queue = queue.clone();
        let label = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || Self::worker_loop(label, worker_queue, executor))?;

        info!("Job worker '{}' started", name);

        Ok(Self {
            queue,
            thread: Some(handle),
        })
    }

    pub fn queue(&self) -> &JobQueue<J> {
        &self.queue
    }

    fn worker_loop<F>(name: String, queue: JobQueue<J>, mut executor: F)
    where
        F: FnMut(J),
    {
        debug!("Job worker '{}' waiting for work", name);

        while queue.wait_for_work() {
            while let Some(job) = queue.take() {
                executor(job);
                if queue.is_closed() {
                    queue.end_chain();
                    break;
                }
            }
        }

        debug!("Job worker '{}' exiting", name);
    }
}

impl<J> JobWorker<J> {
    /// Stop the worker after its current job and join the thread
    pub fn shutdown(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };

        self.queue.close();
        self.queue.clear();

        if let Err(e) = handle.join() {
            error!("Job worker join failed: {:?}", e);
        }
    }
}

impl<J> Drop for JobWorker<J> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_add_take_is_fifo() {
        let queue = JobQueue::new(5);
        queue.add(1).unwrap();
        queue.add(2).unwrap();
        queue.add(3).unwrap();

        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        assert_eq!(queue.take(), Some(3));
        assert_eq!(queue.take(), None);
    }

    #[test]
    fn test_add_fails_past_capacity() {
        let queue = JobQueue::new(2);
        queue.add("a").unwrap();
        queue.add("b").unwrap();

        let err = queue.add("c").unwrap_err();
        assert!(matches!(err, Error::QueueFull { capacity: 2 }));
        assert_eq!(queue.len(), 2);

        // Room again after a take
        queue.take();
        assert!(queue.add("c").is_ok());
    }

    #[test]
    fn test_empty_take_ends_chain() {
        let queue = JobQueue::new(5);
        queue.add(7).unwrap();

        assert!(queue.try_begin());
        assert!(!queue.try_begin());
        assert!(queue.has_pending());

        assert_eq!(queue.take(), Some(7));
        assert!(queue.is_running());
        assert!(queue.has_pending());

        assert_eq!(queue.take(), None);
        assert!(!queue.is_running());
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_clear_drops_waiting_jobs() {
        let queue = JobQueue::new(5);
        queue.add(1).unwrap();
        queue.add(2).unwrap();

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(queue.wait_idle(Duration::from_millis(10)));
    }

    #[test]
    fn test_worker_runs_jobs_in_order_one_at_a_time() {
        let queue = JobQueue::new(50);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let worker = {
            let seen = Arc::clone(&seen);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            JobWorker::spawn("test-worker", queue.clone(), move |job: usize| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                seen.lock().unwrap().push(job);
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap()
        };

        for i in 0..10 {
            queue.add(i).unwrap();
        }

        assert!(queue.wait_idle(Duration::from_secs(5)));
        drop(worker);

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_mid_chain_leaves_queue_idle() {
        let queue: JobQueue<u32> = JobQueue::new(5);
        let started = Arc::new(AtomicUsize::new(0));
        let worker = {
            let started = Arc::clone(&started);
            JobWorker::spawn("mid-chain-worker", queue.clone(), move |_| {
                started.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(50));
            })
            .unwrap()
        };

        queue.add(1).unwrap();
        queue.add(2).unwrap();
        while started.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        drop(worker);

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(!queue.has_pending());
        assert!(!queue.is_running());
        assert!(queue.wait_idle(Duration::from_millis(10)));
    }

    #[test]
    fn test_worker_drop_closes_queue() {
        let queue: JobQueue<u32> = JobQueue::new(5);
        let worker = JobWorker::spawn("closing-worker", queue.clone(), |_| {}).unwrap();

        drop(worker);

        assert!(queue.add(1).is_err());
    }
}
