//! Bounded background worker pool.
//!
//! Threaded completers, validators, auto-suggesters and history loaders run
//! their work here. Jobs never touch UI state directly: they hand their
//! result to a callback that posts it back to the event loop.

use flume::{Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 2;

/// Default number of queued jobs before submissions are rejected.
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// Jobs queued or running, with a condition signalled when it drops.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn start(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// A fixed set of threads consuming a bounded job queue.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
    in_flight: Arc<InFlight>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_QUEUE_SIZE)
    }
}

impl WorkerPool {
    /// Starts `workers` threads sharing a queue of `queue_size` jobs.
    pub fn new(workers: usize, queue_size: usize) -> Self {
        let (sender, receiver) = flume::bounded::<Job>(queue_size.max(1));
        let in_flight = Arc::new(InFlight::default());
        let threads = (0..workers.max(1))
            .filter_map(|i| {
                let receiver = receiver.clone();
                let in_flight = Arc::clone(&in_flight);
                std::thread::Builder::new()
                    .name(format!("quill-worker-{i}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                            in_flight.finish();
                        }
                    })
                    .map_err(|e| tracing::warn!("failed to spawn worker thread: {e}"))
                    .ok()
            })
            .collect();
        Self {
            sender: Some(sender),
            threads,
            in_flight,
        }
    }

    /// Queues a job. Returns false if the queue is full or the pool has no
    /// threads; the job is dropped in that case.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match self.try_submit(Box::new(job)) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("worker pool is saturated; dropping job");
                false
            }
        }
    }

    /// Queues a job, handing it back when it cannot be queued so the caller
    /// can run it elsewhere.
    pub fn try_submit(&self, job: Job) -> Result<(), Job> {
        let Some(sender) = &self.sender else {
            return Err(job);
        };
        if self.threads.is_empty() {
            return Err(job);
        }
        self.in_flight.start();
        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => {
                self.in_flight.finish();
                Err(job)
            }
        }
    }

    /// Queues a job, or runs it on a thread of its own when the queue is
    /// full. Returns false only if no thread could be started.
    pub fn submit_or_spawn(&self, job: Job) -> bool {
        let Err(job) = self.try_submit(job) else {
            return true;
        };
        tracing::debug!("worker pool busy; running job on its own thread");
        self.in_flight.start();
        let in_flight = Arc::clone(&self.in_flight);
        let spawned = std::thread::Builder::new()
            .name("quill-executor".into())
            .spawn(move || {
                job();
                in_flight.finish();
            });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("failed to spawn executor thread: {e}");
                self.in_flight.finish();
                false
            }
        }
    }

    /// Number of running threads.
    pub fn threads(&self) -> usize {
        self.threads.len()
    }

    /// Jobs queued or running, including overflow threads.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.count.lock()
    }

    /// Waits until no job is queued or running, for at most `timeout`.
    /// Returns false if jobs were still running when the time ran out.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            if self.in_flight.idle.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Stops accepting jobs and waits for queued jobs to finish.
    pub fn shutdown(&mut self) {
        self.sender = None;
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_jobs_run() {
        let mut pool = WorkerPool::new(2, 8);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let d = Arc::clone(&done);
            assert!(pool.submit(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.shutdown();
        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert!(!pool.submit(|| {}));
    }

    #[test]
    fn test_full_queue_rejects() {
        let pool = WorkerPool::new(1, 1);
        let (block_tx, block_rx) = flume::bounded::<()>(0);
        let (started_tx, started_rx) = flume::bounded::<()>(1);
        assert!(pool.submit(move || {
            let _ = started_tx.send(());
            let _ = block_rx.recv();
        }));
        started_rx.recv().unwrap();
        assert!(pool.submit(|| {}));
        assert!(!pool.submit(|| {}));
        drop(block_tx);
    }

    #[test]
    fn test_full_queue_spawns_overflow_thread() {
        let pool = WorkerPool::new(1, 1);
        let (block_tx, block_rx) = flume::bounded::<()>(0);
        let (started_tx, started_rx) = flume::bounded::<()>(1);
        assert!(pool.submit(move || {
            let _ = started_tx.send(());
            let _ = block_rx.recv();
        }));
        started_rx.recv().unwrap();
        assert!(pool.submit(|| {}));

        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        assert!(pool.submit_or_spawn(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        })));
        drop(block_tx);
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_wait_idle_gives_up_after_timeout() {
        let pool = WorkerPool::new(1, 4);
        let (block_tx, block_rx) = flume::bounded::<()>(0);
        assert!(pool.submit(move || {
            let _ = block_rx.recv();
        }));
        assert!(!pool.wait_idle(Duration::from_millis(30)));
        assert_eq!(pool.in_flight(), 1);
        drop(block_tx);
        assert!(pool.wait_idle(Duration::from_secs(5)));
    }
}
