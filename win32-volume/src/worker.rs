//! Fixed-size worker pool.
//!
//! Jobs are pulled from a shared queue by a set of named threads. Each job
//! runs to completion on one thread. Dropping the pool closes the queue and
//! joins every worker after the queued jobs have run.

use crate::audio::AudioError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(id: usize, queue: Arc<Mutex<mpsc::Receiver<Job>>>) -> Result<Self, AudioError> {
        let thread = thread::Builder::new()
            .name(format!("win32-volume-worker-{id}"))
            .spawn(move || {
                tracing::debug!(worker = id, "Volume worker started");
                loop {
                    // The lock is held only while waiting for the next job
                    let job = match queue.lock() {
                        Ok(rx) => rx.recv(),
                        Err(_) => {
                            tracing::warn!(worker = id, "Job queue lock poisoned");
                            break;
                        }
                    };

                    match job {
                        Ok(job) => {
                            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                                tracing::warn!(worker = id, "Job panicked");
                            }
                        }
                        Err(_) => break,
                    }
                }
                tracing::debug!(worker = id, "Volume worker stopped");
            })
            .map_err(|e| AudioError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            id,
            thread: Some(thread),
        })
    }
}

/// A pool of background threads that run submitted jobs.
pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job>>,
}

impl WorkerPool {
    /// Start a pool with `size` threads (at least one).
    pub fn new(size: usize) -> Result<Self, AudioError> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let queue = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| Worker::spawn(id, Arc::clone(&queue)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            workers,
            sender: Some(sender),
        })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job. Returns immediately.
    pub fn execute<F>(&self, job: F) -> Result<(), AudioError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(AudioError::WorkerUnavailable)?;
        sender
            .send(Box::new(job))
            .map_err(|_| AudioError::WorkerUnavailable)
    }

    /// Stop accepting jobs and wait for the queued ones to finish.
    pub fn shutdown(&mut self) {
        drop(self.sender.take());

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::warn!(worker = worker.id, "Worker thread panicked");
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
