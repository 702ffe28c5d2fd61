//! Asynchronous volume requests.
//!
//! A [`VolumeDispatcher`] runs requests on a [`WorkerPool`] and hands the
//! results back to the thread that owns the dispatcher. Continuations are
//! kept on that thread and run from [`VolumeDispatcher::dispatch_completions`]
//! or [`VolumeDispatcher::run_until_idle`], so they may capture state that is
//! neither `Send` nor `Sync`. Dropping the dispatcher waits for running
//! requests and delivers their continuations before it returns.

use crate::audio::{
    completion_flag, AudioError, EndpointProvider, VolumeController, VolumeRequest, VolumeResult,
};
use crate::worker::WorkerPool;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// Called once with the boolean outcome of an asynchronous request.
pub type Continuation = Box<dyn FnOnce(bool)>;

/// Identifies a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Dispatcher options.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherOptions {
    pub worker_threads: usize,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self { worker_threads: 2 }
    }
}

struct Completion {
    ticket: Ticket,
    request: VolumeRequest,
    outcome: VolumeResult,
}

fn run_request<P: EndpointProvider>(
    controller: &VolumeController<P>,
    request: VolumeRequest,
) -> VolumeResult {
    panic::catch_unwind(AssertUnwindSafe(|| controller.execute(request)))
        .unwrap_or(Err(AudioError::OperationPanicked))
}

/// Runs volume requests off the calling thread.
pub struct VolumeDispatcher<P: EndpointProvider + 'static> {
    controller: Arc<VolumeController<P>>,
    pool: WorkerPool,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    pending: RefCell<HashMap<Ticket, Option<Continuation>>>,
    next_ticket: Cell<u64>,
}

impl<P: EndpointProvider + 'static> VolumeDispatcher<P> {
    pub fn new(controller: VolumeController<P>, options: DispatcherOptions) -> Result<Self, AudioError> {
        let pool = WorkerPool::new(options.worker_threads)?;
        let (completion_tx, completion_rx) = mpsc::channel();
        tracing::debug!(workers = pool.size(), "Volume dispatcher started");

        Ok(Self {
            controller: Arc::new(controller),
            pool,
            completion_tx,
            completion_rx,
            pending: RefCell::new(HashMap::new()),
            next_ticket: Cell::new(1),
        })
    }

    /// The controller used for synchronous calls.
    pub fn controller(&self) -> &VolumeController<P> {
        &self.controller
    }

    /// Set the volume level in the background.
    pub fn set_volume(
        &self,
        level: f32,
        continuation: Option<Continuation>,
    ) -> Result<Ticket, AudioError> {
        self.submit(VolumeRequest::SetLevel(level), continuation)
    }

    /// Set the mute state in the background.
    pub fn set_mute(
        &self,
        muted: bool,
        continuation: Option<Continuation>,
    ) -> Result<Ticket, AudioError> {
        self.submit(VolumeRequest::SetMute(muted), continuation)
    }

    /// Queue a request. The continuation, if any, runs on this thread once the
    /// completion is dispatched.
    pub fn submit(
        &self,
        request: VolumeRequest,
        continuation: Option<Continuation>,
    ) -> Result<Ticket, AudioError> {
        let ticket = self.allocate_ticket();
        self.pending.borrow_mut().insert(ticket, continuation);

        let controller = Arc::clone(&self.controller);
        let tx = self.completion_tx.clone();
        let queued = self.pool.execute(move || {
            let outcome = run_request(&controller, request);
            let _ = tx.send(Completion {
                ticket,
                request,
                outcome,
            });
        });

        if let Err(e) = queued {
            self.pending.borrow_mut().remove(&ticket);
            return Err(e);
        }

        tracing::debug!(ticket = ticket.0, ?request, "Volume request queued");
        Ok(ticket)
    }

    /// Queue a request and get a handle that resolves once with its result.
    pub fn spawn(&self, request: VolumeRequest) -> Result<PendingOperation, AudioError> {
        let ticket = self.allocate_ticket();
        let (tx, rx) = mpsc::sync_channel(1);

        let controller = Arc::clone(&self.controller);
        self.pool.execute(move || {
            let _ = tx.send(run_request(&controller, request));
        })?;

        Ok(PendingOperation {
            ticket,
            receiver: rx,
        })
    }

    /// Run the continuations of every finished request without blocking.
    /// Returns how many completions were delivered.
    pub fn dispatch_completions(&self) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.complete(completion);
            delivered += 1;
        }
        delivered
    }

    /// Block until every submitted request has completed and its continuation
    /// has run, or until `timeout` elapses. Returns true when idle.
    ///
    /// A timeout too large to express as a deadline waits without limit.
    pub fn run_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        self.dispatch_completions();

        while self.pending_count() > 0 {
            let next = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.completion_rx.recv_timeout(remaining).ok()
                }
                None => self.completion_rx.recv().ok(),
            };

            match next {
                Some(completion) => self.complete(completion),
                None => return false,
            }
        }
        true
    }

    /// Stop accepting requests, wait for the running ones, and deliver every
    /// outstanding continuation on this thread. Continuations whose request
    /// never reported back run with `false`.
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
        self.dispatch_completions();

        let orphaned: Vec<_> = self.pending.borrow_mut().drain().collect();
        for (ticket, continuation) in orphaned {
            tracing::debug!(ticket = ticket.0, "Volume request abandoned at shutdown");
            if let Some(continuation) = continuation {
                continuation(false);
            }
        }
    }

    /// Requests submitted whose completion has not been dispatched yet.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    fn allocate_ticket(&self) -> Ticket {
        let id = self.next_ticket.get();
        self.next_ticket.set(id.wrapping_add(1));
        Ticket(id)
    }

    fn complete(&self, completion: Completion) {
        let Completion {
            ticket,
            request,
            outcome,
        } = completion;

        // Release the borrow before running the continuation; it may submit again
        let continuation = self.pending.borrow_mut().remove(&ticket).flatten();
        let flag = completion_flag(&outcome);

        match &outcome {
            Ok(reading) => {
                tracing::debug!(ticket = ticket.0, ?request, ?reading, "Volume request completed")
            }
            Err(e) => tracing::warn!(ticket = ticket.0, ?request, "Volume request failed: {}", e),
        }

        if let Some(continuation) = continuation {
            continuation(flag);
        }
    }
}

impl<P: EndpointProvider + 'static> Drop for VolumeDispatcher<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A request running in the background. Resolves once.
pub struct PendingOperation {
    ticket: Ticket,
    receiver: mpsc::Receiver<VolumeResult>,
}

impl PendingOperation {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Block until the result is available.
    pub fn wait(self) -> VolumeResult {
        self.receiver
            .recv()
            .unwrap_or(Err(AudioError::WorkerUnavailable))
    }

    /// Block for at most `timeout`. Gives the operation back if it is still running.
    pub fn wait_timeout(self, timeout: Duration) -> Result<VolumeResult, Self> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(self),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(Err(AudioError::WorkerUnavailable)),
        }
    }

    /// Take the result if it is ready. Gives the operation back otherwise.
    pub fn try_result(self) -> Result<VolumeResult, Self> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(result),
            Err(mpsc::TryRecvError::Empty) => Err(self),
            Err(mpsc::TryRecvError::Disconnected) => Ok(Err(AudioError::WorkerUnavailable)),
        }
    }
}
