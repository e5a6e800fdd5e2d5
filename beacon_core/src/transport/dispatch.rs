/**
 * Background execution of sends and delivery of their outcome.
 *
 * ```text
 *  ┌──────────────┐  spawn per send   ┌──────────────────┐
 *  │  Caller       │ ────────────────► │  beacon-send      │
 *  │  (any thread) │                   │  Transport::send  │
 *  └──────┬───────┘                   └────────┬─────────┘
 *         │ Delivery                           │ Completion::complete
 *         ◄──────────── outcome (bool) ────────┤
 *                                              └─► finished(bool)
 * ```
 *
 * Every send gets its own thread and its own `Completion`. The completion
 * fires exactly once: explicitly when the request resolves, or with `false`
 * from `Drop` if the task dies first (panic, failed spawn). `InFlight`
 * counts running sends so `flush` can wait for them.
 */
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use super::http::{OutboundRequest, Transport};
use crate::log::Log;

/// Completion callback, invoked once with the success flag.
pub type Finished = Box<dyn FnOnce(bool) + Send + 'static>;

// ---------------------------------------------------------------------------
// Delivery — the caller's handle on the outcome
// ---------------------------------------------------------------------------

/**
 * Receives the outcome of a single send.
 *
 * The outcome can be taken once; later calls see nothing. Dropping the
 * handle does not cancel the send.
 */
#[derive(Debug)]
pub struct Delivery {
    receiver: Receiver<bool>,
}

impl Delivery {
    /// Blocks until the send resolves.
    pub fn wait(self) -> bool {
        self.receiver.recv().unwrap_or(false)
    }

    /// Blocks for at most `timeout`; `None` if the send is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<bool> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Returns the outcome if it is already available.
    pub fn try_outcome(&self) -> Option<bool> {
        self.receiver.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------
// Completion — exactly-once fulfilment
// ---------------------------------------------------------------------------

/**
 * The sending side of a `Delivery` plus the optional callback.
 *
 * The callback runs before the outcome is posted, so a caller that has
 * seen the outcome on its `Delivery` has also seen the callback's effects.
 */
pub(crate) struct Completion {
    finished: Option<Finished>,
    sender: Option<Sender<bool>>,
    log: Arc<dyn Log>,
}

impl Completion {
    pub(crate) fn new(finished: Option<Finished>, log: Arc<dyn Log>) -> (Self, Delivery) {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let completion = Self {
            finished,
            sender: Some(sender),
            log,
        };
        (completion, Delivery { receiver })
    }

    pub(crate) fn complete(mut self, success: bool) {
        self.fire(success);
    }

    fn fire(&mut self, success: bool) {
        if let Some(finished) = self.finished.take() {
            if catch_unwind(AssertUnwindSafe(|| finished(success))).is_err() {
                self.log.error("error = completion callback panicked");
            }
        }
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(success);
        }
    }
}

impl Drop for Completion {
    /// No-op after `complete`; otherwise reports failure.
    fn drop(&mut self) {
        self.fire(false);
    }
}

// ---------------------------------------------------------------------------
// InFlight — condvar-based tracking for flush
// ---------------------------------------------------------------------------

/**
 * Number of sends that have not resolved yet.
 *
 * Uses a `Mutex<usize>` + `Condvar` pair: each send holds an
 * `InFlightGuard` that decrements the count and wakes waiters when dropped,
 * whichever way the send ends.
 */
pub(crate) struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            count: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard {
        if let Ok(mut count) = self.count.lock() {
            *count += 1;
        }
        InFlightGuard {
            in_flight: Arc::clone(self),
        }
    }

    /**
     * Blocks until no send is in flight, or until `timeout` elapses.
     *
     * # Returns
     * `true` if everything resolved in time.
     */
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let Ok(guard) = self.count.lock() else {
            return false;
        };

        match self.idle.wait_timeout_while(guard, timeout, |count| *count > 0) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }
}

pub(crate) struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut count) = self.in_flight.count.lock() {
            *count = count.saturating_sub(1);
            self.in_flight.idle.notify_all();
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Runs each request on its own background thread.
pub struct Dispatcher {
    transport: Arc<Transport>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport: Arc::new(transport),
            in_flight: Arc::new(InFlight::new()),
        }
    }

    pub fn log(&self) -> &Arc<dyn Log> {
        self.transport.log()
    }

    /**
     * Starts the request in the background and returns immediately.
     *
     * The callback, if any, runs on the background thread. If the thread
     * cannot be spawned the closure is dropped unrun, which completes the
     * send with `false`.
     */
    pub fn dispatch(&self, request: OutboundRequest, finished: Option<Finished>) -> Delivery {
        let (completion, delivery) = Completion::new(finished, Arc::clone(self.log()));
        let guard = self.in_flight.enter();
        let transport = Arc::clone(&self.transport);

        let spawned = thread::Builder::new()
            .name("beacon-send".into())
            .spawn(move || {
                let _guard = guard;

                /*
                 * A panic inside the HTTP stack must not take the outcome
                 * down with it: report `false` and carry on.
                 */
                match catch_unwind(AssertUnwindSafe(|| transport.send(request))) {
                    Ok(success) => completion.complete(success),
                    Err(_) => {
                        transport.log().error("error = send task panicked");
                        completion.complete(false);
                    }
                }
            });

        if let Err(err) = spawned {
            self.log()
                .error(&format!("error = failed to spawn send task: {err}"));
        }

        delivery
    }

    /// Waits for all in-flight sends; see `InFlight::wait_idle`.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.in_flight.wait_idle(timeout)
    }
}
