//! Single-flight gate around the token refresh call.
//!
//! The first caller to observe an expired token becomes the leader and runs
//! the refresh; every caller arriving while the leader is in flight waits in
//! FIFO order for the leader's outcome.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::ApiError;

/// Result delivered to waiters: the new access token, or the refresh error.
pub type RefreshOutcome = Result<String, ApiError>;

#[derive(Debug, Default)]
struct GateState {
    refreshing: bool,
    /// Bumped on every acquire and every forced reset, so a stale lease
    /// cannot settle a newer refresh.
    epoch: u64,
    waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh state owned by one client instance.
#[derive(Debug, Default)]
pub struct RefreshGate {
    state: Mutex<GateState>,
}

/// What a caller gets from [`RefreshGate::acquire_or_enqueue`].
#[derive(Debug)]
pub enum Ticket {
    /// The caller must perform the refresh and release the lease.
    Leader(RefreshLease),
    /// A refresh is already running; wait for its outcome.
    Waiter(Waiter),
}

impl RefreshGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // The critical sections never panic mid-update, so a poisoned lock
        // still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter the refresh critical section or join the wait queue.
    ///
    /// The state flips to refreshing before this returns, so any caller
    /// that runs after it (even before the leader's first `.await`) is
    /// queued rather than promoted.
    pub fn acquire_or_enqueue(self: &Arc<Self>) -> Ticket {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!(queued = state.waiters.len(), "refresh in flight, queued request");
            Ticket::Waiter(Waiter { rx })
        } else {
            state.refreshing = true;
            state.epoch += 1;
            Ticket::Leader(RefreshLease {
                gate: Arc::clone(self),
                epoch: state.epoch,
                released: false,
            })
        }
    }

    /// Reject every waiter and return to idle.
    pub fn fail_all(&self, error: ApiError) {
        self.settle(None, Err(error));
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Number of requests waiting on the current refresh.
    pub fn pending(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Drain the queue and go idle. With `Some(epoch)` this only applies if
    /// that lease still owns the gate.
    fn settle(&self, epoch: Option<u64>, outcome: RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            match epoch {
                Some(epoch) if epoch != state.epoch => return,
                Some(_) => {}
                None => state.epoch += 1,
            }
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            tracing::debug!(
                drained = waiters.len(),
                success = outcome.is_ok(),
                "draining refresh queue"
            );
        }
        for waiter in waiters {
            // A dropped receiver means that caller was cancelled.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Proof of leadership over one refresh. Must be released exactly once.
#[derive(Debug)]
pub struct RefreshLease {
    gate: Arc<RefreshGate>,
    epoch: u64,
    released: bool,
}

impl RefreshLease {
    /// Publish the refresh outcome to all waiters, in arrival order.
    pub fn release(mut self, outcome: RefreshOutcome) {
        self.released = true;
        self.gate.settle(Some(self.epoch), outcome);
    }
}

impl Drop for RefreshLease {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("refresh abandoned before completion");
            self.gate.settle(Some(self.epoch), Err(abandoned()));
        }
    }
}

/// A queued request waiting on someone else's refresh.
#[derive(Debug)]
pub struct Waiter {
    rx: oneshot::Receiver<RefreshOutcome>,
}

impl Waiter {
    pub async fn wait(self) -> RefreshOutcome {
        self.rx.await.unwrap_or_else(|_| Err(abandoned()))
    }
}

fn abandoned() -> ApiError {
    ApiError::new("Token refresh did not complete", 401)
}
