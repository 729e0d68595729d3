//! # Request Coordinator
//!
//! Enforces at most one active resolution per resolver. Starting a new request
//! cancels the previous one, and an outcome is only published while its
//! request is still the current one. Both happen under the same lock, so a
//! superseded request can never publish after its successor started.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Handle for one resolution request.
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: u64,
    cancellation: CancellationToken,
}

impl RequestToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Child token handed to providers; cancelling the request cancels it.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.child_token()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

#[derive(Debug, Default)]
pub struct RequestCoordinator {
    current: Mutex<Option<RequestToken>>,
    next_id: AtomicU64,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the active request, if any, and starts a fresh one.
    pub fn start_new(&self) -> RequestToken {
        let token = RequestToken {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            cancellation: CancellationToken::new(),
        };

        let mut current = self.lock();
        if let Some(previous) = current.replace(token.clone()) {
            trace!(request = previous.id, superseded_by = token.id, "Request superseded");
            previous.cancellation.cancel();
        }
        token
    }

    /// Cancels the active request. No-op when idle.
    pub fn cancel(&self) {
        if let Some(previous) = self.lock().take() {
            trace!(request = previous.id, "Request cancelled");
            previous.cancellation.cancel();
        }
    }

    pub fn is_current(&self, token: &RequestToken) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|current| current.id == token.id)
    }

    /// Whether a request is in flight.
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Runs `publish` if `token` is still the active, uncancelled request and
    /// retires it. Returns whether `publish` ran.
    pub fn complete_if_current<F: FnOnce()>(&self, token: &RequestToken, publish: F) -> bool {
        let mut current = self.lock();
        let is_current = current
            .as_ref()
            .is_some_and(|active| active.id == token.id && !active.is_cancelled());
        if !is_current {
            return false;
        }

        publish();
        *current = None;
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<RequestToken>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
