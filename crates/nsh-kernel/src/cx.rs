//! Cancellation context threaded through every namespace operation.
//!
//! The core never preempts a backend; it only propagates the signal and
//! refuses to start new work once the context is done.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::vfs::{VfsError, VfsResult};

/// Cancellation token plus an optional deadline.
#[derive(Debug, Clone)]
pub struct Cx {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Cx {
    fn default() -> Self {
        Self::new()
    }
}

impl Cx {
    /// A context that is never cancelled unless asked to be.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A context that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// A child context: cancelled when the parent is, but cancelling it
    /// leaves the parent alone. The deadline is inherited.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `Err(Cancelled)` once the context is done.
    pub fn check(&self) -> VfsResult<()> {
        if self.is_cancelled() {
            Err(VfsError::Cancelled)
        } else {
            Ok(())
        }
    }
}
