//! Caller-owned cancellation scope for requests.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::WocError;

/// Cancellation token plus optional deadline.
///
/// Every request made through a client observes the client's context: a
/// pending attempt or backoff wait is interrupted once the context is done,
/// and the call returns [`WocError::Canceled`] or
/// [`WocError::DeadlineExceeded`].
///
/// Derived contexts (`with_timeout`, `with_deadline`, `child`) are cancelled
/// together with their parent but never cancel it.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context cancelled through an existing token.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Child context that can be cancelled independently of `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child context that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context that expires at `deadline`, or earlier if the parent does.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The context error once the context is done, `None` while it is live.
    pub fn err(&self) -> Option<WocError> {
        if self.token.is_cancelled() {
            return Some(WocError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(WocError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves with the context error when the context is done.
    pub async fn done(&self) -> WocError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => WocError::Canceled,
                    _ = sleep_until(deadline) => WocError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                WocError::Canceled
            }
        }
    }
}
