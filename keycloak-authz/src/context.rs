//! Per-call cancellation and deadlines

use crate::error::AuthzError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation scope passed into every operation
///
/// Canceling the token or reaching the deadline aborts the in-flight HTTP
/// request and the operation returns [`AuthzError::Canceled`] or
/// [`AuthzError::DeadlineExceeded`].
///
/// # Example
///
/// ```
/// use keycloak_authz::RequestContext;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
/// let token = ctx.cancellation_token().clone();
///
/// // Another task may call `token.cancel()` to abandon the request.
/// assert!(!token.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never canceled and has no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// A context driven by an existing cancellation token
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    /// Set an absolute deadline
    ///
    /// An earlier deadline already on the context wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Set a deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context canceled together with this one, with its own deadline
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    /// The token that cancels this context
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every child
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the context is canceled or past its deadline
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `fut` to completion unless the context ends first
    ///
    /// The future is dropped when the context ends, which aborts whatever
    /// network I/O it was doing.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T, AuthzError>
    where
        F: Future<Output = Result<T, AuthzError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AuthzError::Canceled);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AuthzError::Canceled),
            _ = deadline => Err(AuthzError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
