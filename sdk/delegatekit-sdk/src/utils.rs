use crate::error::{DelegateKitError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

//=============================================================================
// Retry policy
//=============================================================================

/// Bounded exponential backoff: `max_attempts` tries, delay doubling from
/// `base_delay` between them.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given 1-based attempt: base, 2*base, 4*base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16))
    }
}

//=============================================================================
// Cancellation
//=============================================================================

/// Cooperative cancellation handle. The retry loop checks it between
/// attempts and during backoff sleeps, never mid-flight-request.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // wait_for only errs when the sender is dropped, which cannot happen
        // while `self` holds it.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

//=============================================================================
// Retry combinator
//=============================================================================

/// Run `op` under the retry policy. Only errors for which
/// [`DelegateKitError::is_retryable`] holds are re-attempted; semantic and
/// security failures surface immediately. Orthogonal to business logic so it
/// can wrap any network call uniformly.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: Option<&CancelToken>,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(DelegateKitError::Cancelled);
            }
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, %err, "transient failure, backing off");
                match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = token.cancelled() => return Err(DelegateKitError::Cancelled),
                        }
                    }
                    None => tokio::time::sleep(delay).await,
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
