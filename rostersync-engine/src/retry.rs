//! Bounded retry with exponential backoff for single remote calls.
//!
//! Retry is scoped to ONE remote call: an exhausted budget abandons that
//! call (and therefore that one action), never the surrounding group.

use std::time::Duration;

use crate::remote::RemoteError;

/// Backoff schedule for transient remote failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    /// No retries at all; useful in tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

/// Run `op`, retrying transient failures per `policy`.
///
/// Only errors classified transient are retried; everything else returns
/// immediately. `what` names the call in retry logs.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    what: &str,
    mut op: impl FnMut() -> Result<T, RemoteError>,
) -> Result<T, RemoteError> {
    let mut delay = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(
                    "{what}: transient failure (attempt {attempt}/{}), retrying in {delay:?}: {err}",
                    policy.max_attempts
                );
                std::thread::sleep(delay);
                delay *= policy.multiplier;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
