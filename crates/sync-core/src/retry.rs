//! Exponential-backoff retry for fallible async operations.
//!
//! Every external I/O call in the pipeline (connection establishment, query
//! execution, bulk writes, checkpoint reads/writes) is wrapped in [`retry`]
//! at the call site, so transient outages surface as logged retries instead
//! of crashing the daemon.

use std::future::Future;
use std::time::Duration;

/// Delays below this are clamped so a misconfigured policy cannot busy-loop.
const MIN_START_DELAY: Duration = Duration::from_millis(10);

/// Configuration for retrying a fallible operation with exponential delay.
///
/// The delay before attempt `n` (zero-based) is
/// `min(start_delay * factor^n, max_delay)`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub start_delay: Duration,

    /// Backoff multiplier (e.g., 2.0 = double delay each retry).
    pub factor: f64,

    /// Ceiling for the computed delay.
    pub max_delay: Duration,

    /// Maximum number of attempts. `None` retries forever, which is the
    /// right choice for connection establishment in a long-running daemon:
    /// the alternative is exiting on every extended outage.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: Some(10),
        }
    }
}

impl RetryPolicy {
    /// Retry forever with the delay capped at five minutes.
    pub fn unbounded() -> Self {
        Self {
            start_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(300),
            max_attempts: None,
        }
    }

    /// Delay before the given zero-based retry attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let start = self.start_delay.max(MIN_START_DELAY);
        let factor = if self.factor < 1.0 { 1.0 } else { self.factor };
        let max = self.max_delay.max(start);

        // Compare in f64 space so large exponents saturate at the cap
        // instead of overflowing Duration.
        let raw = start.as_secs_f64() * factor.powi(attempt.min(64) as i32);
        if raw >= max.as_secs_f64() {
            max
        } else {
            Duration::from_secs_f64(raw)
        }
    }
}

/// Invoke `op`, retrying with exponential delay on failure.
///
/// Each retry is logged with the attempt number and the computed delay.
/// Returns the first success, or the last error once `max_attempts` is
/// exhausted.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!("{label} succeeded after {} attempts", attempt + 1);
                }
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                if let Some(max) = policy.max_attempts {
                    if attempt >= max {
                        return Err(err.context(format!("{label} failed after {attempt} attempts")));
                    }
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    "{label} failed (attempt {attempt}): {err:#}. Retrying in {:.1}s...",
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
