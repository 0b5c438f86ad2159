//! Named polling conditions.
//!
//! A [`Condition`] repeatedly runs an async probe until it yields a value or
//! the timeout elapses. The probe runs once immediately, then once per poll
//! interval; the last probe happens exactly when the timeout expires, so a
//! condition never reports failure early.
//!
//! ```no_run
//! use std::time::Duration;
//! use navcheck_core::wait::Condition;
//!
//! # async fn example() {
//! let ready = Condition::new("Data source set", Duration::from_secs(5), Duration::from_secs(1))
//!     .wait(|| async { true })
//!     .await;
//! assert!(ready);
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, debug_span, Instrument};

/// A named condition with a timeout and poll interval.
#[derive(Debug, Clone)]
pub struct Condition {
    name: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl Condition {
    pub fn new(name: impl Into<String>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            name: name.into(),
            timeout,
            poll_interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Polls `probe` until it returns `Some`, yielding that value.
    ///
    /// Returns `None` once the timeout has elapsed without a value.
    pub async fn wait_for<T, F, Fut>(&self, mut probe: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let span = debug_span!("condition", name = %self.name);
        async {
            let start = Instant::now();
            let deadline = start + self.timeout;
            let mut attempts: u32 = 0;

            loop {
                attempts += 1;
                if let Some(value) = probe().await {
                    debug!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "condition met");
                    return Some(value);
                }

                let now = Instant::now();
                if now >= deadline {
                    debug!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "condition timed out");
                    return None;
                }
                let remaining = deadline - now;
                tokio::time::sleep(self.poll_interval.min(remaining)).await;
            }
        }
        .instrument(span)
        .await
    }

    /// Polls a boolean `probe` until it returns `true`.
    pub async fn wait<F, Fut>(&self, mut probe: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        self.wait_for(|| {
            let fut = probe();
            async move { fut.await.then_some(()) }
        })
        .await
        .is_some()
    }
}
