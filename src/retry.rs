use std::{future::Future, time::Duration};

use tracing::{error, warn};

use crate::error::AppResult;

pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        (**self).sleep(duration)
    }
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// Linear backoff: the wait after attempt `n` is `base_delay * n`.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. The last error is returned as-is.
    pub async fn run<T, F, Fut, S>(&self, sleeper: &S, what: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
        S: Sleeper,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "{what} failed, retrying"
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => {
                    if err.is_transient() {
                        error!(attempts = attempt, error = %err, "{what} failed, giving up");
                    }
                    return Err(err);
                },
            }
        }
    }
}
