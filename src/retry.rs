use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Bounded retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A single attempt, no retry.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}
