use crate::error::TaskError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Exponential backoff applied between attempts of a leaf task.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    /// `None` retries until the deadline.
    pub maximum_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(100),
            maximum_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        if !scaled.is_finite() || scaled >= self.maximum_interval.as_secs_f64() {
            self.maximum_interval
        } else {
            Duration::from_secs_f64(scaled.max(0.0))
        }
    }

    /// Runs `task` until it succeeds, the attempts run out, or `timeout`
    /// elapses. Only the final outcome is returned.
    pub async fn run<T, F, Fut>(
        &self,
        name: &str,
        timeout: Duration,
        task: F,
    ) -> Result<T, TaskError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, TaskError>>,
    {
        let deadline = Instant::now() + timeout;
        let mut attempt = 0;
        let mut last_error = String::from("no attempt completed");

        loop {
            attempt += 1;
            match tokio::time::timeout_at(deadline, task()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    return Err(TaskError::DeadlineExceeded {
                        task: name.to_string(),
                        attempts: attempt,
                        last_error,
                    });
                }
            }

            warn!(task = name, attempt, error = %last_error, "task attempt failed");

            if self.maximum_attempts.is_some_and(|max| attempt >= max) {
                return Err(TaskError::RetriesExhausted {
                    task: name.to_string(),
                    attempts: attempt,
                    last_error,
                });
            }

            let backoff = self.backoff(attempt);
            if Instant::now() + backoff >= deadline {
                return Err(TaskError::DeadlineExceeded {
                    task: name.to_string(),
                    attempts: attempt,
                    last_error,
                });
            }
            tokio::time::sleep(backoff).await;
        }
    }
}
