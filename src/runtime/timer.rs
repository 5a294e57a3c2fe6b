//! Cancellable timers and the "first of N" wait combinator.

use futures::future::{BoxFuture, select_all};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SleepOutcome {
    /// The full delay passed.
    Elapsed,
    /// The timer was cancelled before it elapsed.
    Cancelled,
}

/// A timer that fires once at a fixed deadline unless cancelled first.
#[derive(Debug)]
pub struct DurableTimer {
    deadline: Instant,
    cancelled: watch::Receiver<bool>,
}

/// Cancels the [`DurableTimer`] it was created with.
#[derive(Debug)]
pub struct TimerCanceller(watch::Sender<bool>);

impl DurableTimer {
    pub fn start(delay: Duration) -> (Self, TimerCanceller) {
        let (tx, rx) = watch::channel(false);
        let timer = Self {
            deadline: Instant::now() + delay,
            cancelled: rx,
        };
        (timer, TimerCanceller(tx))
    }

    pub async fn wait(mut self) -> SleepOutcome {
        // A dropped canceller disables the first branch; the timer then just elapses.
        tokio::select! {
            biased;
            Ok(_) = self.cancelled.wait_for(|cancelled| *cancelled) => SleepOutcome::Cancelled,
            _ = tokio::time::sleep_until(self.deadline) => SleepOutcome::Elapsed,
        }
    }
}

impl TimerCanceller {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Waits for whichever condition resolves first.
///
/// Returns the winning output together with the conditions that did not
/// resolve. Dropping those discards them.
pub async fn wait_first<'a, T>(
    first: BoxFuture<'a, T>,
    rest: Vec<BoxFuture<'a, T>>,
) -> (T, Vec<BoxFuture<'a, T>>) {
    let mut conditions = Vec::with_capacity(rest.len() + 1);
    conditions.push(first);
    conditions.extend(rest);
    let (output, _index, remaining) = select_all(conditions).await;
    (output, remaining)
}
