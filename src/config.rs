//! Runtime and simulation settings.

use crate::runtime::retry::RetryPolicy;
use std::time::Duration;

/// How the runtime executes leaf tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Overall deadline for a task, retries included.
    pub activity_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            activity_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Behaviour of the simulated hotel API.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub reserve_latency: Duration,
    pub payment_latency: Duration,
    /// One in this many calls fails. Zero disables failures.
    pub failure_one_in: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            reserve_latency: Duration::from_secs(1),
            payment_latency: Duration::from_secs(5),
            failure_one_in: 3,
        }
    }
}
