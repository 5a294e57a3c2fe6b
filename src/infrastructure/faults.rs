//! Fault injectors for the simulated hotel API.
//!
//! Downstream APIs are a black box that fails whenever it likes; these let
//! the demo and the tests decide how often.

use crate::domain::ports::FaultInjector;
use crate::error::TaskError;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn check(&self, _operation: &str) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Fails roughly one in `one_in` calls.
#[derive(Debug, Clone, Copy)]
pub struct RandomFaults {
    one_in: u32,
}

impl RandomFaults {
    /// `one_in == 0` never fails.
    pub fn new(one_in: u32) -> Self {
        Self { one_in }
    }
}

impl FaultInjector for RandomFaults {
    fn check(&self, operation: &str) -> Result<(), TaskError> {
        if self.one_in == 0 {
            return Ok(());
        }
        let roll = rand::thread_rng().gen_range(0..self.one_in);
        debug!(operation, roll, "simulating failure");
        if roll == 0 {
            return Err(TaskError::failed(format!("{} unavailable", operation)));
        }
        Ok(())
    }
}

/// Fails the first `failures` calls of each operation, then succeeds.
#[derive(Debug)]
pub struct ScriptedFaults {
    failures: Option<u32>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedFaults {
    pub fn fail_first(failures: u32) -> Self {
        Self {
            failures: Some(failures),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Every call fails.
    pub fn always() -> Self {
        Self {
            failures: None,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// How many times `operation` has been checked.
    pub fn calls(&self, operation: &str) -> u32 {
        self.calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl FaultInjector for ScriptedFaults {
    fn check(&self, operation: &str) -> Result<(), TaskError> {
        let call = match self.calls.lock() {
            Ok(mut calls) => {
                let count = calls.entry(operation.to_string()).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => return Err(TaskError::failed("fault injector state poisoned")),
        };

        match self.failures {
            Some(failures) if call > failures => Ok(()),
            _ => Err(TaskError::failed(format!("{} unavailable", operation))),
        }
    }
}
