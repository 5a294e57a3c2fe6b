use super::Runtime;
use super::signals::SignalInbox;
use super::timer::{DurableTimer, TimerCanceller};
use crate::domain::process::{ProcessId, ProcessInput, ProcessOutput, ProcessRecord, ProcessState};
use crate::error::{BookingError, Result, TaskError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The capabilities a running process gets from the runtime.
///
/// One context exists per process run. Every state change and every completed
/// step is written through to the process store before the process moves on.
pub struct ProcessContext {
    id: ProcessId,
    runtime: Runtime,
    record: Mutex<ProcessRecord>,
}

impl ProcessContext {
    pub(crate) fn new(runtime: Runtime, record: ProcessRecord) -> Self {
        Self {
            id: record.id.clone(),
            runtime,
            record: Mutex::new(record),
        }
    }

    pub fn process_id(&self) -> &ProcessId {
        &self.id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.runtime.now()
    }

    pub async fn transition(&self, state: impl Into<ProcessState>) -> Result<()> {
        let mut record = self.record.lock().await;
        record.state = state.into();
        record.updated_at = self.now();
        debug!(process_id = %self.id, state = ?record.state, "process state changed");
        self.runtime.store().store(record.clone()).await
    }

    /// Result journaled for `step` by an earlier run of this process.
    pub async fn replayed<T: DeserializeOwned>(&self, step: &str) -> Option<T> {
        let record = self.record.lock().await;
        record
            .steps
            .get(step)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub async fn record_step<T: Serialize>(&self, step: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut record = self.record.lock().await;
        record.steps.insert(step.to_string(), value);
        record.updated_at = self.now();
        self.runtime.store().store(record.clone()).await
    }

    /// Runs a leaf task under the runtime's retry policy and an overall
    /// `timeout`, journaling its result under `step`.
    pub async fn invoke<T, F, Fut>(
        &self,
        step: &str,
        timeout: Duration,
        task: F,
    ) -> std::result::Result<T, TaskError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, TaskError>>,
    {
        if let Some(value) = self.replayed(step).await {
            debug!(process_id = %self.id, step, "replaying recorded task result");
            return Ok(value);
        }

        let value = self.runtime.config().retry.run(step, timeout, task).await?;
        self.record_step(step, &value)
            .await
            .map_err(|e| TaskError::NotRecorded {
                task: step.to_string(),
                reason: e.to_string(),
            })?;
        Ok(value)
    }

    pub fn start_timer(&self, delay: Duration) -> (DurableTimer, TimerCanceller) {
        DurableTimer::start(delay)
    }

    pub async fn signal_channel(&self, name: &str) -> SignalInbox {
        self.runtime.signals().open(&self.id, name).await
    }

    /// Starts a detached child process and returns once it has been accepted.
    ///
    /// The child outlives this process. Spawning a child that an earlier run of
    /// this process already started is acknowledged without starting it twice.
    pub async fn spawn_child(&self, id: ProcessId, input: ProcessInput) -> Result<()> {
        let step = format!("spawn:{}", id);
        if self.replayed::<ProcessId>(&step).await.is_some() {
            debug!(process_id = %self.id, child = %id, "child already spawned");
            return Ok(());
        }

        let record = ProcessRecord::new(id.clone(), Some(self.id.clone()), input, self.now());
        let store = self.runtime.store();
        if store.create(record.clone()).await? {
            self.runtime.launch(record);
        } else {
            let existing = store
                .get(&id)
                .await?
                .ok_or_else(|| BookingError::ProcessNotFound(id.clone()))?;
            if existing.parent.as_ref() != Some(&self.id) {
                return Err(BookingError::ProcessAlreadyExists(id));
            }
        }
        info!(process_id = %self.id, child = %id, "child process started");

        // The child is durable from here on. Without the journal entry a replay
        // still finds it in the store under this parent.
        if let Err(e) = self.record_step(&step, &id).await {
            warn!(process_id = %self.id, child = %id, error = %e, "could not journal child spawn");
        }
        Ok(())
    }

    pub(crate) async fn finish(&self, outcome: Result<ProcessOutput>) -> Result<()> {
        let mut record = self.record.lock().await;
        let kind = record.kind();
        match outcome {
            Ok(output) => {
                record.state = ProcessState::completed(kind);
                record.output = Some(output);
            }
            Err(e) => record.state = ProcessState::failed(kind, e.to_string()),
        }
        record.updated_at = self.now();
        self.runtime.store().store(record.clone()).await
    }
}
