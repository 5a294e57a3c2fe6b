//! In-process durable execution for booking and payment processes.
//!
//! The runtime owns process records in a [`ProcessStore`], runs each process
//! as its own tokio task, routes signals to per-process inboxes and wakes
//! anyone waiting on a process when it finishes. Records are written on every
//! state change, so [`Runtime::recover`] can relaunch unfinished processes
//! after a restart; steps they already completed are replayed from the
//! record instead of being executed again.

pub mod context;
pub mod retry;
pub mod signals;
pub mod timer;

use crate::application::booking::BookingWorkflow;
use crate::application::payment::PaymentWorkflow;
use crate::config::RuntimeConfig;
use crate::domain::booking::{BookingRequest, BookingResult};
use crate::domain::payment::PaymentResult;
use crate::domain::ports::{ClockRef, HotelActivitiesRef, ProcessStore, ProcessStoreBox};
use crate::domain::process::{
    CHECK_IN_SIGNAL, ProcessId, ProcessInput, ProcessOutput, ProcessRecord,
};
use crate::error::{BookingError, Result};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::in_memory::InMemoryProcessStore;
use crate::infrastructure::simulated_hotel::SimulatedHotel;
use chrono::{DateTime, Utc};
use context::ProcessContext;
use signals::{SignalDelivery, SignalRouter};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

struct Inner {
    store: ProcessStoreBox,
    activities: HotelActivitiesRef,
    clock: ClockRef,
    config: RuntimeConfig,
    signals: SignalRouter,
    running: StdMutex<HashSet<ProcessId>>,
    completions: Mutex<HashMap<ProcessId, watch::Sender<()>>>,
}

/// Handle to the runtime. Cloning shares the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<Inner>,
}

#[derive(Default)]
pub struct RuntimeBuilder {
    store: Option<ProcessStoreBox>,
    activities: Option<HotelActivitiesRef>,
    clock: Option<ClockRef>,
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    pub fn store(mut self, store: ProcessStoreBox) -> Self {
        self.store = Some(store);
        self
    }

    pub fn activities(mut self, activities: HotelActivitiesRef) -> Self {
        self.activities = Some(activities);
        self
    }

    pub fn clock(mut self, clock: ClockRef) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Missing parts default to an in-memory store, the simulated hotel API
    /// and the system clock.
    pub fn build(self) -> Runtime {
        Runtime {
            inner: Arc::new(Inner {
                store: self
                    .store
                    .unwrap_or_else(|| Box::new(InMemoryProcessStore::new())),
                activities: self
                    .activities
                    .unwrap_or_else(|| Arc::new(SimulatedHotel::default())),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                config: self.config,
                signals: SignalRouter::new(),
                running: StdMutex::new(HashSet::new()),
                completions: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub(crate) fn store(&self) -> &dyn ProcessStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn signals(&self) -> &SignalRouter {
        &self.inner.signals
    }

    /// Starts a booking process under a freshly generated id.
    pub async fn submit_booking(&self, request: BookingRequest) -> Result<BookingHandle> {
        self.submit_booking_with_id(ProcessId::generate_booking(), request)
            .await
    }

    pub async fn submit_booking_with_id(
        &self,
        id: ProcessId,
        request: BookingRequest,
    ) -> Result<BookingHandle> {
        let record = ProcessRecord::new(
            id.clone(),
            None,
            ProcessInput::Booking(request),
            self.now(),
        );
        if !self.inner.store.create(record.clone()).await? {
            return Err(BookingError::ProcessAlreadyExists(id));
        }
        self.launch(record);
        Ok(BookingHandle {
            id,
            runtime: self.clone(),
        })
    }

    /// Blocks until the process reaches a terminal state and returns its record.
    pub async fn wait_for(&self, id: &ProcessId) -> Result<ProcessRecord> {
        loop {
            let record = self.load(id).await?;
            if record.is_terminal() {
                return Ok(record);
            }

            let mut finished = self.subscribe(id).await;
            // It may have finished before we subscribed.
            let record = self.load(id).await?;
            if record.is_terminal() {
                self.unsubscribe(id, finished).await;
                return Ok(record);
            }
            // A change means the process finished; the sender is dropped right
            // after, which also wakes us. Either way the store has the answer.
            let _ = finished.changed().await;
        }
    }

    pub async fn await_booking(&self, id: &ProcessId) -> Result<BookingResult> {
        match outcome(self.wait_for(id).await?)? {
            ProcessOutput::Booking(result) => Ok(result),
            ProcessOutput::Payment(_) => Err(BookingError::UnexpectedOutput(id.clone())),
        }
    }

    /// Waits for the payment process belonging to the booking `booking_id`.
    pub async fn await_payment(&self, booking_id: &ProcessId) -> Result<PaymentResult> {
        let id = ProcessId::payment_for(booking_id);
        match outcome(self.wait_for(&id).await?)? {
            ProcessOutput::Payment(result) => Ok(result),
            ProcessOutput::Booking(_) => Err(BookingError::UnexpectedOutput(id)),
        }
    }

    pub async fn signal(&self, id: &ProcessId, channel: &str) -> Result<SignalDelivery> {
        let record = self
            .inner
            .store
            .get(id)
            .await?
            .ok_or_else(|| BookingError::ProcessNotFound(id.clone()))?;

        if record.is_terminal() {
            debug!(process_id = %id, signal = channel, "process already finished, signal ignored");
            return Ok(SignalDelivery::Ignored);
        }

        let delivery = self.inner.signals.deliver(id, channel).await;
        info!(process_id = %id, signal = channel, ?delivery, "signal sent");
        Ok(delivery)
    }

    /// Tells the payment process of `booking_id` that the guest checked in.
    pub async fn signal_check_in(&self, booking_id: &ProcessId) -> Result<SignalDelivery> {
        self.signal(&ProcessId::payment_for(booking_id), CHECK_IN_SIGNAL)
            .await
    }

    pub async fn process(&self, id: &ProcessId) -> Result<Option<ProcessRecord>> {
        self.inner.store.get(id).await
    }

    pub async fn processes(&self) -> Result<Vec<ProcessRecord>> {
        self.inner.store.get_all().await
    }

    /// Relaunches every unfinished process found in the store.
    ///
    /// Returns how many processes were relaunched.
    pub async fn recover(&self) -> Result<usize> {
        let pending: Vec<ProcessRecord> = self
            .inner
            .store
            .get_all()
            .await?
            .into_iter()
            .filter(|record| !record.is_terminal())
            .collect();

        let mut relaunched = 0;
        for record in pending {
            if self.launch(record) {
                relaunched += 1;
            }
        }
        if relaunched > 0 {
            info!(count = relaunched, "recovered unfinished processes");
        }
        Ok(relaunched)
    }

    /// Runs `record` on its own task. Returns `false` if it is already running.
    pub(crate) fn launch(&self, record: ProcessRecord) -> bool {
        let inserted = match self.inner.running.lock() {
            Ok(mut running) => running.insert(record.id.clone()),
            Err(poisoned) => poisoned.into_inner().insert(record.id.clone()),
        };
        if !inserted {
            debug!(process_id = %record.id, "process already running");
            return false;
        }

        info!(process_id = %record.id, kind = %record.kind(), "process started");
        let runtime = self.clone();
        tokio::spawn(runtime.execute(record));
        true
    }

    async fn execute(self, record: ProcessRecord) {
        let id = record.id.clone();
        let input = record.input.clone();
        let ctx = ProcessContext::new(self.clone(), record);
        let timeout = self.inner.config.activity_timeout;

        let outcome = match input {
            ProcessInput::Booking(request) => {
                BookingWorkflow::new(self.inner.activities.clone(), timeout)
                    .run(&ctx, request)
                    .await
                    .map(ProcessOutput::Booking)
            }
            ProcessInput::Payment(request) => {
                PaymentWorkflow::new(self.inner.activities.clone(), timeout)
                    .run(&ctx, request)
                    .await
                    .map(ProcessOutput::Payment)
            }
        };

        match &outcome {
            Ok(_) => info!(process_id = %id, "process completed"),
            Err(e) => warn!(process_id = %id, error = %e, "process failed"),
        }
        if let Err(e) = ctx.finish(outcome).await {
            error!(process_id = %id, error = %e, "could not record process outcome");
        }

        self.inner.signals.close(&id).await;
        match self.inner.running.lock() {
            Ok(mut running) => running.remove(&id),
            Err(poisoned) => poisoned.into_inner().remove(&id),
        };
        if let Some(sender) = self.inner.completions.lock().await.remove(&id) {
            sender.send_replace(());
        }
    }

    async fn load(&self, id: &ProcessId) -> Result<ProcessRecord> {
        self.inner
            .store
            .get(id)
            .await?
            .ok_or_else(|| BookingError::ProcessNotFound(id.clone()))
    }

    /// Drops `receiver` and forgets the completion sender once nobody listens.
    async fn unsubscribe(&self, id: &ProcessId, receiver: watch::Receiver<()>) {
        drop(receiver);
        let mut completions = self.inner.completions.lock().await;
        if completions
            .get(id)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            completions.remove(id);
        }
    }

    async fn subscribe(&self, id: &ProcessId) -> watch::Receiver<()> {
        let mut completions = self.inner.completions.lock().await;
        completions
            .entry(id.clone())
            .or_insert_with(|| watch::channel(()).0)
            .subscribe()
    }
}

fn outcome(record: ProcessRecord) -> Result<ProcessOutput> {
    if let Some(reason) = record.state.failure_reason() {
        return Err(BookingError::ProcessFailed {
            id: record.id,
            reason: reason.to_string(),
        });
    }
    record
        .output
        .ok_or(BookingError::UnexpectedOutput(record.id))
}

/// Returned by [`Runtime::submit_booking`].
#[derive(Clone)]
pub struct BookingHandle {
    id: ProcessId,
    runtime: Runtime,
}

impl BookingHandle {
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    pub fn payment_process_id(&self) -> ProcessId {
        ProcessId::payment_for(&self.id)
    }

    pub async fn result(&self) -> Result<BookingResult> {
        self.runtime.await_booking(&self.id).await
    }

    pub async fn check_in(&self) -> Result<SignalDelivery> {
        self.runtime.signal_check_in(&self.id).await
    }

    pub async fn payment(&self) -> Result<PaymentResult> {
        self.runtime.await_payment(&self.id).await
    }
}
