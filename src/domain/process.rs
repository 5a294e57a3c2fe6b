//! Identity and persisted state of orchestration processes.

use super::booking::{BookingRequest, BookingResult};
use super::payment::{PaymentRequest, PaymentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Suffix appended to a booking process id to address its payment process.
pub const PAYMENT_PROCESS_SUFFIX: &str = "_payment";

/// Name of the signal channel a payment process listens on while waiting.
pub const CHECK_IN_SIGNAL: &str = "check-in";

/// Identity of a running or finished process.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh identity for a booking process.
    pub fn generate_booking() -> Self {
        Self(format!("book-{}", uuid::Uuid::new_v4()))
    }

    /// The payment process spawned by the booking process `parent`.
    ///
    /// This derivation is part of the public contract: anyone holding the
    /// booking id can address the payment process (e.g. to check in) without
    /// a lookup.
    pub fn payment_for(parent: &ProcessId) -> Self {
        Self(format!("{}{}", parent.0, PAYMENT_PROCESS_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    Booking,
    Payment,
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessKind::Booking => f.write_str("booking"),
            ProcessKind::Payment => f.write_str("payment"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BookingState {
    Reserving,
    SchedulingPayment,
    Detaching,
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentState {
    Waiting { until: DateTime<Utc> },
    Paying,
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "kind", content = "status", rename_all = "lowercase")]
pub enum ProcessState {
    Booking(BookingState),
    Payment(PaymentState),
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::Booking(BookingState::Completed | BookingState::Failed { .. })
                | ProcessState::Payment(PaymentState::Completed | PaymentState::Failed { .. })
        )
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ProcessState::Booking(BookingState::Failed { reason })
            | ProcessState::Payment(PaymentState::Failed { reason }) => Some(reason),
            _ => None,
        }
    }

    pub fn completed(kind: ProcessKind) -> Self {
        match kind {
            ProcessKind::Booking => ProcessState::Booking(BookingState::Completed),
            ProcessKind::Payment => ProcessState::Payment(PaymentState::Completed),
        }
    }

    pub fn failed(kind: ProcessKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        match kind {
            ProcessKind::Booking => ProcessState::Booking(BookingState::Failed { reason }),
            ProcessKind::Payment => ProcessState::Payment(PaymentState::Failed { reason }),
        }
    }
}

impl From<BookingState> for ProcessState {
    fn from(state: BookingState) -> Self {
        ProcessState::Booking(state)
    }
}

impl From<PaymentState> for ProcessState {
    fn from(state: PaymentState) -> Self {
        ProcessState::Payment(state)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "kind", content = "request", rename_all = "lowercase")]
pub enum ProcessInput {
    Booking(BookingRequest),
    Payment(PaymentRequest),
}

impl ProcessInput {
    pub fn kind(&self) -> ProcessKind {
        match self {
            ProcessInput::Booking(_) => ProcessKind::Booking,
            ProcessInput::Payment(_) => ProcessKind::Payment,
        }
    }

    /// State a process starts in before its orchestrator takes over.
    fn initial_state(&self) -> ProcessState {
        match self {
            ProcessInput::Booking(_) => BookingState::Reserving.into(),
            ProcessInput::Payment(request) => PaymentState::Waiting {
                until: request.payment_date,
            }
            .into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "kind", content = "result", rename_all = "lowercase")]
pub enum ProcessOutput {
    Booking(BookingResult),
    Payment(PaymentResult),
}

/// Durable record of one process instance.
///
/// `steps` journals the results of completed steps (task results, spawn
/// acknowledgements, wait outcomes) so a relaunched process replays them
/// instead of executing them again.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub id: ProcessId,
    pub parent: Option<ProcessId>,
    pub input: ProcessInput,
    pub state: ProcessState,
    pub output: Option<ProcessOutput>,
    #[serde(default)]
    pub steps: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessRecord {
    pub fn new(
        id: ProcessId,
        parent: Option<ProcessId>,
        input: ProcessInput,
        now: DateTime<Utc>,
    ) -> Self {
        let state = input.initial_state();
        Self {
            id,
            parent,
            input,
            state,
            output: None,
            steps: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> ProcessKind {
        self.input.kind()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
