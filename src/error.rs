use crate::domain::process::ProcessId;
use thiserror::Error;

/// Failure of a single leaf task as observed by an orchestrator.
///
/// Downstream errors are opaque strings; the retry wrapper only adds how
/// many attempts were made before giving up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),
    #[error("{task} exceeded its deadline after {attempts} attempt(s): {last_error}")]
    DeadlineExceeded {
        task: String,
        attempts: u32,
        last_error: String,
    },
    #[error("{task} gave up after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        task: String,
        attempts: u32,
        last_error: String,
    },
    #[error("{task} succeeded but its result could not be recorded: {reason}")]
    NotRecorded { task: String, reason: String },
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("reservation failed: {0}")]
    ReservationFailed(TaskError),
    #[error("could not schedule payment: {0}")]
    PaymentSchedulingFailed(String),
    #[error("payment failed: {0}")]
    PaymentFailed(TaskError),
    #[error("process {0} not found")]
    ProcessNotFound(ProcessId),
    #[error("process {0} already exists")]
    ProcessAlreadyExists(ProcessId),
    #[error("process {id} failed: {reason}")]
    ProcessFailed { id: ProcessId, reason: String },
    #[error("process {0} finished with an unexpected output")]
    UnexpectedOutput(ProcessId),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, BookingError>;
