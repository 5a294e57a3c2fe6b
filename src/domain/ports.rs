use super::booking::{ReservationRequest, ReservationResult};
use super::payment::{PaymentRequest, PaymentResult};
use super::process::{ProcessId, ProcessRecord};
use crate::error::{Result, TaskError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The leaf tasks an orchestrator can invoke.
///
/// Both operations must be safe to retry: a retry after a failure is expected
/// to eventually succeed, and a failed call leaves nothing half done.
#[async_trait]
pub trait HotelActivities: Send + Sync {
    async fn reserve_hotel(
        &self,
        input: ReservationRequest,
    ) -> std::result::Result<ReservationResult, TaskError>;

    async fn pay_hotel(
        &self,
        input: PaymentRequest,
    ) -> std::result::Result<PaymentResult, TaskError>;
}

pub type HotelActivitiesRef = Arc<dyn HotelActivities>;

/// Decides whether a call into a downstream system fails.
pub trait FaultInjector: Send + Sync {
    fn check(&self, operation: &str) -> std::result::Result<(), TaskError>;
}

pub type FaultInjectorRef = Arc<dyn FaultInjector>;

/// Durable storage for process records.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Inserts or replaces a record.
    async fn store(&self, record: ProcessRecord) -> Result<()>;
    /// Inserts a record only if no record with the same id exists.
    /// Returns `false` when the id is already taken.
    async fn create(&self, record: ProcessRecord) -> Result<bool>;
    async fn get(&self, id: &ProcessId) -> Result<Option<ProcessRecord>>;
    async fn get_all(&self) -> Result<Vec<ProcessRecord>>;
}

pub type ProcessStoreBox = Box<dyn ProcessStore>;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type ClockRef = Arc<dyn Clock>;
