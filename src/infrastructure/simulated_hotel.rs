use super::faults::RandomFaults;
use crate::config::SimulationConfig;
use crate::domain::booking::{ReservationRequest, ReservationResult};
use crate::domain::payment::{PaymentRequest, PaymentResult};
use crate::domain::ports::{FaultInjectorRef, HotelActivities};
use crate::error::TaskError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A stand-in for a real hotel API: slow, and failing whenever the fault
/// injector says so.
pub struct SimulatedHotel {
    faults: FaultInjectorRef,
    reserve_latency: Duration,
    payment_latency: Duration,
}

impl SimulatedHotel {
    pub fn new(config: &SimulationConfig, faults: FaultInjectorRef) -> Self {
        Self {
            faults,
            reserve_latency: config.reserve_latency,
            payment_latency: config.payment_latency,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config, Arc::new(RandomFaults::new(config.failure_one_in)))
    }
}

impl Default for SimulatedHotel {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

#[async_trait]
impl HotelActivities for SimulatedHotel {
    async fn reserve_hotel(
        &self,
        input: ReservationRequest,
    ) -> Result<ReservationResult, TaskError> {
        info!(hotel_id = %input.hotel_id, "reserving hotel");
        tokio::time::sleep(self.reserve_latency).await;

        self.faults.check("reserve_hotel")?;

        let result = ReservationResult {
            booking_id: rand::random::<u32>().to_string(),
        };
        info!(
            hotel_id = %input.hotel_id,
            booking_id = %result.booking_id,
            "hotel successfully reserved"
        );
        Ok(result)
    }

    async fn pay_hotel(&self, input: PaymentRequest) -> Result<PaymentResult, TaskError> {
        info!(booking_id = %input.booking_id, "paying hotel");
        tokio::time::sleep(self.payment_latency).await;

        self.faults.check("pay_hotel")?;

        let result = PaymentResult {
            transaction_id: uuid::Uuid::new_v4().to_string(),
        };
        info!(
            booking_id = %input.booking_id,
            transaction_id = %result.transaction_id,
            "hotel successfully paid"
        );
        Ok(result)
    }
}
