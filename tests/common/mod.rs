#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hotel_bookings::domain::booking::{
    BookingRequest, CardDetails, ReservationRequest, ReservationResult,
};
use hotel_bookings::domain::payment::{PaymentRequest, PaymentResult};
use hotel_bookings::domain::ports::{
    Clock, FaultInjector, FaultInjectorRef, HotelActivities, ProcessStoreBox,
};
use hotel_bookings::error::TaskError;
use hotel_bookings::infrastructure::clock::MonotonicClock;
use hotel_bookings::infrastructure::faults::NoFaults;
use hotel_bookings::infrastructure::in_memory::InMemoryProcessStore;
use hotel_bookings::runtime::Runtime;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Initialize test logging; safe to call from every test.
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A call made to the hotel, with the (clock) time it was made.
#[derive(Debug, Clone)]
pub struct Call<T> {
    pub input: T,
    pub at: DateTime<Utc>,
    pub succeeded: bool,
}

/// Hotel API double that answers instantly and records every call.
pub struct RecordingHotel {
    clock: MonotonicClock,
    faults: FaultInjectorRef,
    next_booking: AtomicU32,
    reservations: Mutex<Vec<Call<ReservationRequest>>>,
    payments: Mutex<Vec<Call<PaymentRequest>>>,
}

impl RecordingHotel {
    pub fn new(clock: MonotonicClock) -> Arc<Self> {
        Self::with_faults(clock, Arc::new(NoFaults))
    }

    pub fn with_faults(clock: MonotonicClock, faults: FaultInjectorRef) -> Arc<Self> {
        Arc::new(Self {
            clock,
            faults,
            next_booking: AtomicU32::new(1),
            reservations: Mutex::new(Vec::new()),
            payments: Mutex::new(Vec::new()),
        })
    }

    pub fn reservations(&self) -> Vec<Call<ReservationRequest>> {
        self.reservations.lock().unwrap().clone()
    }

    pub fn payments(&self) -> Vec<Call<PaymentRequest>> {
        self.payments.lock().unwrap().clone()
    }

    pub fn successful_payments(&self) -> Vec<Call<PaymentRequest>> {
        self.payments().into_iter().filter(|call| call.succeeded).collect()
    }
}

#[async_trait]
impl HotelActivities for RecordingHotel {
    async fn reserve_hotel(
        &self,
        input: ReservationRequest,
    ) -> Result<ReservationResult, TaskError> {
        let outcome = self.faults.check("reserve_hotel");
        self.reservations.lock().unwrap().push(Call {
            input,
            at: self.clock.now(),
            succeeded: outcome.is_ok(),
        });
        outcome?;

        let n = self.next_booking.fetch_add(1, Ordering::SeqCst);
        Ok(ReservationResult {
            booking_id: format!("BK{:04}", n),
        })
    }

    async fn pay_hotel(&self, input: PaymentRequest) -> Result<PaymentResult, TaskError> {
        let outcome = self.faults.check("pay_hotel");
        let transaction_id = format!("TX-{}", input.booking_id);
        self.payments.lock().unwrap().push(Call {
            input,
            at: self.clock.now(),
            succeeded: outcome.is_ok(),
        });
        outcome?;

        Ok(PaymentResult { transaction_id })
    }
}

/// Fails every call to one operation.
pub struct FailingOperation(pub &'static str);

impl FaultInjector for FailingOperation {
    fn check(&self, operation: &str) -> Result<(), TaskError> {
        if operation == self.0 {
            Err(TaskError::failed(format!("{} unavailable", operation)))
        } else {
            Ok(())
        }
    }
}

pub fn runtime_with(hotel: Arc<RecordingHotel>, clock: MonotonicClock) -> Runtime {
    runtime_with_store(hotel, clock, Box::new(InMemoryProcessStore::new()))
}

pub fn runtime_with_store(
    hotel: Arc<RecordingHotel>,
    clock: MonotonicClock,
    store: ProcessStoreBox,
) -> Runtime {
    Runtime::builder()
        .store(store)
        .activities(hotel)
        .clock(Arc::new(clock))
        .build()
}

pub fn card() -> CardDetails {
    CardDetails {
        number: "5555555555554444".to_string(),
        expiry_month: 1,
        expiry_year: 2030,
        security_code: 123,
    }
}

/// The request used throughout the tests: check-in a week after `now`.
pub fn booking_request(
    now: DateTime<Utc>,
    pay_on_check_in: bool,
    pre_payment_date: DateTime<Utc>,
) -> BookingRequest {
    BookingRequest {
        hotel_id: "12345".to_string(),
        total_cost_in_pence: 18999,
        check_in_date: now + Duration::days(7) + Duration::hours(6),
        check_out_date: now + Duration::days(8),
        pay_on_check_in,
        pre_payment_date,
        card_details: card(),
    }
}
