mod common;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::{
    FailingOperation, RecordingHotel, booking_request, init_test_logging, runtime_with,
    runtime_with_store,
};
use hotel_bookings::domain::ports::ProcessStore;
use hotel_bookings::domain::process::{
    BookingState, PaymentState, ProcessId, ProcessInput, ProcessKind, ProcessRecord, ProcessState,
};
use hotel_bookings::error::{BookingError, Result};
use hotel_bookings::infrastructure::clock::MonotonicClock;
use hotel_bookings::infrastructure::faults::ScriptedFaults;
use hotel_bookings::infrastructure::in_memory::InMemoryProcessStore;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn anchor() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_booking_returns_while_payment_is_still_waiting() {
    init_test_logging();
    let clock = MonotonicClock::starting_at(anchor());
    let hotel = RecordingHotel::new(clock);
    let runtime = runtime_with(hotel.clone(), clock);

    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));
    let handle = runtime.submit_booking(request.clone()).await.unwrap();
    let result = handle.result().await.unwrap();

    assert_eq!(result.booking_id, "BK0001");
    assert_eq!(result.hotel_id, "12345");
    assert_eq!(result.payment_date, anchor() + ChronoDuration::hours(1));
    // The booking finished without waiting an hour for the payment.
    assert!(runtime.now() < anchor() + ChronoDuration::hours(1));

    let payment = runtime
        .process(&handle.payment_process_id())
        .await
        .unwrap()
        .expect("payment process should exist");
    assert_eq!(payment.parent.as_ref(), Some(handle.id()));
    assert_eq!(
        payment.state,
        ProcessState::Payment(PaymentState::Waiting {
            until: anchor() + ChronoDuration::hours(1)
        })
    );
    assert!(hotel.payments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_payment_date_follows_pay_on_check_in() {
    let clock = MonotonicClock::starting_at(anchor());
    let runtime = runtime_with(RecordingHotel::new(clock), clock);
    let pre_payment_date = anchor() + ChronoDuration::hours(2);

    let prepaid = booking_request(anchor(), false, pre_payment_date);
    let on_arrival = booking_request(anchor(), true, pre_payment_date);

    let prepaid = runtime.submit_booking(prepaid).await.unwrap();
    let on_arrival_handle = runtime.submit_booking(on_arrival.clone()).await.unwrap();

    assert_eq!(prepaid.result().await.unwrap().payment_date, pre_payment_date);
    assert_eq!(
        on_arrival_handle.result().await.unwrap().payment_date,
        on_arrival.check_in_date
    );
}

#[tokio::test(start_paused = true)]
async fn test_payment_process_is_spawned_once_with_reserved_booking_id() {
    let clock = MonotonicClock::starting_at(anchor());
    let runtime = runtime_with(RecordingHotel::new(clock), clock);

    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));
    let handle = runtime
        .submit_booking_with_id(ProcessId::new("book-spawn"), request.clone())
        .await
        .unwrap();
    handle.result().await.unwrap();

    let records = runtime.processes().await.unwrap();
    let payments: Vec<_> = records
        .iter()
        .filter(|record| record.kind() == ProcessKind::Payment)
        .collect();
    assert_eq!(payments.len(), 1);

    let payment = payments[0];
    assert_eq!(payment.id.as_str(), "book-spawn_payment");
    match &payment.input {
        ProcessInput::Payment(input) => {
            assert_eq!(input.booking_id, "BK0001");
            assert_eq!(input.total_cost_in_pence, 18999);
            assert_eq!(input.payment_date, request.payment_date());
            assert_eq!(input.card_details, request.card_details);
        }
        other => panic!("unexpected payment input: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reservation_failure_fails_booking_without_payment() {
    let clock = MonotonicClock::starting_at(anchor());
    let hotel = RecordingHotel::with_faults(clock, Arc::new(FailingOperation("reserve_hotel")));
    let runtime = runtime_with(hotel.clone(), clock);

    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));
    let handle = runtime.submit_booking(request).await.unwrap();

    let err = handle.result().await.unwrap_err();
    match &err {
        BookingError::ProcessFailed { id, reason } => {
            assert_eq!(id, handle.id());
            assert!(reason.starts_with("reservation failed"), "reason: {}", reason);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // Retried with backoff until the 60 second deadline ran out.
    assert!(hotel.reservations().len() > 1);
    assert!(runtime.now() <= anchor() + ChronoDuration::seconds(60));

    assert!(
        runtime
            .process(&handle.payment_process_id())
            .await
            .unwrap()
            .is_none()
    );
    let record = runtime.process(handle.id()).await.unwrap().unwrap();
    assert!(matches!(
        record.state,
        ProcessState::Booking(BookingState::Failed { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_payment_process_id_taken_fails_booking() {
    let clock = MonotonicClock::starting_at(anchor());
    let runtime = runtime_with(RecordingHotel::new(clock), clock);
    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));

    // An unrelated process already owns the id the payment process needs.
    runtime
        .submit_booking_with_id(ProcessId::new("x_payment"), request.clone())
        .await
        .unwrap();
    let handle = runtime
        .submit_booking_with_id(ProcessId::new("x"), request)
        .await
        .unwrap();

    let err = handle.result().await.unwrap_err();
    match &err {
        BookingError::ProcessFailed { id, reason } => {
            assert_eq!(id.as_str(), "x");
            assert!(
                reason.starts_with("could not schedule payment"),
                "reason: {}",
                reason
            );
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let taken = runtime
        .process(&ProcessId::new("x_payment"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(taken.kind(), ProcessKind::Booking);
    assert_eq!(taken.parent, None);

    let children = runtime
        .processes()
        .await
        .unwrap()
        .into_iter()
        .filter(|record| record.parent.as_ref() == Some(handle.id()))
        .count();
    assert_eq!(children, 0);
}

/// Fails the first write that journals a child spawn.
#[derive(Default)]
struct SpawnJournalFailsOnce {
    inner: InMemoryProcessStore,
    failed: AtomicBool,
}

#[async_trait]
impl ProcessStore for SpawnJournalFailsOnce {
    async fn store(&self, record: ProcessRecord) -> Result<()> {
        let journals_spawn = record.steps.keys().any(|step| step.starts_with("spawn:"));
        if journals_spawn && !self.failed.swap(true, Ordering::SeqCst) {
            return Err(BookingError::IoError(io::Error::other("disk full")));
        }
        self.inner.store(record).await
    }

    async fn create(&self, record: ProcessRecord) -> Result<bool> {
        self.inner.create(record).await
    }

    async fn get(&self, id: &ProcessId) -> Result<Option<ProcessRecord>> {
        self.inner.get(id).await
    }

    async fn get_all(&self) -> Result<Vec<ProcessRecord>> {
        self.inner.get_all().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_unjournaled_spawn_still_confirms_booking() {
    let clock = MonotonicClock::starting_at(anchor());
    let store = SpawnJournalFailsOnce::default();
    let runtime = runtime_with_store(RecordingHotel::new(clock), clock, Box::new(store));

    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));
    let handle = runtime.submit_booking(request).await.unwrap();
    let result = handle.result().await.unwrap();
    assert_eq!(result.booking_id, "BK0001");

    let payments = runtime
        .processes()
        .await
        .unwrap()
        .into_iter()
        .filter(|record| record.kind() == ProcessKind::Payment)
        .count();
    assert_eq!(payments, 1);

    handle.check_in().await.unwrap();
    handle.payment().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transient_reservation_failures_are_retried() {
    let clock = MonotonicClock::starting_at(anchor());
    let faults = Arc::new(ScriptedFaults::fail_first(2));
    let hotel = RecordingHotel::with_faults(clock, faults.clone());
    let runtime = runtime_with(hotel.clone(), clock);

    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));
    let handle = runtime.submit_booking(request).await.unwrap();
    let result = handle.result().await.unwrap();

    assert_eq!(result.booking_id, "BK0001");
    assert_eq!(faults.calls("reserve_hotel"), 3);

    let reservations = hotel.reservations();
    assert_eq!(reservations.len(), 3);
    // Backoff of one then two seconds between attempts.
    assert_eq!(reservations[1].at - reservations[0].at, ChronoDuration::seconds(1));
    assert_eq!(reservations[2].at - reservations[1].at, ChronoDuration::seconds(2));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_booking_id_is_rejected() {
    let clock = MonotonicClock::starting_at(anchor());
    let runtime = runtime_with(RecordingHotel::new(clock), clock);
    let request = booking_request(anchor(), false, anchor() + ChronoDuration::hours(1));
    let id = ProcessId::new("book-dup");

    runtime
        .submit_booking_with_id(id.clone(), request.clone())
        .await
        .unwrap();
    let err = runtime
        .submit_booking_with_id(id.clone(), request)
        .await
        .err()
        .expect("second submission should fail");

    assert!(matches!(err, BookingError::ProcessAlreadyExists(existing) if existing == id));
}

#[tokio::test(start_paused = true)]
async fn test_waiting_on_unknown_process_fails() {
    let clock = MonotonicClock::starting_at(anchor());
    let runtime = runtime_with(RecordingHotel::new(clock), clock);

    let err = runtime
        .await_booking(&ProcessId::new("book-missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::ProcessNotFound(_)));
}
