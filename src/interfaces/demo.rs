//! Demo client: books a batch of rooms, waits, checks every guest in and
//! collects the payment outcomes.

use crate::domain::booking::{BookingRequest, BookingResult, CardDetails};
use crate::domain::process::ProcessId;
use crate::error::{BookingError, Result};
use crate::runtime::Runtime;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub const DEMO_HOTEL_ID: &str = "12345";
pub const DEMO_TOTAL_COST_IN_PENCE: u32 = 18999;

#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Number of bookings to run concurrently.
    pub count: usize,
    /// How long to wait after all bookings are confirmed before checking in.
    pub check_in_after: Duration,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            count: 10,
            check_in_after: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingOutcome {
    pub process_id: ProcessId,
    pub booking_id: Option<String>,
    pub hotel_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl BookingOutcome {
    fn confirmed(process_id: &ProcessId, result: &BookingResult) -> Self {
        Self {
            process_id: process_id.clone(),
            booking_id: Some(result.booking_id.clone()),
            hotel_id: Some(result.hotel_id.clone()),
            payment_date: Some(result.payment_date),
            error: None,
        }
    }

    fn failed(process_id: &ProcessId, error: &BookingError) -> Self {
        Self {
            process_id: process_id.clone(),
            booking_id: None,
            hotel_id: None,
            payment_date: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub process_id: ProcessId,
    pub transaction_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, PartialEq, Clone)]
pub struct DemoReport {
    pub bookings: Vec<BookingOutcome>,
    pub payments: Vec<PaymentOutcome>,
}

/// A booking made at `now`: check-in a week later at 15:00, check-out the day
/// after at 11:00, pre-paid an hour from now with a test card.
pub fn sample_booking_request(now: DateTime<Utc>) -> BookingRequest {
    let at = |days: i64, hour: u32| {
        let date = (now + ChronoDuration::days(days)).date_naive();
        date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
            .and_utc()
    };

    BookingRequest {
        hotel_id: DEMO_HOTEL_ID.to_string(),
        total_cost_in_pence: DEMO_TOTAL_COST_IN_PENCE,
        check_in_date: at(7, 15),
        check_out_date: at(8, 11),
        pay_on_check_in: false,
        pre_payment_date: now + ChronoDuration::hours(1),
        // Test card number; never use real card details here.
        card_details: CardDetails {
            number: "5555555555554444".to_string(),
            expiry_month: 1,
            expiry_year: now.year() + 3,
            security_code: 123,
        },
    }
}

pub async fn run(runtime: &Runtime, options: &DemoOptions) -> Result<DemoReport> {
    let mut handles = Vec::with_capacity(options.count);
    for _ in 0..options.count {
        let handle = runtime
            .submit_booking(sample_booking_request(runtime.now()))
            .await?;
        info!(process_id = %handle.id(), "started booking");
        handles.push(handle);
    }

    let mut report = DemoReport::default();
    let mut confirmed = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.result().await {
            Ok(result) => {
                info!(
                    process_id = %handle.id(),
                    payment_date = %result.payment_date,
                    "booking confirmed, payment scheduled"
                );
                report.bookings.push(BookingOutcome::confirmed(handle.id(), &result));
                confirmed.push(handle);
            }
            Err(e) => {
                warn!(process_id = %handle.id(), error = %e, "booking failed");
                report.bookings.push(BookingOutcome::failed(handle.id(), &e));
            }
        }
    }

    info!(delay = ?options.check_in_after, "sleeping before check-in");
    tokio::time::sleep(options.check_in_after).await;

    for handle in &confirmed {
        handle.check_in().await?;
    }
    info!("everyone checked in");

    for handle in &confirmed {
        let process_id = handle.payment_process_id();
        let outcome = match handle.payment().await {
            Ok(result) => PaymentOutcome {
                process_id,
                transaction_id: Some(result.transaction_id),
                error: None,
            },
            Err(e) => {
                warn!(process_id = %process_id, error = %e, "payment failed");
                PaymentOutcome {
                    process_id,
                    transaction_id: None,
                    error: Some(e.to_string()),
                }
            }
        };
        report.payments.push(outcome);
    }

    Ok(report)
}
