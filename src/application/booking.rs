use crate::domain::booking::{
    BookingRequest, BookingResult, ReservationRequest, ReservationResult,
};
use crate::domain::payment::PaymentRequest;
use crate::domain::ports::HotelActivitiesRef;
use crate::domain::process::{BookingState, ProcessId, ProcessInput};
use crate::error::{BookingError, Result};
use crate::runtime::context::ProcessContext;
use std::time::Duration;
use tracing::{error, info};

pub const RESERVE_HOTEL_STEP: &str = "reserve_hotel";

/// Reserves the room, then hands payment over to a detached payment process.
///
/// The caller gets an answer as soon as the payment process has been accepted;
/// the payment itself may not happen for days and its outcome is recorded on
/// the payment process, not here.
pub struct BookingWorkflow {
    activities: HotelActivitiesRef,
    activity_timeout: Duration,
}

impl BookingWorkflow {
    pub fn new(activities: HotelActivitiesRef, activity_timeout: Duration) -> Self {
        Self {
            activities,
            activity_timeout,
        }
    }

    pub async fn run(
        &self,
        ctx: &ProcessContext,
        request: BookingRequest,
    ) -> Result<BookingResult> {
        info!(
            process_id = %ctx.process_id(),
            hotel_id = %request.hotel_id,
            "running booking workflow"
        );

        ctx.transition(BookingState::Reserving).await?;
        let reservation = ReservationRequest::from(&request);
        let reserved: ReservationResult = ctx
            .invoke(RESERVE_HOTEL_STEP, self.activity_timeout, || {
                self.activities.reserve_hotel(reservation.clone())
            })
            .await
            .map_err(|e| {
                error!(process_id = %ctx.process_id(), error = %e, "error reserving hotel");
                BookingError::ReservationFailed(e)
            })?;

        ctx.transition(BookingState::SchedulingPayment).await?;
        let payment = PaymentRequest::for_booking(&request, &reserved);
        let payment_date = payment.payment_date;

        ctx.transition(BookingState::Detaching).await?;
        let payment_process = ProcessId::payment_for(ctx.process_id());
        ctx.spawn_child(payment_process, ProcessInput::Payment(payment))
            .await
            .map_err(|e| {
                error!(
                    process_id = %ctx.process_id(),
                    error = %e,
                    "failed to start payment process"
                );
                BookingError::PaymentSchedulingFailed(e.to_string())
            })?;

        info!(
            process_id = %ctx.process_id(),
            booking_id = %reserved.booking_id,
            %payment_date,
            "booking confirmed"
        );
        Ok(BookingResult {
            booking_id: reserved.booking_id,
            hotel_id: request.hotel_id,
            payment_date,
        })
    }
}
