use crate::domain::payment::{PaymentRequest, PaymentResult, PaymentTrigger};
use crate::domain::ports::HotelActivitiesRef;
use crate::domain::process::{CHECK_IN_SIGNAL, PaymentState};
use crate::error::{BookingError, Result};
use crate::runtime::context::ProcessContext;
use crate::runtime::timer::{SleepOutcome, wait_first};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::time::Duration;
use tracing::{debug, error, info};

pub const AWAIT_PAYMENT_DATE_STEP: &str = "await_payment_date";
pub const PAY_HOTEL_STEP: &str = "pay_hotel";

/// Conditions the payment process waits on; the first to resolve wins.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum WaitCondition {
    Timer(SleepOutcome),
    SignalReceived,
}

/// Waits until payment is due, or until the guest checks in, then charges the card.
pub struct PaymentWorkflow {
    activities: HotelActivitiesRef,
    activity_timeout: Duration,
}

impl PaymentWorkflow {
    pub fn new(activities: HotelActivitiesRef, activity_timeout: Duration) -> Self {
        Self {
            activities,
            activity_timeout,
        }
    }

    pub async fn run(
        &self,
        ctx: &ProcessContext,
        request: PaymentRequest,
    ) -> Result<PaymentResult> {
        info!(
            process_id = %ctx.process_id(),
            booking_id = %request.booking_id,
            "paying for hotel"
        );

        let trigger = match ctx.replayed::<PaymentTrigger>(AWAIT_PAYMENT_DATE_STEP).await {
            Some(trigger) => trigger,
            None => {
                let trigger = self.wait_for_payment_date(ctx, request.payment_date).await?;
                ctx.record_step(AWAIT_PAYMENT_DATE_STEP, &trigger).await?;
                trigger
            }
        };
        debug!(process_id = %ctx.process_id(), ?trigger, "payment due");
        // Stop listening; a check-in from here on has no effect.
        drop(ctx.signal_channel(CHECK_IN_SIGNAL).await);

        ctx.transition(PaymentState::Paying).await?;
        let result: PaymentResult = ctx
            .invoke(PAY_HOTEL_STEP, self.activity_timeout, || {
                self.activities.pay_hotel(request.clone())
            })
            .await
            .map_err(|e| {
                error!(process_id = %ctx.process_id(), error = %e, "error paying hotel");
                BookingError::PaymentFailed(e)
            })?;

        info!(
            process_id = %ctx.process_id(),
            transaction_id = %result.transaction_id,
            "hotel successfully paid"
        );
        Ok(result)
    }

    /// Sleeps until `payment_date` unless a check-in signal arrives first.
    async fn wait_for_payment_date(
        &self,
        ctx: &ProcessContext,
        payment_date: DateTime<Utc>,
    ) -> Result<PaymentTrigger> {
        ctx.transition(PaymentState::Waiting {
            until: payment_date,
        })
        .await?;

        let delay = (payment_date - ctx.now()).to_std().unwrap_or(Duration::ZERO);
        info!(process_id = %ctx.process_id(), %payment_date, ?delay, "delaying payment");
        if delay.is_zero() {
            return Ok(PaymentTrigger::PaymentDateReached);
        }

        let (timer, canceller) = ctx.start_timer(delay);
        let mut inbox = ctx.signal_channel(CHECK_IN_SIGNAL).await;

        let timer_elapsed = async move { WaitCondition::Timer(timer.wait().await) }.boxed();
        let signal_received = async move {
            inbox.receive().await;
            WaitCondition::SignalReceived
        }
        .boxed();

        let (winner, losers) = wait_first(timer_elapsed, vec![signal_received]).await;
        match winner {
            WaitCondition::SignalReceived => {
                info!(process_id = %ctx.process_id(), "check in received - cancelling timer");
                canceller.cancel();
                // Only the timer is left and it resolves as soon as it sees the cancellation.
                for loser in losers {
                    let outcome = loser.await;
                    debug!(process_id = %ctx.process_id(), ?outcome, "timer stopped");
                }
                Ok(PaymentTrigger::CheckedIn)
            }
            WaitCondition::Timer(outcome) => {
                debug!(process_id = %ctx.process_id(), ?outcome, "payment date reached");
                Ok(PaymentTrigger::PaymentDateReached)
            }
        }
    }
}
