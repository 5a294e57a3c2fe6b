//! Application layer containing the booking and payment orchestrators.
//!
//! `BookingWorkflow` reserves the room and spawns a detached payment process;
//! `PaymentWorkflow` races the payment-date timer against the check-in signal
//! before charging the card. Both run inside a `ProcessContext` provided by the
//! runtime and reach the hotel only through the `HotelActivities` port.

pub mod booking;
pub mod payment;
