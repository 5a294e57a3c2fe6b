use super::booking::{BookingRequest, CardDetails, ReservationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the payment process needs, owned by it for its whole lifetime.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub booking_id: String,
    pub card_details: CardDetails,
    pub total_cost_in_pence: u32,
    pub payment_date: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn for_booking(request: &BookingRequest, reservation: &ReservationResult) -> Self {
        Self {
            booking_id: reservation.booking_id.clone(),
            card_details: request.card_details.clone(),
            total_cost_in_pence: request.total_cost_in_pence,
            payment_date: request.payment_date(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub transaction_id: String,
}

/// Why the payment process stopped waiting.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTrigger {
    /// The payment date was reached (or had already passed).
    PaymentDateReached,
    /// The guest checked in before the payment date.
    CheckedIn,
}
