use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card used to pay for a booking.
///
/// Forwarded verbatim to the payment task. The `Debug` output is redacted so
/// the details can't end up in logs.
#[derive(Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub number: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub security_code: u32,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CardDetails([redacted])")
    }
}

/// A request to book a hotel room, submitted once by the caller.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Nominal identifier of the hotel.
    pub hotel_id: String,
    /// Total cost in pence.
    pub total_cost_in_pence: u32,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
    /// When set, no pre-payment is taken and the card is charged at check-in.
    pub pay_on_check_in: bool,
    /// Only meaningful when `pay_on_check_in` is false. The caller guarantees it
    /// lies between the booking time and the check-in date.
    pub pre_payment_date: DateTime<Utc>,
    pub card_details: CardDetails,
}

impl BookingRequest {
    /// The moment payment is due for this booking.
    pub fn payment_date(&self) -> DateTime<Utc> {
        if self.pay_on_check_in {
            self.check_in_date
        } else {
            self.pre_payment_date
        }
    }
}

/// Input of the reservation task.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub hotel_id: String,
    pub check_in_date: DateTime<Utc>,
    pub check_out_date: DateTime<Utc>,
}

impl From<&BookingRequest> for ReservationRequest {
    fn from(request: &BookingRequest) -> Self {
        Self {
            hotel_id: request.hotel_id.clone(),
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResult {
    pub booking_id: String,
}

/// What the caller gets back once the room is reserved and payment scheduled.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingResult {
    pub booking_id: String,
    pub hotel_id: String,
    pub payment_date: DateTime<Utc>,
}
