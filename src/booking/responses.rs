//! Response DTOs for booking API endpoints.

use rust_decimal::Decimal;
use serde::Serialize;

use super::calculators::PaymentBlocker;
use super::session::BookingSnapshot;

/// Money value for JSON responses
#[derive(Debug, Clone, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

/// Response for a stateless quote
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub total: MoneyResponse,
    pub blockers: Vec<PaymentBlocker>,
    pub can_pay: bool,
}

/// Response carrying the current state of a booking session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub snapshot: BookingSnapshot,
    pub total: MoneyResponse,
}

/// Payment redirect for clients that build the form themselves
#[derive(Debug, Serialize)]
pub struct PaymentRedirectResponse {
    pub payment_url: String,
    pub access_code: String,
    pub encrypted_data: String,
    pub order_id: String,
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
}
