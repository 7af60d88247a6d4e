//! Booking and payment gateway boundary.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Participant;

/// Booking hand-off sent to the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub event_id: Uuid,
    pub category_id: Uuid,
    /// Directory ids of verified members
    pub participants: Vec<String>,
    pub non_member_participants: Vec<Participant>,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_paid: Decimal,
}

/// Booking created by the gateway, awaiting payment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub booking_id: String,
}

/// Redirect triple to post to the payment page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRedirect {
    pub access_code: String,
    pub encrypted_data: String,
    pub order_id: String,
}

/// Payment initiation request for a created booking
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation<'a> {
    pub booking_id: &'a str,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Booking could not be created: {0}")]
    BookingRejected(String),

    #[error("Payment could not be initiated: {0}")]
    PaymentRejected(String),

    #[error("Booking service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Creates bookings and starts payments
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn create_booking(&self, payload: &BookingPayload) -> Result<BookingReceipt, GatewayError>;

    async fn initiate_payment(
        &self,
        booking_id: &str,
        amount: Decimal,
    ) -> Result<PaymentRedirect, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, MembershipStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn test_payload_json_shape() {
        let payload = BookingPayload {
            event_id: Uuid::nil(),
            category_id: Uuid::nil(),
            participants: vec!["P-1".to_string()],
            non_member_participants: vec![Participant {
                id: None,
                name: "Guest".to_string(),
                email: String::new(),
                mobile: String::new(),
                gender: Gender::Male,
                date_of_birth: Some("2001-01-01".to_string()),
                membership_status: MembershipStatus::NonMember,
            }],
            amount_paid: dec!(800),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["amountPaid"], "800");
        assert_eq!(json["participants"][0], "P-1");
        assert_eq!(json["nonMemberParticipants"][0]["name"], "Guest");
        assert!(json["nonMemberParticipants"][0].get("id").is_none());
    }

    #[test]
    fn test_redirect_json_shape() {
        let json = serde_json::json!({
            "accessCode": "AVXX01",
            "encryptedData": "deadbeef",
            "orderId": "ORD-1"
        });
        let redirect: PaymentRedirect = serde_json::from_value(json).unwrap();
        assert_eq!(redirect.order_id, "ORD-1");
    }
}
