//! HTTP client for the booking service and its payment initiation endpoint

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::booking::payment::{
    BookingGateway, BookingPayload, BookingReceipt, GatewayError, PaymentInitiation,
    PaymentRedirect,
};

/// Envelope used by the booking service: `{ success, result, message }`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct HttpBookingGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookingGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<Result<T, String>, GatewayError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let envelope: Envelope<T> = response.json().await?;
        Ok(unwrap_envelope(status.as_u16(), envelope))
    }
}

fn unwrap_envelope<T>(status: u16, envelope: Envelope<T>) -> Result<T, String> {
    match (envelope.success, envelope.result) {
        (true, Some(result)) => Ok(result),
        _ if envelope.message.trim().is_empty() => Err(format!("status {}", status)),
        _ => Err(envelope.message),
    }
}

#[async_trait]
impl BookingGateway for HttpBookingGateway {
    async fn create_booking(&self, payload: &BookingPayload) -> Result<BookingReceipt, GatewayError> {
        self.post("/bookings", payload)
            .await?
            .map_err(GatewayError::BookingRejected)
    }

    async fn initiate_payment(
        &self,
        booking_id: &str,
        amount: Decimal,
    ) -> Result<PaymentRedirect, GatewayError> {
        let body = PaymentInitiation { booking_id, amount };
        self.post("/payments/initiate", &body)
            .await?
            .map_err(GatewayError::PaymentRejected)
    }
}
