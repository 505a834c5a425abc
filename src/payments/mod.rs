pub mod client;
pub mod webhook;

pub use client::HttpPaymentClient;
pub use webhook::{parse_payment_event, PaymentEvent, PAYMENT_SUCCEEDED};

use crate::shared::OrderId;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("online payments are disabled")]
    Disabled,
    #[error("payment api request failed: {0}")]
    Request(String),
    #[error("payment api returned an unusable response: {0}")]
    Response(String),
    #[error("invalid payment notification: {0}")]
    Webhook(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLinkRequest {
    pub order_id: OrderId,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub return_url: String,
    pub customer_phone: Option<String>,
}

pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted payment page for the order and returns its URL.
    fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, PaymentError>;
}
