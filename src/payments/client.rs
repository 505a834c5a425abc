use super::{PaymentError, PaymentGateway, PaymentLinkRequest};
use crate::config::PaymentsConfig;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Payment-link client for a REST gateway that accepts a JSON payment
/// object and answers with a redirect confirmation URL.
#[derive(Debug, Clone)]
pub struct HttpPaymentClient {
    api_base: String,
    shop_id: String,
    secret_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    #[serde(default)]
    confirmation: Option<Confirmation>,
}

#[derive(Debug, Deserialize)]
struct Confirmation {
    #[serde(default)]
    confirmation_url: Option<String>,
}

impl HttpPaymentClient {
    pub fn from_config(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        if !config.enabled {
            return Err(PaymentError::Disabled);
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build();
        Ok(Self {
            api_base: config.api_base.clone(),
            shop_id: config.shop_id.clone(),
            secret_key: config.secret_key.clone(),
            agent,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}

impl PaymentGateway for HttpPaymentClient {
    fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, PaymentError> {
        let response = self
            .agent
            .post(&self.endpoint("payments"))
            .set("Authorization", &format!("Bearer {}", self.secret_key))
            .set("X-Shop-Id", &self.shop_id)
            .set("Idempotence-Key", &idempotence_key(&self.shop_id, request))
            .send_json(payment_body(request))
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let parsed: PaymentResponse = response
            .into_json()
            .map_err(|e| PaymentError::Response(e.to_string()))?;
        parsed
            .confirmation
            .and_then(|c| c.confirmation_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PaymentError::Response("missing confirmation_url".to_string()))
    }
}

pub fn payment_body(request: &PaymentLinkRequest) -> Value {
    let mut body = json!({
        "amount": {
            "value": format!("{:.2}", request.amount),
            "currency": request.currency,
        },
        "capture": true,
        "confirmation": {
            "type": "redirect",
            "return_url": request.return_url,
        },
        "description": request.description,
        "metadata": {
            "order_id": request.order_id.to_string(),
        },
    });
    if let Some(phone) = &request.customer_phone {
        body["receipt"] = json!({ "customer": { "phone": phone.trim_start_matches('+') } });
    }
    body
}

/// Same order and amount always yield the same key, so a retried request
/// does not open a second payment.
pub fn idempotence_key(shop_id: &str, request: &PaymentLinkRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(shop_id.as_bytes());
    hasher.update([0]);
    hasher.update(request.order_id.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(format!("{:.2}", request.amount).as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::OrderId;

    fn request(amount: f64) -> PaymentLinkRequest {
        PaymentLinkRequest {
            order_id: OrderId::new(12),
            amount,
            currency: "RUB".to_string(),
            description: "Order #12".to_string(),
            return_url: "https://t.me/haulbot".to_string(),
            customer_phone: Some("+79991234567".to_string()),
        }
    }

    #[test]
    fn body_carries_order_metadata_and_amount() {
        let body = payment_body(&request(1500.0));
        assert_eq!(body["amount"]["value"], "1500.00");
        assert_eq!(body["amount"]["currency"], "RUB");
        assert_eq!(body["metadata"]["order_id"], "12");
        assert_eq!(body["confirmation"]["type"], "redirect");
        assert_eq!(body["receipt"]["customer"]["phone"], "79991234567");
    }

    #[test]
    fn idempotence_key_is_stable_per_order_and_amount() {
        let first = idempotence_key("shop", &request(1500.0));
        assert_eq!(first, idempotence_key("shop", &request(1500.0)));
        assert_ne!(first, idempotence_key("shop", &request(1600.0)));
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn disabled_config_has_no_client() {
        let config = PaymentsConfig::default();
        assert!(matches!(
            HttpPaymentClient::from_config(&config),
            Err(PaymentError::Disabled)
        ));
    }
}
