use super::PaymentError;
use crate::shared::OrderId;
use serde::Deserialize;

pub const PAYMENT_SUCCEEDED: &str = "payment.succeeded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Succeeded { order_id: OrderId },
    /// Any other event type; acknowledged and otherwise ignored.
    Other { event: String },
}

#[derive(Debug, Deserialize)]
struct Notification {
    event: String,
    #[serde(default)]
    object: Option<NotificationObject>,
}

#[derive(Debug, Deserialize)]
struct NotificationObject {
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(default)]
    order_id: Option<serde_json::Value>,
}

pub fn parse_payment_event(body: &str) -> Result<PaymentEvent, PaymentError> {
    let notification: Notification =
        serde_json::from_str(body).map_err(|e| PaymentError::Webhook(e.to_string()))?;
    if notification.event != PAYMENT_SUCCEEDED {
        return Ok(PaymentEvent::Other {
            event: notification.event,
        });
    }

    let raw = notification
        .object
        .and_then(|object| object.metadata)
        .and_then(|metadata| metadata.order_id)
        .ok_or_else(|| PaymentError::Webhook("missing object.metadata.order_id".to_string()))?;
    let raw = match raw {
        serde_json::Value::String(value) => value,
        serde_json::Value::Number(value) => value.to_string(),
        other => {
            return Err(PaymentError::Webhook(format!(
                "order_id must be a string or number, got {other}"
            )))
        }
    };
    let order_id = OrderId::parse_persisted(&raw).map_err(PaymentError::Webhook)?;
    Ok(PaymentEvent::Succeeded { order_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_order_id_from_metadata() {
        let body = r#"{"event":"payment.succeeded","object":{"id":"p-1","metadata":{"order_id":"12"}}}"#;
        assert_eq!(
            parse_payment_event(body).expect("parse"),
            PaymentEvent::Succeeded {
                order_id: OrderId::new(12)
            }
        );
        let numeric = r#"{"event":"payment.succeeded","object":{"metadata":{"order_id":7}}}"#;
        assert_eq!(
            parse_payment_event(numeric).expect("parse"),
            PaymentEvent::Succeeded {
                order_id: OrderId::new(7)
            }
        );
    }

    #[test]
    fn other_events_are_passed_through() {
        let body = r#"{"event":"payment.canceled","object":{}}"#;
        assert_eq!(
            parse_payment_event(body).expect("parse"),
            PaymentEvent::Other {
                event: "payment.canceled".to_string()
            }
        );
    }

    #[test]
    fn malformed_notifications_are_rejected() {
        assert!(parse_payment_event("not json").is_err());
        assert!(parse_payment_event(r#"{"event":"payment.succeeded","object":{}}"#).is_err());
        assert!(parse_payment_event(
            r#"{"event":"payment.succeeded","object":{"metadata":{"order_id":"x"}}}"#
        )
        .is_err());
    }
}
