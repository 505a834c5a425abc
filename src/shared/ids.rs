use serde::{Deserialize, Serialize};

macro_rules! define_numeric_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn parse(raw: &str) -> Result<Self, String> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(format!("{} must be non-empty", $kind));
                }
                trimmed
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| format!("{} must be an integer, got `{}`", $kind, trimmed))
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

define_numeric_id!(ChatId, "chat id");
define_numeric_id!(MessageId, "message id");
define_numeric_id!(OrderId, "order id");

impl OrderId {
    /// Parses an order id that must reference a persisted order.
    pub fn parse_persisted(raw: &str) -> Result<Self, String> {
        let id = Self::parse(raw)?;
        if id.get() <= 0 {
            return Err(format!("order id must be positive, got `{id}`"));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_trimmed_integers() {
        assert_eq!(ChatId::parse(" 42 ").expect("chat id"), ChatId::new(42));
        assert_eq!(ChatId::parse("-100200").expect("group id").get(), -100200);
        assert!(MessageId::parse("").is_err());
        assert!(MessageId::parse("abc").is_err());
    }

    #[test]
    fn persisted_order_ids_must_be_positive() {
        assert_eq!(OrderId::parse_persisted("7").expect("id"), OrderId::new(7));
        assert!(OrderId::parse_persisted("0").is_err());
        assert!(OrderId::parse_persisted("-3").is_err());
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let encoded = serde_json::to_string(&OrderId::new(15)).expect("encode");
        assert_eq!(encoded, "15");
        let decoded: ChatId = serde_json::from_str("99").expect("decode");
        assert_eq!(decoded, ChatId::new(99));
    }
}
