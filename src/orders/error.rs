use super::model::OrderStatus;
use crate::shared::{ChatId, OrderId};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("sqlite open failed at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create order database parent {path}: {source}")]
    CreateParent {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite statement failed: {source}")]
    Sql {
        #[source]
        source: rusqlite::Error,
    },
    #[error("order {order_id} not found")]
    OrderNotFound { order_id: OrderId },
    #[error("user {chat_id} not found")]
    UserNotFound { chat_id: ChatId },
    #[error("order {order_id} is {actual}, expected one of: {expected}")]
    StatusConflict {
        order_id: OrderId,
        expected: String,
        actual: OrderStatus,
    },
    #[error("order {order_id}: {message}")]
    Precondition { order_id: OrderId, message: String },
    #[error("invalid {column} `{value}` in database: {message}")]
    InvalidColumn {
        column: &'static str,
        value: String,
        message: String,
    },
    #[error("failed to encode {column}: {source}")]
    Encode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl RepositoryError {
    pub(crate) fn sql(source: rusqlite::Error) -> Self {
        Self::Sql { source }
    }

    /// True when the error reflects order state rather than infrastructure.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::OrderNotFound { .. }
                | Self::UserNotFound { .. }
                | Self::StatusConflict { .. }
                | Self::Precondition { .. }
        )
    }
}
