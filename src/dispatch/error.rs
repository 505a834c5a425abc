use super::token::TokenError;
use crate::channels::ChannelError;
use crate::orders::{LifecycleError, RepositoryError, Role};
use crate::payments::PaymentError;
use crate::shared::{ErrorClass, OrderId, StateError};

/// Why a unit of work could not complete. Every variant resolves to a
/// rendered screen; none is fatal.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("{0}")]
    Format(String),
    #[error("{role} may not use `{command}`")]
    Denied { command: &'static str, role: Role },
    #[error("order {order_id} is not available to this chat")]
    NotYourOrder { order_id: OrderId },
    #[error("{0}")]
    Stale(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Session(#[from] StateError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl FlowError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Token(_) | Self::Format(_) => ErrorClass::Format,
            Self::Denied { .. } | Self::NotYourOrder { .. } => ErrorClass::Authorization,
            Self::Stale(_) => ErrorClass::Consistency,
            Self::Lifecycle(err) => err.class(),
            Self::Repository(err) if err.is_consistency() => ErrorClass::Consistency,
            Self::Repository(_)
            | Self::Session(_)
            | Self::Channel(_)
            | Self::Payment(_) => ErrorClass::Infrastructure,
        }
    }

    /// Text shown to the actor. Infrastructure details stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Token(TokenError::Unknown { .. }) => {
                "Unknown command. Please use the menu buttons.".to_string()
            }
            Self::Token(_) => "That button looks malformed. Please try again from the menu."
                .to_string(),
            Self::Format(message) => message.clone(),
            Self::Denied { .. } | Self::NotYourOrder { .. } => {
                "Access denied: you cannot perform this action.".to_string()
            }
            Self::Stale(message) => message.clone(),
            Self::Lifecycle(err) => match err {
                LifecycleError::Invalid(message) => message.clone(),
                LifecycleError::Unauthorized { .. } => {
                    "Access denied: you cannot perform this action.".to_string()
                }
                LifecycleError::InvalidTransition { status, .. } => format!(
                    "This action is no longer available: the order is {}.",
                    status.label().to_lowercase()
                ),
                LifecycleError::Precondition { message, .. } => {
                    format!("This action is not possible: {message}.")
                }
                LifecycleError::Repository(RepositoryError::OrderNotFound { order_id }) => {
                    format!("Order #{order_id} was not found.")
                }
                LifecycleError::Repository(_) => GENERIC_FAILURE.to_string(),
            },
            Self::Repository(RepositoryError::OrderNotFound { order_id }) => {
                format!("Order #{order_id} was not found.")
            }
            Self::Repository(RepositoryError::Precondition { message, .. }) => {
                format!("This action is not possible: {message}.")
            }
            Self::Repository(RepositoryError::UserNotFound { .. }) => {
                "That user is not registered with the bot.".to_string()
            }
            Self::Repository(_) | Self::Session(_) | Self::Channel(_) | Self::Payment(_) => {
                GENERIC_FAILURE.to_string()
            }
        }
    }
}

pub const GENERIC_FAILURE: &str = "Something went wrong on our side. Please try again later.";
