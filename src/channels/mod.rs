use crate::orders::MediaItem;
use crate::shared::{ChatId, MessageId};

pub mod local;
pub mod screen;
pub mod telegram;

pub use screen::{Button, ButtonAction, Screen};

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("chat api request failed: {0}")]
    ApiRequest(String),
    #[error("chat api returned error: {0}")]
    ApiResponse(String),
    #[error("delivery to chat {recipient} failed: {message}")]
    Delivery { recipient: ChatId, message: String },
}

/// One interaction received from the chat platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub chat: ChatId,
    pub first_name: Option<String>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    Start,
    /// A pressed button. `message` is the message carrying the keyboard.
    Token {
        token: String,
        message: Option<MessageId>,
    },
    Text(String),
    Location { latitude: f64, longitude: f64 },
    Media(MediaItem),
}

/// Outbound side of the chat platform.
pub trait Transport: Send + Sync {
    /// Shows `screen`, editing `current` in place when possible. Returns the
    /// id of the message that now holds the screen.
    fn send_or_edit_screen(
        &self,
        chat: ChatId,
        current: Option<MessageId>,
        screen: &Screen,
    ) -> Result<MessageId, ChannelError>;

    fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<(), ChannelError>;

    fn send_media(&self, chat: ChatId, media: &[MediaItem])
        -> Result<Vec<MessageId>, ChannelError>;
}
