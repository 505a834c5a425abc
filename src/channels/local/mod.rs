pub mod session;

pub use session::{is_chat_exit_command, parse_chat_line, render_screen};

use super::{ChannelError, Screen, Transport};
use crate::notify::Notifier;
use crate::orders::MediaItem;
use crate::shared::{ChatId, MessageId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEvent {
    Screen {
        chat: ChatId,
        message: MessageId,
        edited: bool,
        screen: Screen,
    },
    Deleted {
        chat: ChatId,
        message: MessageId,
    },
    Media {
        chat: ChatId,
        messages: Vec<MessageId>,
        items: Vec<MediaItem>,
    },
    Notification {
        chat: ChatId,
        text: String,
    },
}

#[derive(Debug, Default)]
struct LocalState {
    events: Vec<LocalEvent>,
    live_messages: BTreeMap<ChatId, BTreeSet<MessageId>>,
    failing_recipients: BTreeSet<ChatId>,
}

/// In-process transport and notifier that records everything it is asked
/// to deliver. Backs the `chat` CLI mode and the integration tests.
#[derive(Debug, Default)]
pub struct LocalTransport {
    next_message_id: AtomicI64,
    state: Mutex<LocalState>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn allocate(&self) -> MessageId {
        MessageId::new(self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Makes every later notification to `chat` fail.
    pub fn fail_deliveries_to(&self, chat: ChatId) {
        self.state().failing_recipients.insert(chat);
    }

    pub fn events(&self) -> Vec<LocalEvent> {
        self.state().events.clone()
    }

    pub fn screens_for(&self, chat: ChatId) -> Vec<Screen> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                LocalEvent::Screen {
                    chat: target,
                    screen,
                    ..
                } if *target == chat => Some(screen.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_screen(&self, chat: ChatId) -> Option<Screen> {
        self.screens_for(chat).pop()
    }

    pub fn notifications_for(&self, chat: ChatId) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                LocalEvent::Notification { chat: target, text } if *target == chat => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn deleted_for(&self, chat: ChatId) -> Vec<MessageId> {
        self.state()
            .events
            .iter()
            .filter_map(|event| match event {
                LocalEvent::Deleted {
                    chat: target,
                    message,
                } if *target == chat => Some(*message),
                _ => None,
            })
            .collect()
    }
}

impl Transport for LocalTransport {
    fn send_or_edit_screen(
        &self,
        chat: ChatId,
        current: Option<MessageId>,
        screen: &Screen,
    ) -> Result<MessageId, ChannelError> {
        let editable = current.filter(|id| {
            self.state()
                .live_messages
                .get(&chat)
                .is_some_and(|live| live.contains(id))
        });
        let (message, edited) = match editable {
            Some(id) => (id, true),
            None => (self.allocate(), false),
        };
        let mut state = self.state();
        state.live_messages.entry(chat).or_default().insert(message);
        state.events.push(LocalEvent::Screen {
            chat,
            message,
            edited,
            screen: screen.clone(),
        });
        Ok(message)
    }

    fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<(), ChannelError> {
        let mut state = self.state();
        if let Some(live) = state.live_messages.get_mut(&chat) {
            live.remove(&message);
        }
        state.events.push(LocalEvent::Deleted { chat, message });
        Ok(())
    }

    fn send_media(
        &self,
        chat: ChatId,
        media: &[MediaItem],
    ) -> Result<Vec<MessageId>, ChannelError> {
        let messages: Vec<MessageId> = media.iter().map(|_| self.allocate()).collect();
        let mut state = self.state();
        state
            .live_messages
            .entry(chat)
            .or_default()
            .extend(messages.iter().copied());
        state.events.push(LocalEvent::Media {
            chat,
            messages: messages.clone(),
            items: media.to_vec(),
        });
        Ok(messages)
    }
}

impl Notifier for LocalTransport {
    fn notify(&self, recipient: ChatId, text: &str) -> Result<(), ChannelError> {
        let mut state = self.state();
        if state.failing_recipients.contains(&recipient) {
            return Err(ChannelError::Delivery {
                recipient,
                message: "recipient marked as failing".to_string(),
            });
        }
        state.events.push(LocalEvent::Notification {
            chat: recipient,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_in_place_only_for_live_messages() {
        let transport = LocalTransport::new();
        let chat = ChatId::new(5);
        let first = transport
            .send_or_edit_screen(chat, None, &Screen::new("one"))
            .expect("send");
        let edited = transport
            .send_or_edit_screen(chat, Some(first), &Screen::new("two"))
            .expect("edit");
        assert_eq!(first, edited);

        transport.delete_message(chat, first).expect("delete");
        let replacement = transport
            .send_or_edit_screen(chat, Some(first), &Screen::new("three"))
            .expect("send after delete");
        assert_ne!(replacement, first);
        assert_eq!(transport.screens_for(chat).len(), 3);
    }

    #[test]
    fn failing_recipients_reject_notifications() {
        let transport = LocalTransport::new();
        transport.fail_deliveries_to(ChatId::new(9));
        assert!(transport.notify(ChatId::new(9), "hello").is_err());
        transport.notify(ChatId::new(10), "hello").expect("deliver");
        assert_eq!(transport.notifications_for(ChatId::new(10)), vec!["hello"]);
    }
}
