use crate::channels::{Inbound, InboundKind};
use crate::orders::{MediaItem, MediaKind};
use crate::shared::{ChatId, MessageId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub chat: TgChat,
    #[serde(default)]
    pub from: Option<TgUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub location: Option<TgLocation>,
    #[serde(default)]
    pub photo: Vec<TgPhotoSize>,
    #[serde(default)]
    pub video: Option<TgVideo>,
    #[serde(default)]
    pub media_group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgCallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<TgMessage>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgPhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgVideo {
    pub file_id: String,
}

impl TgUpdate {
    /// Chat the update belongs to, used to keep per-chat ordering.
    pub fn chat(&self) -> Option<ChatId> {
        if let Some(message) = &self.message {
            return Some(ChatId::new(message.chat.id));
        }
        self.callback_query.as_ref().map(|query| {
            query
                .message
                .as_ref()
                .map(|message| ChatId::new(message.chat.id))
                .unwrap_or(ChatId::new(query.from.id))
        })
    }
}

/// Translates a raw update into a platform-neutral interaction. Updates the
/// bot has no use for (stickers, edits, service messages) map to `None`.
pub fn to_inbound(update: &TgUpdate) -> Option<Inbound> {
    if let Some(query) = &update.callback_query {
        let token = query.data.clone()?;
        let chat = update.chat()?;
        return Some(Inbound {
            chat,
            first_name: query.from.first_name.clone(),
            kind: InboundKind::Token {
                token,
                message: query
                    .message
                    .as_ref()
                    .map(|message| MessageId::new(message.message_id)),
            },
        });
    }

    let message = update.message.as_ref()?;
    let kind = message_kind(message)?;
    Some(Inbound {
        chat: ChatId::new(message.chat.id),
        first_name: message.from.as_ref().and_then(|u| u.first_name.clone()),
        kind,
    })
}

fn message_kind(message: &TgMessage) -> Option<InboundKind> {
    if let Some(location) = &message.location {
        return Some(InboundKind::Location {
            latitude: location.latitude,
            longitude: location.longitude,
        });
    }
    if let Some(photo) = message
        .photo
        .iter()
        .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
    {
        return Some(InboundKind::Media(MediaItem {
            kind: MediaKind::Photo,
            file_id: photo.file_id.clone(),
            group_id: message.media_group_id.clone(),
        }));
    }
    if let Some(video) = &message.video {
        return Some(InboundKind::Media(MediaItem {
            kind: MediaKind::Video,
            file_id: video.file_id.clone(),
            group_id: message.media_group_id.clone(),
        }));
    }
    let text = message.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    if text == "/start" || text.starts_with("/start ") {
        return Some(InboundKind::Start);
    }
    Some(InboundKind::Text(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> TgUpdate {
        serde_json::from_str(raw).expect("parse update")
    }

    #[test]
    fn start_command_maps_to_start() {
        let update = parse(
            r#"{"update_id":1,"message":{"message_id":5,"chat":{"id":77},"from":{"id":77,"first_name":"Ann"},"text":"/start"}}"#,
        );
        let inbound = to_inbound(&update).expect("inbound");
        assert_eq!(inbound.chat, ChatId::new(77));
        assert_eq!(inbound.first_name.as_deref(), Some("Ann"));
        assert_eq!(inbound.kind, InboundKind::Start);
    }

    #[test]
    fn callback_carries_token_and_keyboard_message() {
        let update = parse(
            r#"{"update_id":2,"callback_query":{"id":"cb1","from":{"id":77},"data":"view_order_4","message":{"message_id":31,"chat":{"id":77}}}}"#,
        );
        let inbound = to_inbound(&update).expect("inbound");
        assert_eq!(
            inbound.kind,
            InboundKind::Token {
                token: "view_order_4".to_string(),
                message: Some(MessageId::new(31)),
            }
        );
    }

    #[test]
    fn photo_picks_largest_size_and_keeps_album_id() {
        let update = parse(
            r#"{"update_id":3,"message":{"message_id":6,"chat":{"id":77},"media_group_id":"g1","photo":[
                {"file_id":"small","width":90,"height":90},
                {"file_id":"large","width":1280,"height":960}]}}"#,
        );
        match to_inbound(&update).expect("inbound").kind {
            InboundKind::Media(item) => {
                assert_eq!(item.kind, MediaKind::Photo);
                assert_eq!(item.file_id, "large");
                assert_eq!(item.group_id.as_deref(), Some("g1"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn location_and_plain_text_are_recognized() {
        let update = parse(
            r#"{"update_id":4,"message":{"message_id":7,"chat":{"id":77},"location":{"latitude":55.75,"longitude":37.61}}}"#,
        );
        assert!(matches!(
            to_inbound(&update).expect("inbound").kind,
            InboundKind::Location { .. }
        ));

        let update = parse(
            r#"{"update_id":5,"message":{"message_id":8,"chat":{"id":77},"text":"  Ivan  "}}"#,
        );
        assert_eq!(
            to_inbound(&update).expect("inbound").kind,
            InboundKind::Text("Ivan".to_string())
        );
    }

    #[test]
    fn unsupported_updates_are_ignored() {
        let update = parse(r#"{"update_id":6,"message":{"message_id":9,"chat":{"id":77}}}"#);
        assert!(to_inbound(&update).is_none());
        let update = parse(r#"{"update_id":7}"#);
        assert!(to_inbound(&update).is_none());
    }
}
