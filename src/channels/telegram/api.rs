use super::updates::{TgMessage, TgUpdate};
use crate::channels::{ButtonAction, ChannelError, Screen, Transport};
use crate::config::TelegramConfig;
use crate::notify::Notifier;
use crate::orders::{MediaItem, MediaKind};
use crate::shared::{ChatId, MessageId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Telegram caps albums at ten items.
const MEDIA_GROUP_LIMIT: usize = 10;

#[derive(Debug, Clone, Deserialize)]
struct TgEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// Blocking Bot API client. Serves as the transport, the notifier and the
/// update source for the poller.
#[derive(Clone)]
pub struct TelegramApiClient {
    api_base: String,
    bot_token: String,
    agent: ureq::Agent,
    poll_timeout_secs: u64,
}

impl std::fmt::Debug for TelegramApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApiClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramApiClient {
    pub fn new(config: &TelegramConfig) -> Self {
        // Long polls hold the connection for the poll timeout, so the read
        // timeout has to outlast it.
        let read_timeout = config.request_timeout_secs + config.poll_timeout_secs;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.request_timeout_secs))
            .timeout_read(Duration::from_secs(read_timeout))
            .build();
        Self {
            api_base: config.api_base.clone(),
            bot_token: config.bot_token.trim().to_string(),
            agent,
            poll_timeout_secs: config.poll_timeout_secs,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }

    fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, ChannelError> {
        let mut url = self.endpoint(method);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }
        unwrap_envelope(method, self.agent.get(&url).call())
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, ChannelError> {
        unwrap_envelope(method, self.agent.post(&self.endpoint(method)).send_json(body))
    }

    pub fn get_updates(&self, offset: Option<i64>) -> Result<Vec<TgUpdate>, ChannelError> {
        let mut query = vec![
            ("timeout", self.poll_timeout_secs.to_string()),
            (
                "allowed_updates",
                r#"["message","callback_query"]"#.to_string(),
            ),
        ];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        self.get("getUpdates", &query)
    }

    pub fn answer_callback_query(&self, callback_id: &str) -> Result<(), ChannelError> {
        let _: bool = self.call(
            "answerCallbackQuery",
            json!({ "callback_query_id": callback_id }),
        )?;
        Ok(())
    }

    fn send_message(&self, chat: ChatId, screen: &Screen) -> Result<MessageId, ChannelError> {
        let mut body = json!({ "chat_id": chat.get(), "text": screen.text });
        if !screen.keyboard.is_empty() {
            body["reply_markup"] = reply_markup(screen);
        }
        let message: TgMessage = self.call("sendMessage", body)?;
        Ok(MessageId::new(message.message_id))
    }

    fn edit_message(
        &self,
        chat: ChatId,
        message: MessageId,
        screen: &Screen,
    ) -> Result<(), ChannelError> {
        let body = json!({
            "chat_id": chat.get(),
            "message_id": message.get(),
            "text": screen.text,
            "reply_markup": reply_markup(screen),
        });
        match self.call::<Value>("editMessageText", body) {
            Ok(_) => Ok(()),
            Err(ChannelError::ApiResponse(description))
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn send_single_media(&self, chat: ChatId, item: &MediaItem) -> Result<MessageId, ChannelError> {
        let (method, field) = match item.kind {
            MediaKind::Photo => ("sendPhoto", "photo"),
            MediaKind::Video => ("sendVideo", "video"),
        };
        let mut body = json!({ "chat_id": chat.get() });
        body[field] = json!(item.file_id);
        let message: TgMessage = self.call(method, body)?;
        Ok(MessageId::new(message.message_id))
    }
}

fn unwrap_envelope<T: DeserializeOwned>(
    method: &str,
    response: Result<ureq::Response, ureq::Error>,
) -> Result<T, ChannelError> {
    // Bot API errors come back as 4xx with the usual envelope.
    let response = match response {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(err) => return Err(ChannelError::ApiRequest(err.to_string())),
    };
    let envelope: TgEnvelope<T> = response
        .into_json()
        .map_err(|e| ChannelError::ApiRequest(e.to_string()))?;
    if !envelope.ok {
        return Err(ChannelError::ApiResponse(
            envelope
                .description
                .unwrap_or_else(|| format!("{method} failed")),
        ));
    }
    envelope
        .result
        .ok_or_else(|| ChannelError::ApiResponse(format!("{method} returned no result")))
}

fn reply_markup(screen: &Screen) -> Value {
    let rows: Vec<Vec<Value>> = screen
        .keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Token(token) => {
                        json!({ "text": button.label, "callback_data": token })
                    }
                    ButtonAction::Url(url) => json!({ "text": button.label, "url": url }),
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn media_group_item(item: &MediaItem) -> Value {
    let kind = match item.kind {
        MediaKind::Photo => "photo",
        MediaKind::Video => "video",
    };
    json!({ "type": kind, "media": item.file_id })
}

impl Transport for TelegramApiClient {
    fn send_or_edit_screen(
        &self,
        chat: ChatId,
        current: Option<MessageId>,
        screen: &Screen,
    ) -> Result<MessageId, ChannelError> {
        if let Some(message) = current {
            if self.edit_message(chat, message, screen).is_ok() {
                return Ok(message);
            }
        }
        self.send_message(chat, screen)
    }

    fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<(), ChannelError> {
        let _: bool = self.call(
            "deleteMessage",
            json!({ "chat_id": chat.get(), "message_id": message.get() }),
        )?;
        Ok(())
    }

    fn send_media(
        &self,
        chat: ChatId,
        media: &[MediaItem],
    ) -> Result<Vec<MessageId>, ChannelError> {
        let mut sent = Vec::with_capacity(media.len());
        for chunk in media.chunks(MEDIA_GROUP_LIMIT) {
            if let [single] = chunk {
                sent.push(self.send_single_media(chat, single)?);
                continue;
            }
            let items: Vec<Value> = chunk.iter().map(media_group_item).collect();
            let messages: Vec<TgMessage> = self.call(
                "sendMediaGroup",
                json!({ "chat_id": chat.get(), "media": items }),
            )?;
            sent.extend(messages.iter().map(|m| MessageId::new(m.message_id)));
        }
        Ok(sent)
    }
}

impl Notifier for TelegramApiClient {
    fn notify(&self, recipient: ChatId, text: &str) -> Result<(), ChannelError> {
        self.send_message(recipient, &Screen::new(text))
            .map(|_| ())
            .map_err(|err| ChannelError::Delivery {
                recipient,
                message: err.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Button;

    #[test]
    fn keyboard_maps_tokens_and_urls() {
        let screen = Screen::new("pick")
            .row(vec![
                Button::token("Yes", "confirm_order_3"),
                Button::url("Pay", "https://pay.example/3"),
            ]);
        let markup = reply_markup(&screen);
        assert_eq!(
            markup["inline_keyboard"][0][0]["callback_data"],
            "confirm_order_3"
        );
        assert_eq!(markup["inline_keyboard"][0][1]["url"], "https://pay.example/3");
    }

    #[test]
    fn endpoint_embeds_token() {
        let config = TelegramConfig {
            bot_token: " 123:abc ".to_string(),
            api_base: "https://api.telegram.org/".to_string(),
            ..TelegramConfig::default()
        };
        let client = TelegramApiClient::new(&config);
        assert_eq!(
            client.endpoint("getMe"),
            "https://api.telegram.org/bot123:abc/getMe"
        );
    }

    #[test]
    fn envelope_reports_description_on_failure() {
        let envelope: TgEnvelope<Value> = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .expect("parse");
        assert!(!envelope.ok);
        assert_eq!(
            envelope.description.as_deref(),
            Some("Bad Request: chat not found")
        );
        assert!(envelope.result.is_none());
    }

    #[test]
    fn envelope_decodes_results_without_default() {
        #[derive(Debug, Deserialize)]
        struct Sent {
            message_id: i64,
        }

        let envelope: TgEnvelope<Sent> =
            serde_json::from_str(r#"{"ok":true,"result":{"message_id":77}}"#).expect("parse");
        assert_eq!(envelope.result.map(|sent| sent.message_id), Some(77));

        let empty: TgEnvelope<Sent> = serde_json::from_str(r#"{"ok":true}"#).expect("parse");
        assert!(empty.result.is_none());
    }
}
