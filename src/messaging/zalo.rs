//! Zalo Bot API client and webhook payload types.

use crate::UserId;
use crate::config::ReplyConfig;
use crate::conversation::InboundEvent;
use crate::error::DeliveryError;
use crate::messaging::Messenger;

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Official Bot API base. The bot token is appended directly, Telegram
/// style: `https://bot-api.zapps.me/bot<token>/<method>`.
pub const BOT_API_BASE: &str = "https://bot-api.zapps.me/bot";

/// Name displayed when the sender carries no display name.
const FALLBACK_DISPLAY_NAME: &str = "Bạn";

/// Client for the Zalo Bot API.
#[derive(Clone)]
pub struct ZaloClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    reply: ReplyConfig,
}

impl ZaloClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>, reply: ReplyConfig) -> Self {
        Self {
            http,
            token: token.into(),
            base_url: BOT_API_BASE.into(),
            reply,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.base_url, self.token, method)
    }

    /// POST one Bot API method and validate the `ok` envelope.
    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, DeliveryError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|error| DeliveryError::Request(error.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|error| DeliveryError::Request(format!("invalid response body: {error}")))?;

        let ok = body.get("ok").and_then(serde_json::Value::as_bool);
        if !status.is_success() || ok == Some(false) {
            let message = body
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Send a text message, chunking replies that exceed the platform
    /// limit into sequential sends with a short delay in between.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let chunks = split_reply(text, self.reply.max_chars);
        let total = chunks.len();
        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(self.reply.chunk_delay_ms)).await;
            }
            self.call(
                "sendMessage",
                serde_json::json!({ "chat_id": chat_id, "text": chunk }),
            )
            .await?;
            if total > 1 {
                tracing::debug!(chat_id, chunk = index + 1, total, "sent reply chunk");
            }
        }
        Ok(())
    }

    /// Show the "typing" indicator in the chat.
    pub async fn send_chat_action(&self, chat_id: &str, action: &str) -> Result<(), DeliveryError> {
        self.call(
            "sendChatAction",
            serde_json::json!({ "chat_id": chat_id, "action": action }),
        )
        .await?;
        Ok(())
    }

    /// Register the webhook target and its shared secret.
    pub async fn set_webhook(&self, url: &str, secret_token: &str) -> Result<(), DeliveryError> {
        self.call(
            "setWebhook",
            serde_json::json!({ "url": url, "secret_token": secret_token }),
        )
        .await?;
        tracing::info!(%url, "webhook registered");
        Ok(())
    }

    /// Fetch the bot's own identity; used for token validation.
    pub async fn get_me(&self) -> Result<serde_json::Value, DeliveryError> {
        self.call("getMe", serde_json::json!({})).await
    }
}

#[async_trait::async_trait]
impl Messenger for ZaloClient {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.send_message(chat_id, text).await
    }

    async fn send_typing(&self, chat_id: &str) {
        if let Err(error) = self.send_chat_action(chat_id, "typing").await {
            tracing::debug!(chat_id, %error, "typing indicator failed");
        }
    }
}

/// Split a reply into chunks of at most `limit` characters, breaking at
/// line or word boundaries where possible. Chunks after the first carry
/// an "(i/N)" continuation marker.
pub fn split_reply(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    // Room for a marker like "(12/34) " on follow-up chunks.
    const MARKER_RESERVE: usize = 8;
    let body_limit = limit.saturating_sub(MARKER_RESERVE).max(1);

    let mut pieces = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let hard_end = rest
            .char_indices()
            .nth(body_limit)
            .map(|(index, _)| index)
            .unwrap_or(rest.len());
        if hard_end == rest.len() {
            pieces.push(rest.trim_end().to_string());
            break;
        }

        let window = &rest[..hard_end];
        let cut = match window.rfind('\n') {
            Some(index) if index > 0 => index,
            _ => match window.rfind(' ') {
                Some(index) if index > 0 => index,
                _ => hard_end,
            },
        };
        pieces.push(rest[..cut].trim_end().to_string());
        rest = rest[cut..].trim_start_matches(['\n', ' ']);
    }
    pieces.retain(|piece| !piece.is_empty());

    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| {
            if index == 0 {
                piece
            } else {
                format!("({}/{}) {}", index + 1, total, piece)
            }
        })
        .collect()
}

// -- Webhook payload types --

/// One raw webhook update from the Bot API.
#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub message: Option<WebhookMessage>,
}

/// Fields are optional across the board: event kinds this bot ignores may
/// omit any of them, and intake must still ack with 200.
#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    #[serde(default)]
    pub chat: Option<WebhookChat>,
    #[serde(default)]
    pub from: Option<WebhookSender>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<WebhookPhoto>,
    #[serde(default)]
    pub file: Option<WebhookFile>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChat {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookSender {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPhoto {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookFile {
    pub url: String,
    pub file_name: String,
}

/// The Bot API is inconsistent about id types across event kinds; accept
/// both JSON strings and integers.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct IdVisitor;

    impl serde::de::Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

impl WebhookUpdate {
    /// Convert a raw update into the event the conversation core consumes.
    /// Returns `None` for event kinds the bot ignores.
    pub fn into_event(self) -> Option<InboundEvent> {
        let message = self.message?;
        let from = message.from?;
        let user_id = UserId::from(from.id.as_str());
        let chat_id = message.chat?.id;
        let display_name = from
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.into());

        match self.event_name.as_str() {
            "message.text.received" => Some(InboundEvent::Text {
                user_id,
                chat_id,
                display_name,
                text: message.text?,
            }),
            "message.photo.received" => Some(InboundEvent::Photo {
                user_id,
                chat_id,
                display_name,
                image_url: message.photo?.url,
                caption: message.caption,
            }),
            "message.file.received" => {
                let file = message.file?;
                Some(InboundEvent::File {
                    user_id,
                    chat_id,
                    display_name,
                    file_url: file.url,
                    file_name: file.file_name,
                    caption: message.caption,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_reply_is_not_chunked() {
        assert_eq!(split_reply("ngắn thôi", 2000), vec!["ngắn thôi"]);
    }

    #[test]
    fn test_long_reply_chunks_carry_continuation_markers() {
        let text = "x".repeat(250);
        let chunks = split_reply(&text, 100);
        assert!(chunks.len() >= 3);
        assert!(!chunks[0].starts_with('('));
        let total = chunks.len();
        for (index, chunk) in chunks.iter().enumerate().skip(1) {
            assert!(chunk.starts_with(&format!("({}/{}) ", index + 1, total)));
        }
    }

    #[test]
    fn test_chunks_respect_the_limit() {
        let text = "từ ".repeat(2000);
        for chunk in split_reply(&text, 200) {
            assert!(chunk.chars().count() <= 200);
        }
    }

    #[test]
    fn test_chunking_prefers_line_breaks() {
        let text = format!("{}\n{}", "a".repeat(80), "b".repeat(80));
        let chunks = split_reply(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(80));
        assert_eq!(chunks[1], format!("(2/2) {}", "b".repeat(80)));
    }

    #[test]
    fn test_text_update_decodes_into_event() {
        let payload = serde_json::json!({
            "event_name": "message.text.received",
            "message": {
                "chat": { "id": 12345 },
                "from": { "id": "u-9", "display_name": "An" },
                "text": "xin chào"
            }
        });
        let update: WebhookUpdate = serde_json::from_value(payload).unwrap();
        let Some(InboundEvent::Text {
            user_id,
            chat_id,
            display_name,
            text,
        }) = update.into_event()
        else {
            panic!("expected a text event");
        };
        assert_eq!(&*user_id, "u-9");
        assert_eq!(chat_id, "12345");
        assert_eq!(display_name, "An");
        assert_eq!(text, "xin chào");
    }

    #[test]
    fn test_photo_update_without_caption_decodes() {
        let payload = serde_json::json!({
            "event_name": "message.photo.received",
            "message": {
                "chat": { "id": "c1" },
                "from": { "id": "u1" },
                "photo": { "url": "https://cdn.example/p.jpg" }
            }
        });
        let update: WebhookUpdate = serde_json::from_value(payload).unwrap();
        let Some(InboundEvent::Photo {
            image_url,
            caption,
            display_name,
            ..
        }) = update.into_event()
        else {
            panic!("expected a photo event");
        };
        assert_eq!(image_url, "https://cdn.example/p.jpg");
        assert_eq!(caption, None);
        assert_eq!(display_name, FALLBACK_DISPLAY_NAME);
    }

    #[test]
    fn test_unknown_event_names_are_ignored() {
        let payload = serde_json::json!({
            "event_name": "message.sticker.received",
            "message": {
                "chat": { "id": "c1" },
                "from": { "id": "u1" }
            }
        });
        let update: WebhookUpdate = serde_json::from_value(payload).unwrap();
        assert!(update.into_event().is_none());
    }
}
