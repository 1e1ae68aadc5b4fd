//! The conversation handler: slash commands, the generation path, and
//! error-to-reply mapping.

use crate::config::CategoryConfig;
use crate::conversation::InboundEvent;
use crate::conversation::normalize::normalize;
use crate::conversation::replies;
use crate::conversation::session::SessionStore;
use crate::error::{DeliveryError, GenerationError};
use crate::llm::client::Generator;
use crate::llm::prompt::{EventAttachment, compose};
use crate::llm::retry::{RetryPolicy, generate_with_retry};
use crate::llm::routing::{self, ModelPreference};
use crate::messaging::{Messenger, attachments};

use std::sync::Arc;

/// Default caption when a photo arrives without one.
const DEFAULT_PHOTO_CAPTION: &str = "Phân tích ảnh này giúp tôi";

/// Default caption when a file arrives without one.
const DEFAULT_FILE_CAPTION: &str = "Đọc và tóm tắt tệp này giúp tôi";

/// Drives one inbound event from intake to delivered reply.
///
/// Every failure inside the flow is converted to a user-visible chat
/// message here; only delivery failures propagate, and the caller just
/// logs those.
pub struct ConversationHandler<G, M> {
    sessions: Arc<SessionStore>,
    generator: Arc<G>,
    messenger: Arc<M>,
    http: reqwest::Client,
    retry: RetryPolicy,
    categories: CategoryConfig,
}

/// A recognized slash command. Anything else goes to generation.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Clear,
    Help,
    ListModels,
    SetModel(String),
}

fn parse_command(text: &str) -> Option<Command> {
    let trimmed = text.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_lowercase();
    let argument = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match (verb.as_str(), argument) {
        ("/start", None) => Some(Command::Start),
        ("/clear", None) => Some(Command::Clear),
        ("/help", None) => Some(Command::Help),
        ("/model", None) => Some(Command::ListModels),
        ("/model", Some(key)) => Some(Command::SetModel(key.to_lowercase())),
        _ => None,
    }
}

impl<G: Generator, M: Messenger> ConversationHandler<G, M> {
    pub fn new(
        sessions: Arc<SessionStore>,
        generator: Arc<G>,
        messenger: Arc<M>,
        http: reqwest::Client,
        categories: CategoryConfig,
    ) -> Self {
        Self {
            sessions,
            generator,
            messenger,
            http,
            retry: RetryPolicy::default(),
            categories,
        }
    }

    /// Handle one inbound event end to end.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<(), DeliveryError> {
        match event {
            InboundEvent::Text {
                user_id,
                chat_id,
                display_name,
                text,
            } => match parse_command(&text) {
                Some(command) => {
                    self.handle_command(&user_id, &chat_id, &display_name, command)
                        .await
                }
                None => self.respond(&user_id, &chat_id, &text, None).await,
            },
            InboundEvent::Photo {
                user_id,
                chat_id,
                image_url,
                caption,
                ..
            } => {
                self.messenger.send_typing(&chat_id).await;
                let image = match attachments::download_image(&self.http, &image_url).await {
                    Ok(image) => image,
                    Err(error) => {
                        tracing::warn!(user_id = %user_id, %error, "image download failed");
                        return self
                            .messenger
                            .send(&chat_id, replies::IMAGE_DOWNLOAD_FAILED)
                            .await;
                    }
                };
                let caption = caption.unwrap_or_else(|| DEFAULT_PHOTO_CAPTION.into());
                let attachment = EventAttachment::Image {
                    bytes: image.bytes,
                    media_type: image.media_type,
                };
                self.respond(&user_id, &chat_id, &caption, Some(attachment))
                    .await
            }
            InboundEvent::File {
                user_id,
                chat_id,
                file_url,
                file_name,
                caption,
                ..
            } => {
                if let Err(error) = attachments::ensure_readable(&file_name) {
                    tracing::debug!(user_id = %user_id, %error, "unreadable file attachment");
                    return self.messenger.send(&chat_id, replies::FILE_UNSUPPORTED).await;
                }
                self.messenger.send_typing(&chat_id).await;
                let content = match attachments::download_text(&self.http, &file_url).await {
                    Ok(content) => content,
                    Err(error) => {
                        tracing::warn!(user_id = %user_id, %error, "file download failed");
                        return self
                            .messenger
                            .send(&chat_id, replies::FILE_DOWNLOAD_FAILED)
                            .await;
                    }
                };
                let caption = caption.unwrap_or_else(|| DEFAULT_FILE_CAPTION.into());
                let attachment = EventAttachment::FileText { file_name, content };
                self.respond(&user_id, &chat_id, &caption, Some(attachment))
                    .await
            }
        }
    }

    async fn handle_command(
        &self,
        user_id: &str,
        chat_id: &str,
        display_name: &str,
        command: Command,
    ) -> Result<(), DeliveryError> {
        match command {
            Command::Start => {
                self.messenger
                    .send(chat_id, &replies::welcome(display_name))
                    .await
            }
            Command::Clear => {
                self.sessions.clear(user_id).await;
                self.messenger.send(chat_id, replies::CLEARED).await
            }
            Command::Help => self.messenger.send(chat_id, replies::HELP).await,
            Command::ListModels => {
                let preference = self.sessions.preference(user_id).await;
                self.messenger
                    .send(chat_id, &replies::model_listing(preference.as_ref()))
                    .await
            }
            Command::SetModel(key) => {
                if key == "auto" {
                    self.sessions
                        .set_preference(user_id, ModelPreference::Auto)
                        .await;
                    return self.messenger.send(chat_id, replies::MODEL_SET_AUTO).await;
                }
                match routing::profile(&key) {
                    Some(profile) => {
                        self.sessions
                            .set_preference(user_id, ModelPreference::Model(key))
                            .await;
                        self.messenger
                            .send(chat_id, &replies::model_set(profile))
                            .await
                    }
                    None => {
                        self.messenger
                            .send(chat_id, &replies::unknown_model(&key))
                            .await
                    }
                }
            }
        }
    }

    /// The generation path: read session, select a model, compose, call
    /// with retry, normalize, commit, deliver.
    async fn respond(
        &self,
        user_id: &str,
        chat_id: &str,
        input: &str,
        attachment: Option<EventAttachment>,
    ) -> Result<(), DeliveryError> {
        self.messenger.send_typing(chat_id).await;

        let history = self.sessions.history(user_id).await;
        let preference = self.sessions.preference(user_id).await;

        let has_image = matches!(attachment, Some(EventAttachment::Image { .. }));
        let category =
            routing::infer_category(input, has_image, &self.categories.code_math_keywords);

        let profile = match routing::select(preference.as_ref(), category) {
            Ok(profile) => profile,
            Err(GenerationError::UnknownModel(key)) => {
                return self
                    .messenger
                    .send(chat_id, &replies::unknown_model(&key))
                    .await;
            }
            Err(error) => {
                tracing::error!(user_id = %user_id, %error, "model selection failed");
                return self.messenger.send(chat_id, replies::GENERATION_FAILED).await;
            }
        };

        let request = compose(&history, input, attachment);
        let raw = match generate_with_retry(
            self.generator.as_ref(),
            &self.retry,
            &request,
            profile,
            &routing::fallback_profiles(),
        )
        .await
        {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(user_id = %user_id, %error, "generation failed after retries");
                return self.messenger.send(chat_id, replies::GENERATION_FAILED).await;
            }
        };

        let reply = normalize(&raw);
        self.sessions
            .commit(user_id, input.to_string(), reply.clone())
            .await;

        let outgoing = if has_image {
            format!("🖼️ {reply}")
        } else {
            reply
        };
        self.messenger.send(chat_id, &outgoing).await
    }
}
