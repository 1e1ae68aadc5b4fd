//! Outbound messaging: the Zalo Bot API client and attachment downloads.

pub mod attachments;
pub mod zalo;

pub use zalo::ZaloClient;

use crate::error::DeliveryError;

/// Seam between the conversation flow and the chat platform.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver a reply, chunking when it exceeds the platform limit.
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError>;

    /// Best-effort typing indicator; failures are logged, never surfaced.
    async fn send_typing(&self, chat_id: &str);
}
