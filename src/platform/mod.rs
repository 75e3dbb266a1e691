pub mod telegram;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

/// Errors from a single call to the messaging platform.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
    #[error("{method} rejected: {reason}")]
    Rejected { method: &'static str, reason: String },
}

/// Confirmed webhook state as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WebhookInfo {
    /// Empty when no webhook is set.
    pub url: String,
    pub pending_update_count: u32,
    pub last_error_message: Option<String>,
}

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: u64,
    pub display_name: String,
}

/// One message event received from the platform, reduced to what the handlers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub update_id: i64,
    pub message_id: i32,
    pub chat_id: i64,
    pub sender: Option<Sender>,
    pub text: Option<String>,
}

impl InboundUpdate {
    /// Commands are messages starting with `/`, e.g. `/start`.
    pub fn is_command(&self) -> bool {
        self.text.as_deref().is_some_and(|t| t.starts_with('/'))
    }

    /// Text that is not a command.
    pub fn plain_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|_| !self.is_command())
    }
}

/// The remote calls this service makes against the messaging platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Verify the credential; returns the bot's username.
    async fn get_me(&self) -> Result<String, PlatformError>;

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), PlatformError>;

    async fn set_webhook(&self, url: &str, drop_pending_updates: bool)
        -> Result<(), PlatformError>;

    async fn get_webhook_info(&self) -> Result<WebhookInfo, PlatformError>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), PlatformError>;
}
