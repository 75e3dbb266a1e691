use async_trait::async_trait;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind, User};
use tracing::debug;

use crate::platform::{InboundUpdate, PlatformApi, PlatformError, Sender, WebhookInfo};

/// Why an inbound request body could not be turned into an [`InboundUpdate`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("JSON is not a telegram update: {0}")]
    NotAnUpdate(String),
}

/// Parse a webhook POST body into an [`InboundUpdate`].
///
/// The body must be JSON, must deserialize as a Telegram `Update`, and the
/// update must carry a `message`. Anything else is rejected.
pub fn parse_update(raw: &[u8]) -> Result<InboundUpdate, ParseError> {
    // Only used to separate broken JSON from JSON of the wrong shape.
    // teloxide's `UpdateKind` must be read from the raw bytes, not from a `Value`.
    let value: serde_json::Value = serde_json::from_slice(raw).map_err(ParseError::InvalidJson)?;
    if value.is_null() {
        return Err(ParseError::NotAnUpdate("payload is null".to_string()));
    }

    let update: Update =
        serde_json::from_slice(raw).map_err(|e| ParseError::NotAnUpdate(e.to_string()))?;
    let update_id = i64::from(update.id.0);

    let msg = match update.kind {
        UpdateKind::Message(msg) => msg,
        UpdateKind::Error(payload) => {
            return Err(ParseError::NotAnUpdate(format!(
                "update {} has an unrecognized payload: {}",
                update_id, payload
            )))
        }
        _ => {
            return Err(ParseError::NotAnUpdate(format!(
                "update {} carries no message",
                update_id
            )))
        }
    };

    Ok(InboundUpdate {
        update_id,
        message_id: msg.id.0,
        chat_id: msg.chat.id.0,
        sender: msg.from.as_ref().map(sender_of),
        text: msg.text().map(str::to_string),
    })
}

fn sender_of(user: &User) -> Sender {
    let display_name = match &user.username {
        Some(username) => format!("@{}", username),
        None => user.full_name(),
    };
    Sender {
        id: user.id.0,
        display_name,
    }
}

/// Show only the bot id part of a `<id>:<secret>` token.
pub fn redact_token(token: &str) -> String {
    match token.split_once(':') {
        Some((id, _)) => format!("{}:***", id),
        None => "***".to_string(),
    }
}

/// Telegram tokens look like `123456:ABC-DEF...`.
pub fn looks_like_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((id, secret)) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
        }
        None => false,
    }
}

/// [`PlatformApi`] backed by the Telegram Bot API through teloxide.
pub struct TelegramApi {
    bot: Bot,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl PlatformApi for TelegramApi {
    async fn get_me(&self) -> Result<String, PlatformError> {
        let me = self.bot.get_me().await?;
        Ok(me.user.username.clone().unwrap_or_default())
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), PlatformError> {
        debug!("deleteWebhook drop_pending_updates={}", drop_pending_updates);
        self.bot
            .delete_webhook()
            .drop_pending_updates(drop_pending_updates)
            .await?;
        Ok(())
    }

    async fn set_webhook(
        &self,
        url: &str,
        drop_pending_updates: bool,
    ) -> Result<(), PlatformError> {
        let parsed = Url::parse(url).map_err(|e| PlatformError::Rejected {
            method: "setWebhook",
            reason: format!("`{}` is not a url: {}", url, e),
        })?;
        debug!(
            "setWebhook url={} drop_pending_updates={}",
            parsed, drop_pending_updates
        );
        self.bot
            .set_webhook(parsed)
            .drop_pending_updates(drop_pending_updates)
            .await?;
        Ok(())
    }

    async fn get_webhook_info(&self) -> Result<WebhookInfo, PlatformError> {
        let info = self.bot.get_webhook_info().await?;
        Ok(WebhookInfo {
            url: info.url.map(|u| u.to_string()).unwrap_or_default(),
            pending_update_count: info.pending_update_count,
            last_error_message: info.last_error_message,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}
