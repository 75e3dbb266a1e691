//! Recording [`PlatformApi`] for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::platform::{PlatformApi, PlatformError, WebhookInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetMe,
    DeleteWebhook { drop_pending_updates: bool },
    SetWebhook { url: String, drop_pending_updates: bool },
    GetWebhookInfo,
    SendMessage { chat_id: i64, text: String },
}

impl Call {
    fn method(&self) -> &'static str {
        match self {
            Call::GetMe => "getMe",
            Call::DeleteWebhook { .. } => "deleteWebhook",
            Call::SetWebhook { .. } => "setWebhook",
            Call::GetWebhookInfo => "getWebhookInfo",
            Call::SendMessage { .. } => "sendMessage",
        }
    }
}

/// Records every call in order and keeps a remote webhook URL like the real platform.
#[derive(Default)]
pub struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    fail_method: Option<&'static str>,
    webhook_url: Mutex<String>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to `method` (e.g. `"setWebhook"`) fails.
    pub fn failing(method: &'static str) -> Self {
        Self {
            fail_method: Some(method),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<(i64, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendMessage { chat_id, text } => Some((chat_id, text)),
                _ => None,
            })
            .collect()
    }

    pub fn remote_webhook_url(&self) -> String {
        self.webhook_url.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), PlatformError> {
        let method = call.method();
        self.calls.lock().unwrap().push(call);
        if self.fail_method == Some(method) {
            return Err(PlatformError::Rejected {
                method,
                reason: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn get_me(&self) -> Result<String, PlatformError> {
        self.record(Call::GetMe)?;
        Ok("echo_test_bot".to_string())
    }

    async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), PlatformError> {
        self.record(Call::DeleteWebhook {
            drop_pending_updates,
        })?;
        self.webhook_url.lock().unwrap().clear();
        Ok(())
    }

    async fn set_webhook(
        &self,
        url: &str,
        drop_pending_updates: bool,
    ) -> Result<(), PlatformError> {
        self.record(Call::SetWebhook {
            url: url.to_string(),
            drop_pending_updates,
        })?;
        *self.webhook_url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn get_webhook_info(&self) -> Result<WebhookInfo, PlatformError> {
        self.record(Call::GetWebhookInfo)?;
        Ok(WebhookInfo {
            url: self.remote_webhook_url(),
            pending_update_count: 0,
            last_error_message: None,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.record(Call::SendMessage {
            chat_id,
            text: text.to_string(),
        })
    }
}
