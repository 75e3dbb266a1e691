use std::ops::ControlFlow;
use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use tracing::{debug, error, info, warn};

use crate::platform::telegram::{self, looks_like_token, redact_token, ParseError};
use crate::platform::{InboundUpdate, PlatformApi, PlatformError};

/// Handler tree run for every parsed update. Branches are tried in order; the
/// first one whose filters pass handles the update.
pub fn schema() -> UpdateHandler<PlatformError> {
    dptree::entry().branch(
        dptree::filter_map(|update: InboundUpdate| update.plain_text().map(str::to_string))
            .endpoint(echo),
    )
}

/// Reply to a plain text message with the same text.
async fn echo(
    api: Arc<dyn PlatformApi>,
    update: InboundUpdate,
    text: String,
) -> Result<(), PlatformError> {
    debug!("Echoing update {} to chat {}", update.update_id, update.chat_id);
    api.send_message(update.chat_id, &text).await
}

/// The platform client plus the handler tree built at startup.
pub struct BotHandle {
    api: Arc<dyn PlatformApi>,
    handler: UpdateHandler<PlatformError>,
}

impl BotHandle {
    pub fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self {
            api,
            handler: schema(),
        }
    }

    pub fn api(&self) -> &dyn PlatformApi {
        self.api.as_ref()
    }

    /// Run the handler tree. `Ok(false)` means no branch matched.
    pub async fn process_update(&self, update: &InboundUpdate) -> Result<bool, PlatformError> {
        match self
            .handler
            .dispatch(dptree::deps![update.clone(), self.api.clone()])
            .await
        {
            ControlFlow::Break(result) => result.map(|()| true),
            ControlFlow::Continue(_) => Ok(false),
        }
    }
}

/// Lifecycle of the process-wide bot. `Ready` and `Failed` are terminal.
pub enum BotState {
    #[allow(dead_code)]
    Uninitialized,
    Ready(BotHandle),
    Failed(String),
}

impl BotState {
    /// Build the bot from its token: validate the token shape, connect, and
    /// confirm the credential with the platform.
    pub async fn initialize<F>(token: Option<&str>, connect: F) -> Self
    where
        F: FnOnce(&str) -> Arc<dyn PlatformApi>,
    {
        info!("Bot state: uninitialized -> initializing");

        let Some(token) = token else {
            return Self::fail("bot token is not configured".to_string());
        };
        if !looks_like_token(token) {
            return Self::fail(format!(
                "bot token {} is malformed",
                redact_token(token)
            ));
        }

        let api = connect(token);
        match api.get_me().await {
            Ok(username) => {
                info!("Bot state: initializing -> ready (@{})", username);
                Self::Ready(BotHandle::new(api))
            }
            Err(e) => Self::fail(format!("bot token was not accepted: {}", e)),
        }
    }

    fn fail(reason: String) -> Self {
        error!("Bot state: initializing -> failed: {}", reason);
        Self::Failed(reason)
    }

    pub fn handle(&self) -> Option<&BotHandle> {
        match self {
            Self::Ready(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Uninitialized => "bot is not initialized".to_string(),
            Self::Ready(_) => "ready".to_string(),
            Self::Failed(reason) => format!("bot failed to initialize: {}", reason),
        }
    }
}

/// What happened to one inbound update. Every outcome is acknowledged to the
/// platform the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    Ignored,
    InvalidJson,
    NotAnUpdate,
    NotReady,
    HandlerFailed,
}

/// Parse a webhook body and route it through the bot's handlers.
pub async fn handle_update(state: &BotState, raw_body: &[u8]) -> DispatchOutcome {
    let update = match telegram::parse_update(raw_body) {
        Ok(update) => update,
        Err(e @ ParseError::InvalidJson(_)) => {
            warn!("Dropping update: {}", e);
            return DispatchOutcome::InvalidJson;
        }
        Err(e @ ParseError::NotAnUpdate(_)) => {
            warn!("Dropping update: {}", e);
            return DispatchOutcome::NotAnUpdate;
        }
    };

    let Some(bot) = state.handle() else {
        error!(
            "Cannot process update {}: {}",
            update.update_id,
            state.describe()
        );
        return DispatchOutcome::NotReady;
    };

    match &update.sender {
        Some(sender) => info!(
            "Update {} message {} from {} ({}) in chat {}: {:?}",
            update.update_id,
            update.message_id,
            sender.display_name,
            sender.id,
            update.chat_id,
            update.text
        ),
        None => info!(
            "Update {} message {} in chat {}: {:?}",
            update.update_id, update.message_id, update.chat_id, update.text
        ),
    }

    match bot.process_update(&update).await {
        Ok(true) => DispatchOutcome::Handled,
        Ok(false) => {
            debug!("No handler for update {}", update.update_id);
            DispatchOutcome::Ignored
        }
        Err(e) => {
            error!("Handler failed for update {}: {}", update.update_id, e);
            DispatchOutcome::HandlerFailed
        }
    }
}
