use std::fmt;

use reqwest::Url;
use tracing::{error, info};

use crate::platform::{PlatformApi, PlatformError, WebhookInfo};

/// Where the platform should deliver updates.
#[derive(Debug, Clone)]
pub struct WebhookRegistration {
    pub url: String,
    pub drop_pending_updates: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    DeleteWebhook,
    SetWebhook,
    GetWebhookInfo,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStep::DeleteWebhook => write!(f, "delete_webhook"),
            RegistrationStep::SetWebhook => write!(f, "set_webhook"),
            RegistrationStep::GetWebhookInfo => write!(f, "get_webhook_info"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("webhook url `{url}` is not usable: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{step} failed: {source}")]
    Step {
        step: RegistrationStep,
        #[source]
        source: PlatformError,
    },
}

impl RegistrationError {
    fn at(step: RegistrationStep) -> impl FnOnce(PlatformError) -> Self {
        move |source| RegistrationError::Step { step, source }
    }
}

/// Telegram only delivers to absolute https endpoints.
fn validate_url(url: &str) -> Result<(), RegistrationError> {
    let invalid = |reason: String| RegistrationError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if parsed.scheme() != "https" {
        return Err(invalid(format!(
            "scheme must be https, got {}",
            parsed.scheme()
        )));
    }
    Ok(())
}

/// The platform must report the URL we just set.
fn confirm_url(info: &WebhookInfo, expected: &str) -> Result<(), RegistrationError> {
    let same = match (Url::parse(&info.url), Url::parse(expected)) {
        (Ok(actual), Ok(expected)) => actual == expected,
        _ => info.url == expected,
    };
    if same {
        return Ok(());
    }
    Err(RegistrationError::Step {
        step: RegistrationStep::GetWebhookInfo,
        source: PlatformError::Rejected {
            method: "getWebhookInfo",
            reason: format!("webhook is `{}`, expected `{}`", info.url, expected),
        },
    })
}

/// Point the platform at `registration.url`, clearing any previous webhook and
/// its queued updates first. Stops at the first failing call.
///
/// Safe to repeat: running it twice with the same URL leaves the same remote state.
pub async fn register_webhook(
    api: &dyn PlatformApi,
    registration: &WebhookRegistration,
) -> Result<WebhookInfo, RegistrationError> {
    validate_url(&registration.url)?;

    let result = async {
        api.delete_webhook(true)
            .await
            .map_err(RegistrationError::at(RegistrationStep::DeleteWebhook))?;
        info!("delete_webhook ok");

        api.set_webhook(&registration.url, registration.drop_pending_updates)
            .await
            .map_err(RegistrationError::at(RegistrationStep::SetWebhook))?;
        info!("set_webhook ok: {}", registration.url);

        let info = api
            .get_webhook_info()
            .await
            .map_err(RegistrationError::at(RegistrationStep::GetWebhookInfo))?;
        confirm_url(&info, &registration.url)?;
        Ok::<_, RegistrationError>(info)
    }
    .await;

    match &result {
        Ok(info) => info!(
            "get_webhook_info: url={} pending={} last_error={:?}",
            info.url, info.pending_update_count, info.last_error_message
        ),
        Err(e) => error!("Webhook registration aborted: {}", e),
    }
    result
}
