//! HTTP adapter: exposes the registrar and the dispatcher on `/api/index`.
//!
//! Every update POST is acknowledged with `200 success`. Telegram retries
//! deliveries that get any other status, so failures only show up in the logs.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{body::Bytes, extract::State, http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::bot::{self, BotState};
use crate::webhook::{self, WebhookRegistration};

pub const WEBHOOK_PATH: &str = "/api/index";
const ACK: &str = "success";

/// Read-only state shared by all requests.
pub struct AppState {
    pub bot: BotState,
    pub webhook_url: Option<String>,
    pub drop_pending_updates: bool,
}

impl AppState {
    /// The registration request built from configuration, if a URL is set.
    pub fn registration(&self) -> Option<WebhookRegistration> {
        self.webhook_url.as_ref().map(|url| WebhookRegistration {
            url: url.clone(),
            drop_pending_updates: self.drop_pending_updates,
        })
    }

    /// Run the registrar. `Err` carries the text reported to the caller.
    pub async fn register(&self) -> Result<(), String> {
        let Some(bot) = self.bot.handle() else {
            return Err(self.bot.describe());
        };
        let Some(registration) = self.registration() else {
            return Err("webhook url is not configured".to_string());
        };
        webhook::register_webhook(bot.api(), &registration)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Registration run on (cold) start. `None` when the bot is not ready.
    pub async fn register_on_startup(&self) -> Option<Result<(), String>> {
        if self.bot.handle().is_none() {
            warn!("Skipping webhook registration: {}", self.bot.describe());
            return None;
        }
        let result = self.register().await;
        if let Err(e) = &result {
            error!("Startup webhook registration failed: {}", e);
        }
        Some(result)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route(WEBHOOK_PATH, get(register).post(receive_update))
        .with_state(state)
}

/// Serve until the process is stopped.
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on {}{}", addr, WEBHOOK_PATH);

    axum::serve(listener, router(state))
        .await
        .context("Server error")
}

async fn health() -> &'static str {
    "ok"
}

/// GET: (re-)register the webhook. Status is 200 either way; the body says what happened.
async fn register(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    info!("Webhook registration requested");
    match state.register().await {
        Ok(()) => (StatusCode::OK, ACK.to_string()),
        Err(message) => {
            error!("Webhook registration failed: {}", message);
            (StatusCode::OK, message)
        }
    }
}

/// POST: one update from the platform.
async fn receive_update(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    debug!("Update request received ({} bytes)", body.len());
    let outcome = bot::handle_update(&state.bot, &body).await;
    debug!("Update request finished: {:?}", outcome);
    (StatusCode::OK, ACK)
}
