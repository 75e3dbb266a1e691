mod bot;
mod config;
mod platform;
mod server;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::BotState;
use crate::config::Config;
use crate::platform::telegram::TelegramApi;
use crate::platform::PlatformApi;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hookbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("  Webhook URL: {}", config.webhook_url().unwrap_or("<unset>"));
    info!("  Listen: {}", config.listen_addr());

    let bot = BotState::initialize(config.bot_token(), |token| {
        Arc::new(TelegramApi::new(token)) as Arc<dyn PlatformApi>
    })
    .await;

    let state = Arc::new(AppState {
        bot,
        webhook_url: config.webhook_url().map(str::to_string),
        drop_pending_updates: config.telegram.drop_pending_updates,
    });

    // Every cold start re-registers; the registrar is idempotent.
    if config.telegram.register_on_startup {
        state.register_on_startup().await;
    }

    server::serve(&config.listen_addr(), state).await
}
