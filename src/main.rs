mod compose;
mod config;
mod llm;
mod platform;
mod search;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::compose::Composer;
use crate::config::{Config, DeliveryMode};
use crate::llm::LlmClient;
use crate::search::WebSearch;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pastglobe_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded");
    info!("  Model: {}", config.llm.model);
    info!("  Delivery mode: {}", config.telegram.mode);
    info!("  Port: {}", config.server.port);

    // Construct clients once; they are shared read-only from here on.
    let bot = Bot::new(&config.telegram.bot_token);
    let composer = Arc::new(Composer::new(
        Box::new(LlmClient::new(config.llm.clone())),
        Box::new(WebSearch::new(config.search.clone())),
    ));

    let state = AppState {
        bot: bot.clone(),
        composer: composer.clone(),
        webhook_token: config.telegram.bot_token.clone(),
    };

    // In polling mode the receive loop runs as a background task; in webhook
    // mode updates arrive through the server and there is no loop to spawn.
    let poller = match config.telegram.mode {
        DeliveryMode::Polling => Some(tokio::spawn(async move {
            if let Err(e) = platform::telegram::run_polling(bot, composer).await {
                error!("Polling loop exited: {:#}", e);
            }
        })),
        DeliveryMode::Webhook => {
            // public_url presence was validated at load time
            if let Some(public_url) = &config.telegram.public_url {
                server::register_webhook(&state.bot, public_url, &config.telegram.bot_token).await;
            }
            None
        }
    };

    // Foreground: liveness server until ctrl-c.
    let result = server::run(state, config.server.port).await;

    if let Some(poller) = poller {
        poller.abort();
        info!("Polling task stopped");
    }

    result
}
