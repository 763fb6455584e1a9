use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use teloxide::prelude::*;
use tracing::{info, warn};
use url::Url;

use crate::compose::Composer;
use crate::platform::telegram;

const STATUS_NAME: &str = "PastGlobeBot";

#[derive(Clone)]
pub struct AppState {
    pub bot: Bot,
    pub composer: Arc<Composer>,
    /// Webhook path segment; must match the bot token Telegram was given.
    pub webhook_token: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/ping", get(ping))
        .route("/webhook/{token}", post(webhook))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn run(state: AppState, port: u16) -> Result<()> {
    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Liveness server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}

/// Replace any previously registered webhook with this deployment's URL.
/// Failures here are logged and swallowed; the server starts regardless.
pub async fn register_webhook(bot: &Bot, public_url: &str, token: &str) {
    if let Err(e) = bot.delete_webhook().await {
        warn!("Failed to delete previous webhook: {}", e);
    }

    let url = format!("{}/webhook/{}", public_url.trim_end_matches('/'), token);
    match url.parse::<Url>() {
        Ok(url) => match bot.set_webhook(url).await {
            Ok(_) => info!("Webhook registered: {}/webhook/<token>", public_url),
            Err(e) => warn!("Failed to register webhook: {}", e),
        },
        Err(e) => warn!("Invalid webhook URL {}: {}", url, e),
    }
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": STATUS_NAME,
        "time": Utc::now().to_rfc3339(),
    }))
}

async fn health() -> &'static str {
    "OK"
}

async fn ping() -> &'static str {
    "pong"
}

/// Always answers 200/"OK" so the platform never retries; bad tokens and
/// undecodable payloads are logged and dropped.
async fn webhook(
    Path(token): Path<String>,
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, &'static str) {
    if token != state.webhook_token {
        warn!("Webhook call with unexpected token");
        return (StatusCode::OK, "OK");
    }

    match serde_json::from_str::<teloxide::types::Update>(&body) {
        Ok(update) => {
            // Reply out of band; the platform only needs the 200.
            tokio::spawn(telegram::handle_update(
                state.bot.clone(),
                update,
                state.composer.clone(),
            ));
        }
        Err(e) => warn!("Failed to decode webhook update: {}", e),
    }

    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{Answerer, SnippetSource};
    use crate::llm::CompletionError;
    use crate::search::{SearchError, SearchHit};
    use async_trait::async_trait;

    struct StubAnswer;

    #[async_trait]
    impl Answerer for StubAnswer {
        async fn answer(&self, _question: &str) -> Result<String, CompletionError> {
            Ok("stub".to_string())
        }
    }

    struct StubSearch;

    #[async_trait]
    impl SnippetSource for StubSearch {
        async fn snippets(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
            Ok(vec![])
        }
    }

    fn state() -> AppState {
        AppState {
            bot: Bot::new("123:abc"),
            composer: Arc::new(Composer::new(Box::new(StubAnswer), Box::new(StubSearch))),
            webhook_token: "123:abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_status_has_name_and_parseable_time() {
        let Json(body) = status().await;
        assert_eq!(body["status"], STATUS_NAME);
        let time = body["time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[tokio::test]
    async fn test_health_and_ping() {
        assert_eq!(health().await, "OK");
        assert_eq!(ping().await, "pong");
    }

    #[tokio::test]
    async fn test_webhook_returns_ok_for_undecodable_body() {
        let (code, body) = webhook(
            Path("123:abc".to_string()),
            State(state()),
            "not json".to_string(),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_webhook_returns_ok_for_wrong_token() {
        let (code, _) = webhook(
            Path("someone-else".to_string()),
            State(state()),
            "{}".to_string(),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_returns_ok_for_wellformed_update() {
        let (code, body) = webhook(
            Path("123:abc".to_string()),
            State(state()),
            r#"{"update_id": 1}"#.to_string(),
        )
        .await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
