use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tracing::{info, warn};

use crate::compose::Composer;
use crate::platform::IncomingMessage;

const GREETING: &str = "नमस्ते! मैं आपको ताज़ा अपडेट के साथ मदद करूँगा।";

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Run the long-polling receive loop until process termination.
pub async fn run_polling(bot: Bot, composer: Arc<Composer>) -> Result<()> {
    info!("Starting Telegram polling...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![composer])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Entry point for webhook-pushed updates. Non-message updates are ignored.
pub async fn handle_update(bot: Bot, update: Update, composer: Arc<Composer>) {
    if let UpdateKind::Message(msg) = update.kind {
        if let Err(e) = handle_message(bot, msg, composer).await {
            warn!("Failed to handle webhook update: {}", e);
        }
    }
}

async fn handle_message(bot: Bot, msg: Message, composer: Arc<Composer>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    if text == "/start" {
        bot.send_message(msg.chat.id, GREETING).await?;
        return Ok(());
    }

    let incoming = IncomingMessage {
        chat_id: msg.chat.id.0,
        text,
        received_at: Utc::now(),
    };

    info!(
        "Message in chat {} at {}: {}",
        incoming.chat_id, incoming.received_at, incoming.text
    );

    // Send "typing" indicator
    bot.send_chat_action(msg.chat.id, teloxide::types::ChatAction::Typing)
        .await
        .ok();

    let reply = composer.compose(&incoming.text).await;

    for chunk in split_message(&reply, 4000) {
        // Ignore errors for individual chunks
        bot.send_message(msg.chat.id, chunk).await.ok();
    }

    Ok(())
}
