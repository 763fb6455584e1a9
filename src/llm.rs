use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API error {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("no content in response")]
    NoContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Client for the OpenRouter chat-completion endpoint. One attempt per call,
/// no retries; the composer turns errors into user-visible fallback text.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Send a single-turn completion request for `question`, augmented with
    /// the locale/freshness directive.
    pub async fn complete(&self, question: &str) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(directive(question))],
        };

        let url = format!("{}/chat/completions", self.config.base_url);

        debug!("Sending completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status.as_u16()));
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::NoContent)
    }
}

/// Append the fixed locale/freshness directive, dated today, to the question.
fn directive(question: &str) -> String {
    let today = chrono::Local::now().format("%d %B %Y");
    format!("{question} (संक्षिप्त हिंदी में, {today} तक की ताज़ा जानकारी)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_keeps_question_and_adds_freshness() {
        let prompt = directive("भारत की राजधानी क्या है?");
        assert!(prompt.starts_with("भारत की राजधानी क्या है? ("));
        assert!(prompt.contains("ताज़ा जानकारी"));
    }

    #[test]
    fn test_status_error_embeds_code() {
        let err = CompletionError::Status(500);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_response_parse_extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"नमस्ते"}},
                       {"message":{"role":"assistant","content":"second"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let first = parsed.choices.into_iter().next().unwrap();
        assert_eq!(first.message.content, "नमस्ते");
    }

    #[test]
    fn test_response_without_choices_parses_empty() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }
}
