use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Polling,
    Webhook,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Polling => write!(f, "polling"),
            DeliveryMode::Webhook => write!(f, "webhook"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TelegramConfig {
    /// Overridden by the TELEGRAM_TOKEN environment variable.
    pub bot_token: String,
    pub mode: DeliveryMode,
    /// Public base URL of this deployment; required in webhook mode.
    pub public_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Overridden by the OPENROUTER_KEY environment variable.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub referer: String,
    pub title: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "x-ai/grok-beta".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            referer: "https://t.me/PastGlobeBot".to_string(),
            title: "PastGlobeBot".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    /// Provider locale code (e.g. "in-en"); omitted from the query when None.
    pub locale: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 2,
            locale: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Overridden by the PORT environment variable.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 10000 }
    }
}

impl Config {
    /// Load configuration. The config file is optional; both secrets can come
    /// from the environment, and env always wins over the file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_TOKEN") {
            if !token.is_empty() {
                self.telegram.bot_token = token;
            }
        }
        if let Ok(key) = std::env::var("OPENROUTER_KEY") {
            if !key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("Bot token missing: set TELEGRAM_TOKEN or [telegram] bot_token");
        }
        if self.llm.api_key.is_empty() {
            anyhow::bail!("Completion API key missing: set OPENROUTER_KEY or [llm] api_key");
        }
        if self.telegram.mode == DeliveryMode::Webhook && self.telegram.public_url.is_none() {
            anyhow::bail!("[telegram] public_url is required in webhook mode");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123:abc".to_string();
        config.llm.api_key = "sk-or-test".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.search.max_results, 2);
        assert_eq!(config.telegram.mode, DeliveryMode::Polling);
        assert_eq!(config.llm.model, "x-ai/grok-beta");
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_validate_rejects_missing_bot_token() {
        let mut config = base_config();
        config.telegram.bot_token.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_validate_rejects_missing_api_key() {
        let mut config = base_config();
        config.llm.api_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_mode_requires_public_url() {
        let mut config = base_config();
        config.telegram.mode = DeliveryMode::Webhook;
        assert!(config.validate().is_err());

        config.telegram.public_url = Some("https://bot.example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = "123:abc"
            mode = "webhook"
            public_url = "https://bot.example.com"

            [search]
            locale = "in-en"
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.mode, DeliveryMode::Webhook);
        assert_eq!(config.search.locale.as_deref(), Some("in-en"));
        // Untouched sections keep their defaults.
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.llm.timeout_secs, 30);
    }
}
