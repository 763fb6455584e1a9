use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::SearchConfig;

const SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// Header line of the snippet block sent back to the user.
pub const SNIPPET_HEADER: &str = "लेटेस्ट वेब रिज़ल्ट्स:";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

// Topic groups carry a nested "Topics" array instead of a direct result.
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "FirstURL", default)]
    first_url: Option<String>,
    #[serde(rename = "Text", default)]
    text: Option<String>,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

/// Web-search client. Distinguishes "no results" (`Ok(vec![])`) from a failed
/// provider call (`Err`); the composer treats both as "omit the block".
pub struct WebSearch {
    client: reqwest::Client,
    config: SearchConfig,
}

impl WebSearch {
    pub fn new(config: SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Look up `query`, returning at most `max_results` hits.
    pub async fn lookup(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("no_html", "1".to_string()),
        ];
        if let Some(locale) = &self.config.locale {
            params.push(("kl", locale.clone()));
        }

        debug!("Search query: {}", query);

        let answer: InstantAnswer = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(flatten_topics(answer.related_topics, self.config.max_results))
    }
}

fn flatten_topics(topics: Vec<RelatedTopic>, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    collect_hits(topics, limit, &mut hits);
    hits
}

fn collect_hits(topics: Vec<RelatedTopic>, limit: usize, hits: &mut Vec<SearchHit>) {
    for topic in topics {
        if hits.len() >= limit {
            return;
        }
        match (topic.first_url, topic.text) {
            (Some(url), text) if !url.is_empty() => hits.push(SearchHit {
                url,
                text: text.unwrap_or_default(),
            }),
            _ => collect_hits(topic.topics, limit, hits),
        }
    }
}

/// Render hits as the bulleted snippet block; empty input renders empty.
pub fn format_snippets(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let bullets: Vec<String> = hits
        .iter()
        .map(|hit| {
            if hit.text.is_empty() {
                format!("• {}", hit.url)
            } else {
                format!("• {}: {}", hit.text, hit.url)
            }
        })
        .collect();
    format!("{}\n{}", SNIPPET_HEADER, bullets.join("\n"))
}
