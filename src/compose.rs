use async_trait::async_trait;
use tracing::warn;

use crate::llm::{CompletionError, LlmClient};
use crate::search::{format_snippets, SearchError, SearchHit, WebSearch};

/// Freshness qualifier appended to the search query.
const FRESHNESS_QUALIFIER: &str = " latest news";

/// Completion side of the composer. Implemented by [`LlmClient`]; tests
/// substitute stubs.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, CompletionError>;
}

/// Search side of the composer.
#[async_trait]
pub trait SnippetSource: Send + Sync {
    async fn snippets(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
impl Answerer for LlmClient {
    async fn answer(&self, question: &str) -> Result<String, CompletionError> {
        self.complete(question).await
    }
}

#[async_trait]
impl SnippetSource for WebSearch {
    async fn snippets(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        self.lookup(query).await
    }
}

/// Turns one inbound message text into one outbound reply text.
///
/// The completion call always contributes (falling back to an error string),
/// the snippet block is appended only when the lookup produced something. Both
/// calls run concurrently and both finish before the reply is assembled.
pub struct Composer {
    answerer: Box<dyn Answerer>,
    snippets: Box<dyn SnippetSource>,
}

impl Composer {
    pub fn new(answerer: Box<dyn Answerer>, snippets: Box<dyn SnippetSource>) -> Self {
        Self { answerer, snippets }
    }

    /// Never returns an empty string and never fails.
    pub async fn compose(&self, text: &str) -> String {
        let query = format!("{text}{FRESHNESS_QUALIFIER}");
        let (answer, hits) = tokio::join!(self.answerer.answer(text), self.snippets.snippets(&query));

        let answer = answer.unwrap_or_else(|e| fallback_text(&e));

        let block = match hits {
            Ok(hits) => format_snippets(&hits),
            Err(e) => {
                warn!("Snippet lookup failed, omitting block: {}", e);
                String::new()
            }
        };

        if block.is_empty() {
            answer
        } else {
            format!("{answer}\n\n{block}")
        }
    }
}

/// Degraded-but-present reply text for a failed completion call.
fn fallback_text(err: &CompletionError) -> String {
    match err {
        CompletionError::Status(code) => format!("API Error {code}"),
        CompletionError::Transport(e) => format!("Error: {e}"),
        CompletionError::NoContent => "No content".to_string(),
    }
}
