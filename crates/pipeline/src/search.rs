//! Web search/scrape port.
//!
//! The [`SearchProvider`] trait is implemented by the `search` crate over
//! Firecrawl. Stages decide what a failure means; the port just reports it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::RetryPolicy;

/// Ordered results of one search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub data: Vec<SearchHit>,
}

impl SearchResults {
    /// The top-ranked hit, if any.
    pub fn first(&self) -> Option<&SearchHit> {
        self.data.first()
    }
}

/// One ranked search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Address of the result page.
    #[serde(default)]
    pub url: String,
    /// Page body, when the provider scraped it as part of the search.
    #[serde(default)]
    pub markdown: Option<String>,
    /// Short result snippet.
    #[serde(default)]
    pub description: Option<String>,
    /// Page metadata reported alongside the hit.
    #[serde(default)]
    pub metadata: HitMetadata,
}

impl SearchHit {
    /// The page title, if the provider reported a non-blank one.
    pub fn title(&self) -> Option<&str> {
        self.metadata
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Metadata attached to a [`SearchHit`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitMetadata {
    /// Page title as reported by the provider. May be blank.
    #[serde(default)]
    pub title: Option<String>,
}

/// Content of one scraped page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// Main content of the page as markdown.
    #[serde(default)]
    pub markdown: Option<String>,
}

impl ScrapedPage {
    /// The page markdown, if present and not blank.
    pub fn content(&self) -> Option<&str> {
        self.markdown.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Failures reported by a [`SearchProvider`].
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request never produced an HTTP response.
    #[error("search transport error: {0}")]
    Transport(String),

    /// The request exceeded the client timeout.
    #[error("search request timed out")]
    Timeout,

    /// The provider answered with a non-success HTTP status.
    #[error("search provider returned HTTP {status}")]
    Api {
        /// HTTP status code.
        status: u16,
    },

    /// HTTP succeeded but the provider flagged the request as failed.
    #[error("search provider reported failure: {0}")]
    Unsuccessful(String),

    /// The body could not be decoded.
    #[error("search response malformed: {0}")]
    MalformedResponse(String),
}

impl SearchError {
    /// Timeouts, transport failures, HTTP 429 and 5xx are worth retrying.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            SearchError::Transport(_) | SearchError::Timeout => {
                RetryPolicy::Retryable { after: None }
            }
            SearchError::Api { status } if *status == 429 || *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            _ => RetryPolicy::NonRetryable,
        }
    }
}

/// A web search and scrape service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs `query` and returns at most `limit` results in rank order.
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, SearchError>;

    /// Fetches `url` and returns its content as markdown.
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SearchError>;
}
