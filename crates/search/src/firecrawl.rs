//! [`SearchProvider`] over the Firecrawl v1 HTTP API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pipeline::{
    HitMetadata, ScrapedPage, SearchError, SearchHit, SearchProvider, SearchResults,
    ToolScoutError,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Public Firecrawl endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Connection settings for [`FirecrawlClient`].
#[derive(Clone)]
pub struct FirecrawlConfig {
    /// Bearer token sent with every request. Redacted from `Debug` output.
    pub api_key: String,
    /// Scheme and host the `/v1/...` paths are appended to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl FirecrawlConfig {
    /// Builds a config for the public endpoint with a 60 second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ToolScoutError::ConfigurationError`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolScoutError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ToolScoutError::config("Firecrawl API key is empty"));
        }
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/v1/{route}", self.base_url)
    }
}

impl std::fmt::Debug for FirecrawlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: reqwest::Client,
    config: FirecrawlConfig,
}

impl FirecrawlClient {
    /// # Errors
    ///
    /// Returns [`SearchError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: FirecrawlConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: FirecrawlConfig) -> Self {
        Self { client, config }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        body: &serde_json::Value,
    ) -> Result<T, SearchError> {
        let resp = self
            .client
            .post(self.config.endpoint(route))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Api {
                status: status.as_u16(),
            });
        }
        resp.json()
            .await
            .map_err(|e| SearchError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl SearchProvider for FirecrawlClient {
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, SearchError> {
        let t0 = Instant::now();
        let body = json!({
            "query": query,
            "limit": limit,
            "scrapeOptions": { "formats": ["markdown"] }
        });
        let parsed: FirecrawlSearchResponse = self.post("search", &body).await?;
        if !parsed.success {
            return Err(SearchError::Unsuccessful(
                parsed.error.unwrap_or_else(|| "search returned success=false".to_string()),
            ));
        }

        let data: Vec<SearchHit> = parsed
            .data
            .into_iter()
            .take(limit)
            .map(SearchHit::from)
            .collect();
        debug!(
            %query,
            hits = data.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "firecrawl search"
        );
        Ok(SearchResults { data })
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, SearchError> {
        let t0 = Instant::now();
        let body = json!({
            "url": url,
            "formats": ["markdown"],
            "onlyMainContent": true
        });
        let parsed: FirecrawlScrapeResponse = self.post("scrape", &body).await?;
        if !parsed.success {
            return Err(SearchError::Unsuccessful(
                parsed.error.unwrap_or_else(|| "scrape returned success=false".to_string()),
            ));
        }

        let markdown = parsed.data.and_then(|d| d.markdown);
        debug!(
            %url,
            chars = markdown.as_deref().map_or(0, str::len),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "firecrawl scrape"
        );
        Ok(ScrapedPage { markdown })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FirecrawlSearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<FirecrawlSearchItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlSearchItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    metadata: Option<FirecrawlMetadata>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlMetadata {
    #[serde(default)]
    title: Option<String>,
}

impl From<FirecrawlSearchItem> for SearchHit {
    fn from(item: FirecrawlSearchItem) -> Self {
        // Scraped metadata is more reliable than the SERP title.
        let title = item.metadata.and_then(|m| m.title).or(item.title);
        SearchHit {
            url: item.url,
            markdown: item.markdown,
            description: item.description,
            metadata: HitMetadata { title },
        }
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<FirecrawlScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlScrapeData {
    markdown: Option<String>,
}
