//! Web search tool with retry and exponential backoff.
//!
//! The tool never fails: every outcome, including exhausted retries, is
//! reported as text so the research step can proceed on whatever grounding
//! it got.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{error, info, warn};

pub const NO_QUERY: &str = "No query provided.";
pub const NO_SNIPPETS: &str = "No public snippets were found.";

const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// One search result as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHit {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
        }
    }

    /// Renders the hit as a `- <title>: <body>` digest line.
    pub fn to_digest_line(&self) -> String {
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled");
        let body = self.body.as_deref().unwrap_or("");
        format!("- {}: {}", title, body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Connectivity or timeout failures; these are retried.
    #[error("{0}")]
    Transient(String),
    /// Any other provider failure; these are not retried.
    #[error("{0}")]
    Provider(String),
}

impl SearchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Transient(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SearchError::Transient(err.to_string())
        } else {
            SearchError::Provider(err.to_string())
        }
    }
}

/// A "return top-K text snippets for a query" capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Tunables for [`SearchTool`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub max_results: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 3,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl SearchSettings {
    /// Wait after failed attempt `attempt` (1-indexed): `retry_delay * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay.saturating_mul(factor)
    }
}

/// Wraps a [`SearchProvider`] with retries and turns every outcome into a digest.
pub struct SearchTool {
    provider: Box<dyn SearchProvider>,
    settings: SearchSettings,
}

impl SearchTool {
    pub fn new(provider: Box<dyn SearchProvider>, settings: SearchSettings) -> Self {
        Self { provider, settings }
    }

    /// Searches for `query` and returns the digest or a sentinel string.
    pub async fn run(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return NO_QUERY.to_string();
        }

        let max_retries = self.settings.max_retries.max(1);
        info!(
            query,
            max_results = self.settings.max_results,
            "Searching web"
        );

        let mut last_error = None;
        for attempt in 1..=max_retries {
            match self.provider.search(query, self.settings.max_results).await {
                Ok(hits) if hits.is_empty() => {
                    info!(attempt, "Search returned no results");
                    return NO_SNIPPETS.to_string();
                }
                Ok(hits) => {
                    info!(attempt, results = hits.len(), "Search succeeded");
                    return hits
                        .iter()
                        .map(SearchHit::to_digest_line)
                        .collect::<Vec<_>>()
                        .join("\n");
                }
                Err(e) if e.is_transient() => {
                    if attempt < max_retries {
                        let wait = self.settings.backoff_delay(attempt);
                        warn!(
                            attempt,
                            max_retries,
                            error = %e,
                            wait_secs = wait.as_secs_f64(),
                            "Search attempt failed. Retrying..."
                        );
                        last_error = Some(e);
                        tokio::time::sleep(wait).await;
                    } else {
                        error!(max_retries, error = %e, "All search attempts failed");
                        last_error = Some(e);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Search failed with unexpected error");
                    return format!("Search failed: {}", e);
                }
            }
        }

        match last_error {
            Some(e) => format!("Search failed after {} attempts: {}", max_retries, e),
            None => format!("Search failed after {} attempts", max_retries),
        }
    }
}

/// Free DuckDuckGo search over its HTML endpoint.
pub struct DuckDuckGoSearch {
    client: Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get(DUCKDUCKGO_HTML_URL)
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Provider(format!(
                "DuckDuckGo returned status {}",
                response.status()
            )));
        }

        let html = response.text().await?;
        parse_duckduckgo_html(&html, max_results)
    }
}

/// Extracts title/snippet pairs from a DuckDuckGo HTML results page.
fn parse_duckduckgo_html(html: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    let selector = |css: &str| {
        Selector::parse(css).map_err(|e| SearchError::Provider(format!("bad selector {css}: {e:?}")))
    };
    let result_sel = selector(".result")?;
    let link_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let document = Html::parse_document(html);

    let hits = document
        .select(&result_sel)
        .take(max_results)
        .map(|result| SearchHit {
            title: result.select(&link_sel).next().and_then(element_text),
            body: result.select(&snippet_sel).next().and_then(element_text),
        })
        .collect();

    Ok(hits)
}

fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<String>().trim().to_string();
    (!text.is_empty()).then_some(text)
}
