use anyhow::Result;
use async_trait::async_trait;
use newsdex_core::config::CrawlConfig;
use reqwest::{header, Client, StatusCode, Url};
use std::time::Duration;
use tokio::time::sleep;

/// Pages larger than this are treated as malformed.
const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Timeouts, connection failures and 5xx/429 responses; worth retrying.
    #[error("transient fetch failure: {0}")]
    Transient(String),
    #[error("fetch failed: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Source of page bodies. The crawler only depends on this seam.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.client.get(url.clone()).send().await.map_err(classify)?;
        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Permanent(format!("HTTP {status}")));
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            if let Ok(v) = ct.to_str() {
                if !v.starts_with("text/html") {
                    return Err(FetchError::Permanent(format!("unexpected content type {v}")));
                }
            }
        }
        let bytes = resp.bytes().await.map_err(classify)?;
        if bytes.len() > MAX_PAGE_BYTES {
            return Err(FetchError::Permanent(format!("page too large ({} bytes)", bytes.len())));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        FetchError::Transient(err.to_string())
    } else {
        FetchError::Permanent(err.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&CrawlConfig> for RetryPolicy {
    fn from(config: &CrawlConfig) -> Self {
        Self { max_retries: config.max_retries, backoff: Duration::from_millis(config.retry_backoff_ms) }
    }
}

/// Fetch `url`, retrying transient failures up to `policy.max_retries` times
/// with a linearly growing delay.
pub async fn fetch_with_retry<F: Fetch + ?Sized>(fetcher: &F, url: &Url, policy: RetryPolicy) -> Result<String, FetchError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url).await {
            Ok(body) => return Ok(body),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::debug!(%url, attempt, error = %err, "retrying fetch");
                sleep(policy.backoff * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}
