//! Corpus builder: discovers listing pages, fetches articles on a bounded worker
//! pool and appends new ones to the document store.

pub mod extract;
pub mod fetch;

use anyhow::Result;
use extract::{listing_urls, parse_page_count, ExtractError, Extractor};
use fetch::{fetch_with_retry, Fetch, FetchError, RetryPolicy};
use newsdex_core::config::CrawlConfig;
use newsdex_core::{DocumentStore, InsertOutcome, NewDocument};
use reqwest::Url;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

#[derive(Debug, thiserror::Error)]
pub enum CrawlFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub page_count: usize,
    pub pages_visited: usize,
    pub stored: usize,
    /// Links skipped because their URL was already in the store.
    pub duplicates: usize,
    pub failed: usize,
}

type ArticleResult = (Url, Result<NewDocument, CrawlFailure>);

pub struct Crawler<F: Fetch> {
    fetcher: Arc<F>,
    extractor: Extractor,
    config: CrawlConfig,
}

impl<F: Fetch> Crawler<F> {
    pub fn new(fetcher: F, config: &CrawlConfig) -> Result<Self> {
        Ok(Self { fetcher: Arc::new(fetcher), extractor: Extractor::new(config)?, config: config.clone() })
    }

    fn retry(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config)
    }

    /// Number of listing pages advertised by the page-count resource, or the
    /// configured default when the marker is missing or the fetch fails.
    pub async fn discover_page_count(&self) -> usize {
        let source = self.config.page_count_url.as_deref().unwrap_or(&self.config.root_url);
        let discovered = match Url::parse(source) {
            Ok(url) => match fetch_with_retry(self.fetcher.as_ref(), &url, self.retry()).await {
                Ok(html) => parse_page_count(&html, &self.config.page_count_marker),
                Err(err) => {
                    tracing::warn!(%url, error = %err, "page count lookup failed");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(url = source, error = %err, "invalid page count url");
                None
            }
        };
        let pages = discovered.unwrap_or(self.config.default_page_count);
        tracing::info!(pages, discovered = discovered.is_some(), "listing page count");
        pages
    }

    /// Crawl until `target_count` new documents are stored, listing pages run
    /// out, or `shutdown` flips to true. In-flight fetches are always drained and
    /// their results stored before returning.
    pub async fn run(&self, store: &DocumentStore, shutdown: watch::Receiver<bool>) -> Result<CrawlReport> {
        let mut report = CrawlReport { page_count: self.discover_page_count().await, ..Default::default() };
        let mut listing = listing_urls(&self.config.listing_url_template, self.config.page_size, report.page_count)
            .into_iter();
        let mut pending: VecDeque<Url> = VecDeque::new();
        let mut scheduled: HashSet<String> = HashSet::new();
        let mut workers: JoinSet<ArticleResult> = JoinSet::new();
        let target = self.config.target_count;

        loop {
            let stopping = *shutdown.borrow();
            while !stopping && report.stored + workers.len() < target && workers.len() < self.config.concurrency {
                let Some(url) = pending.pop_front() else {
                    match listing.next() {
                        Some(page) => {
                            self.enqueue_listing(&page, store, &mut pending, &mut scheduled, &mut report).await;
                            continue;
                        }
                        None => break,
                    }
                };
                workers.spawn(fetch_article(self.fetcher.clone(), self.extractor.clone(), url, self.retry()));
            }

            let Some(joined) = workers.join_next().await else { break };
            match joined {
                Ok((url, Ok(doc))) => match store.insert(doc) {
                    Ok(InsertOutcome::Inserted(doc_id)) => {
                        report.stored += 1;
                        tracing::info!(doc_id, %url, stored = report.stored, "stored article");
                    }
                    Ok(InsertOutcome::Duplicate(doc_id)) => {
                        report.duplicates += 1;
                        tracing::debug!(doc_id, %url, "article already stored");
                    }
                    Err(err) => {
                        report.failed += 1;
                        tracing::warn!(%url, error = %err, "failed to persist article");
                    }
                },
                Ok((url, Err(err))) => {
                    report.failed += 1;
                    tracing::warn!(%url, error = %err, "skipping article");
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(error = %err, "article task aborted");
                }
            }
        }

        tracing::info!(
            stored = report.stored,
            duplicates = report.duplicates,
            failed = report.failed,
            pages_visited = report.pages_visited,
            "crawl finished"
        );
        Ok(report)
    }

    async fn enqueue_listing(
        &self,
        page: &str,
        store: &DocumentStore,
        pending: &mut VecDeque<Url>,
        scheduled: &mut HashSet<String>,
        report: &mut CrawlReport,
    ) {
        let url = match Url::parse(page) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(page, error = %err, "invalid listing url");
                return;
            }
        };
        let html = match fetch_with_retry(self.fetcher.as_ref(), &url, self.retry()).await {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(%url, error = %err, "skipping listing page");
                return;
            }
        };
        report.pages_visited += 1;
        let mut fresh = 0;
        for link in self.extractor.article_links(&url, &html) {
            if !scheduled.insert(link.to_string()) {
                continue;
            }
            if store.contains_url(link.as_str()) {
                report.duplicates += 1;
            } else {
                pending.push_back(link);
                fresh += 1;
            }
        }
        tracing::debug!(%url, fresh, queued = pending.len(), "listing page scanned");
    }
}

async fn fetch_article<F: Fetch>(fetcher: Arc<F>, extractor: Extractor, url: Url, retry: RetryPolicy) -> ArticleResult {
    let result = match fetch_with_retry(fetcher.as_ref(), &url, retry).await {
        Ok(html) => extractor.article(&url, &html).map_err(CrawlFailure::from),
        Err(err) => Err(CrawlFailure::from(err)),
    };
    (url, result)
}
