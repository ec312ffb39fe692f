//! Validated configuration, read once at startup from a TOML file.
//!
//! Required fields have no serde default, so a missing one fails parsing.
//! Everything else is defaulted here and checked by [`Config::validate`].

use crate::error::{Error, Result};
use crate::search::IdfMode;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Placeholder substituted with `page_index * page_size` in listing URLs.
pub const OFFSET_PLACEHOLDER: &str = "{offset}";

/// Upper bound on neighbors per document, fixed by the neighbor lookup contract.
pub const MAX_NEIGHBORS: usize = 5;

/// Upper bound for `[index] title_weight`.
pub const MAX_TITLE_WEIGHT: u32 = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlConfig {
    pub root_url: String,
    pub listing_url_template: String,
    /// Resource carrying the page-count marker; `root_url` when absent.
    #[serde(default)]
    pub page_count_url: Option<String>,
    #[serde(default = "default_page_count_marker")]
    pub page_count_marker: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_count")]
    pub default_page_count: usize,
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub same_host_only: bool,
    #[serde(default = "default_article_link_pattern")]
    pub article_link_pattern: String,
    #[serde(default = "default_title_selector")]
    pub title_selector: String,
    #[serde(default = "default_body_selector")]
    pub body_selector: String,
    #[serde(default = "default_published_selector")]
    pub published_selector: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub doc_dir: PathBuf,
    pub index_dir: PathBuf,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Title terms are counted this many times; 0 leaves titles out.
    #[serde(default = "default_title_weight")]
    pub title_weight: u32,
    /// Worker threads, 0 means one per CPU.
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankingConfig {
    #[serde(default)]
    pub idf: IdfMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    #[serde(default = "default_probe_terms")]
    pub probe_terms: usize,
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_results_page_size")]
    pub page_size: usize,
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,
    /// Allowed CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_allow_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryProvider {
    #[default]
    Disabled,
    Openai,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryConfig {
    #[serde(default)]
    pub provider: SummaryProvider,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_summary_documents")]
    pub max_documents: usize,
    #[serde(default = "default_summary_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_count_marker() -> String { "maxPage".into() }
fn default_page_size() -> usize { 20 }
fn default_page_count() -> usize { 10 }
fn default_target_count() -> usize { 140 }
fn default_concurrency() -> usize { 8 }
fn default_timeout_secs() -> u64 { 10 }
fn default_max_retries() -> u32 { 2 }
fn default_retry_backoff_ms() -> u64 { 250 }
fn default_user_agent() -> String { "newsdex-bot/0.1".into() }
fn default_article_link_pattern() -> String { r"(?i)\.s?html?$".into() }
fn default_title_selector() -> String { "h1".into() }
fn default_body_selector() -> String { "article p, .article p, #article p, .content p".into() }
fn default_published_selector() -> String {
    "meta[property='article:published_time'], time[datetime], .date, .time".into()
}
fn default_encoding() -> String { "utf-8".into() }
fn default_title_weight() -> u32 { 2 }
fn default_k() -> usize { MAX_NEIGHBORS }
fn default_candidate_pool() -> usize { 25 }
fn default_probe_terms() -> usize { 20 }
fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8080 }
fn default_results_page_size() -> usize { 10 }
fn default_reload_interval_secs() -> u64 { 30 }
fn default_model() -> String { "gpt-3.5-turbo".into() }
fn default_max_tokens() -> u32 { 500 }
fn default_summary_documents() -> usize { 10 }
fn default_summary_timeout_secs() -> u64 { 20 }

impl Default for IndexConfig {
    fn default() -> Self {
        Self { title_weight: default_title_weight(), workers: 0 }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            candidate_pool: default_candidate_pool(),
            probe_terms: default_probe_terms(),
            workers: 0,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            page_size: default_results_page_size(),
            reload_interval_secs: default_reload_interval_secs(),
            cors_allow_origins: Vec::new(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: SummaryProvider::Disabled,
            api_base: None,
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_documents: default_summary_documents(),
            timeout_secs: default_summary_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let crawl = &self.crawl;
        require_non_empty("crawl.root_url", &crawl.root_url)?;
        if !crawl.listing_url_template.contains(OFFSET_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "crawl.listing_url_template must contain {OFFSET_PLACEHOLDER}"
            )));
        }
        require_positive("crawl.page_size", crawl.page_size)?;
        require_positive("crawl.concurrency", crawl.concurrency)?;
        require_positive("crawl.timeout_secs", crawl.timeout_secs as usize)?;
        Regex::new(&crawl.article_link_pattern)
            .map_err(|e| Error::Config(format!("crawl.article_link_pattern: {e}")))?;
        require_non_empty("crawl.title_selector", &crawl.title_selector)?;
        require_non_empty("crawl.body_selector", &crawl.body_selector)?;

        require_non_empty("storage.doc_dir", &self.storage.doc_dir.to_string_lossy())?;
        require_non_empty("storage.index_dir", &self.storage.index_dir.to_string_lossy())?;
        check_encoding(&self.storage.encoding)?;

        if self.index.title_weight > MAX_TITLE_WEIGHT {
            return Err(Error::Config(format!("index.title_weight must be at most {MAX_TITLE_WEIGHT}")));
        }

        let rec = &self.recommend;
        if rec.k == 0 || rec.k > MAX_NEIGHBORS {
            return Err(Error::Config(format!("recommend.k must be within 1..={MAX_NEIGHBORS}")));
        }
        if rec.candidate_pool < rec.k {
            return Err(Error::Config("recommend.candidate_pool must be at least recommend.k".into()));
        }
        require_positive("recommend.probe_terms", rec.probe_terms)?;

        require_positive("server.page_size", self.server.page_size)?;

        if self.summary.provider == SummaryProvider::Openai
            && self.summary.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::Config("summary.api_key is required for provider `openai`".into()));
        }
        Ok(())
    }
}

/// Only UTF-8 storage is supported; the common spellings are accepted.
pub fn check_encoding(encoding: &str) -> Result<()> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Ok(()),
        _ => Err(Error::UnsupportedEncoding(encoding.to_string())),
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_positive(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::Config(format!("{field} must be greater than zero")));
    }
    Ok(())
}
