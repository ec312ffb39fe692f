//! Optional narrative summary of a result page, produced by an external
//! text-generation service. A summary is best effort: every failure is logged
//! and becomes `None`, never an error of the search itself.

use anyhow::Result;
use async_trait::async_trait;
use newsdex_core::config::{SummaryConfig, SummaryProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You are a news desk assistant. You condense several related news \
    articles into one short, accurate summary.";

#[derive(Debug, Clone, Serialize)]
pub struct SummaryItem {
    pub title: String,
    pub snippet: String,
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate_summary(&self, keyword: &str, items: &[SummaryItem]) -> Option<String>;
}

/// Never produces a summary.
pub struct Disabled;

#[async_trait]
impl SummaryGenerator for Disabled {
    async fn generate_summary(&self, _keyword: &str, _items: &[SummaryItem]) -> Option<String> {
        None
    }
}

/// OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletion {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_documents: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletion {
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let api_base = config
            .api_base
            .as_deref()
            .map(|b| b.trim().trim_matches(|c: char| c == '"' || c == '\'').trim_end_matches('/'))
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_API_BASE);
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{api_base}/chat/completions"),
            api_key: config.api_key.clone().unwrap_or_default().trim().to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_documents: config.max_documents,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.7,
            stream: false,
        };
        let resp: ChatResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}

#[async_trait]
impl SummaryGenerator for ChatCompletion {
    async fn generate_summary(&self, keyword: &str, items: &[SummaryItem]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        let prompt = build_prompt(keyword, items, self.max_documents);
        match self.complete(&prompt).await {
            Ok(Some(summary)) => {
                tracing::debug!(keyword, chars = summary.chars().count(), "summary generated");
                Some(summary)
            }
            Ok(None) => {
                tracing::warn!(keyword, "summary service returned no content");
                None
            }
            Err(err) => {
                tracing::warn!(keyword, error = %err, "summary generation failed");
                None
            }
        }
    }
}

/// Prompt listing up to `max_documents` numbered `title / snippet` pairs.
pub fn build_prompt(keyword: &str, items: &[SummaryItem], max_documents: usize) -> String {
    let listed = items
        .iter()
        .take(max_documents)
        .enumerate()
        .map(|(i, item)| format!("{}. {}\n   {}", i + 1, item.title, item.snippet))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Summarize the following news in 200-300 characters, in the language the articles are written in.\n\n\
         Search keyword: {keyword}\n\n\
         Related news:\n{listed}\n\n\
         Focus on what matters most with respect to the keyword."
    )
}

/// Pick the configured strategy.
pub fn from_config(config: &SummaryConfig) -> Result<Arc<dyn SummaryGenerator>> {
    Ok(match config.provider {
        SummaryProvider::Disabled => Arc::new(Disabled),
        SummaryProvider::Openai => Arc::new(ChatCompletion::new(config)?),
    })
}
