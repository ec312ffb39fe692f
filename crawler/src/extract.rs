use newsdex_core::config::{CrawlConfig, OFFSET_PLACEHOLDER};
use newsdex_core::document::{find_timestamp, parse_timestamp};
use newsdex_core::{Error, NewDocument};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("page has no {0}")]
    MissingField(&'static str),
}

/// Read the page count from a `<marker> = <n>;` statement embedded in `html`.
pub fn parse_page_count(html: &str, marker: &str) -> Option<usize> {
    let rest = &html[html.find(marker)?..];
    let stmt = &rest[..rest.find(';').unwrap_or(rest.len())];
    let value = stmt[stmt.find('=')? + 1..].trim().trim_matches(|c: char| c == '"' || c == '\'');
    value.parse().ok().filter(|n| *n > 0)
}

/// Listing page URLs for `pages` pages: `{offset}` becomes `page * page_size`.
pub fn listing_urls(template: &str, page_size: usize, pages: usize) -> Vec<String> {
    (0..pages)
        .map(|page| template.replace(OFFSET_PLACEHOLDER, &(page * page_size).to_string()))
        .collect()
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[derive(Clone)]
pub struct Extractor {
    title: Selector,
    page_title: Selector,
    body: Selector,
    published: Selector,
    links: Selector,
    article_link: Regex,
    same_host: Option<String>,
}

impl Extractor {
    /// Compile the configured selectors and link pattern. Any that fail to
    /// parse are reported as `Error::Config`.
    pub fn new(config: &CrawlConfig) -> newsdex_core::Result<Self> {
        let same_host = if config.same_host_only {
            let root = Url::parse(&config.root_url)
                .map_err(|e| Error::Config(format!("crawl.root_url: {e}")))?;
            let host = root.host_str().ok_or_else(|| Error::Config("crawl.root_url has no host".into()))?;
            Some(host.to_string())
        } else {
            None
        };
        Ok(Self {
            title: selector("crawl.title_selector", &config.title_selector)?,
            page_title: selector("title", "title")?,
            body: selector("crawl.body_selector", &config.body_selector)?,
            published: selector("crawl.published_selector", &config.published_selector)?,
            links: selector("links", "a[href]")?,
            article_link: Regex::new(&config.article_link_pattern)
                .map_err(|e| Error::Config(format!("crawl.article_link_pattern: {e}")))?,
            same_host,
        })
    }

    /// Article links on a listing page, resolved against `base`, without fragments,
    /// deduplicated in page order.
    pub fn article_links(&self, base: &Url, html: &str) -> Vec<Url> {
        let doc = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for a in doc.select(&self.links) {
            let Some(href) = a.value().attr("href") else { continue };
            let Ok(mut url) = base.join(href.trim()) else { continue };
            if !url.scheme().starts_with("http") || !self.article_link.is_match(url.path()) {
                continue;
            }
            if let Some(host) = &self.same_host {
                if url.host_str() != Some(host.as_str()) {
                    continue;
                }
            }
            url.set_fragment(None);
            if seen.insert(url.to_string()) {
                out.push(url);
            }
        }
        out
    }

    pub fn article(&self, url: &Url, html: &str) -> Result<NewDocument, ExtractError> {
        let doc = Html::parse_document(html);

        let title = doc
            .select(&self.title)
            .chain(doc.select(&self.page_title))
            .map(text_of)
            .find(|t| !t.is_empty())
            .ok_or(ExtractError::MissingField("title"))?;

        let body = doc
            .select(&self.body)
            .map(text_of)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if body.is_empty() {
            return Err(ExtractError::MissingField("body"));
        }

        let published_at = doc
            .select(&self.published)
            .find_map(|el| {
                let value = el.value();
                let raw = value.attr("content").or_else(|| value.attr("datetime")).map(str::to_string);
                parse_timestamp(&raw.unwrap_or_else(|| text_of(el)))
            })
            .or_else(|| find_timestamp(&doc.root_element().text().collect::<String>()))
            .ok_or(ExtractError::MissingField("publication time"))?;

        Ok(NewDocument { url: url.to_string(), title, body, published_at })
    }
}

fn selector(field: &str, css: &str) -> newsdex_core::Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Config(format!("{field}: invalid selector `{css}`: {e:?}")))
}
