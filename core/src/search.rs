use crate::error::Error;
use crate::index::{DocId, InvertedIndex};
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Inverse document frequency variant used for TF-IDF weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdfMode {
    /// `ln(N / df)`
    #[default]
    Plain,
    /// `ln(1 + N / df)`, never zero.
    Smoothed,
}

impl IdfMode {
    pub fn idf(self, num_docs: u32, document_frequency: u32) -> f64 {
        let n = num_docs.max(1) as f64;
        let df = document_frequency.max(1) as f64;
        match self {
            IdfMode::Plain => (n / df).ln(),
            IdfMode::Smoothed => (1.0 + n / df).ln(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    Relevance,
    RecencyAsc,
    RecencyDesc,
}

impl RankingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RankingMode::Relevance => "relevance",
            RankingMode::RecencyAsc => "recency_asc",
            RankingMode::RecencyDesc => "recency_desc",
        }
    }
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(RankingMode::Relevance),
            "recency_asc" => Ok(RankingMode::RecencyAsc),
            "recency_desc" => Ok(RankingMode::RecencyDesc),
            other => Err(Error::UnknownMode(other.to_string())),
        }
    }
}

/// Everything one search call needs, owned by the caller.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub mode: RankingMode,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, mode: RankingMode) -> Self {
        Self { query: query.into(), mode }
    }

    /// Build a request from the raw mode string an API caller sent.
    pub fn parse(query: impl Into<String>, mode: &str) -> Result<Self, Error> {
        Ok(Self::new(query, mode.parse()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    /// Relevance score, or publication unix time for the recency modes.
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub found: bool,
    pub results: Vec<ScoredDoc>,
}

impl SearchOutcome {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> Vec<DocId> {
        self.results.iter().map(|r| r.doc_id).collect()
    }
}

/// Read-only ranking over a completed index.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    index: Arc<InvertedIndex>,
    idf_mode: IdfMode,
}

impl SearchEngine {
    pub fn new(index: Arc<InvertedIndex>, idf_mode: IdfMode) -> Self {
        Self { index, idf_mode }
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn idf_mode(&self) -> IdfMode {
        self.idf_mode
    }

    pub fn idf(&self, document_frequency: u32) -> f64 {
        self.idf_mode.idf(self.index.num_docs(), document_frequency)
    }

    /// Rank every document that contains at least one query term.
    ///
    /// Relevance sums `tf * idf` over the distinct query terms present in a
    /// document and divides by the document length. Recency modes order by
    /// publication time only. Ties always fall back to ascending id.
    pub fn search(&self, request: &SearchRequest) -> SearchOutcome {
        let mut seen = HashSet::new();
        let matched: Vec<_> = tokenize(&request.query)
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .filter_map(|term| self.index.postings(&term))
            .collect();
        if matched.is_empty() {
            return SearchOutcome::not_found();
        }

        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for list in &matched {
            let idf = self.idf(list.document_frequency());
            for entry in list.entries() {
                *scores.entry(entry.doc_id).or_insert(0.0) += entry.term_frequency as f64 * idf;
            }
        }

        let mut results: Vec<ScoredDoc> = scores
            .into_iter()
            .map(|(doc_id, raw)| {
                let stats = self.index.doc_stats(doc_id);
                let score = match request.mode {
                    RankingMode::Relevance => {
                        let length = stats.map_or(0, |s| s.length).max(1) as f64;
                        raw / length
                    }
                    RankingMode::RecencyAsc | RankingMode::RecencyDesc => {
                        stats.map_or(0, |s| s.published_at) as f64
                    }
                };
                ScoredDoc { doc_id, score }
            })
            .collect();

        let by_id = |a: &ScoredDoc, b: &ScoredDoc| a.doc_id.cmp(&b.doc_id);
        match request.mode {
            RankingMode::RecencyAsc => results.sort_by(|a, b| cmp_score(a.score, b.score).then_with(|| by_id(a, b))),
            RankingMode::Relevance | RankingMode::RecencyDesc => {
                results.sort_by(|a, b| cmp_score(b.score, a.score).then_with(|| by_id(a, b)))
            }
        }
        SearchOutcome { found: true, results }
    }
}

fn cmp_score(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::index::PartialIndex;
    use time::OffsetDateTime;

    fn engine(bodies: &[(DocId, &str, i64)]) -> SearchEngine {
        let mut p = PartialIndex::default();
        for (id, body, ts) in bodies {
            p.add_document(
                &Document {
                    id: *id,
                    url: format!("https://news.example.com/{id}.html"),
                    title: String::new(),
                    body: body.to_string(),
                    published_at: OffsetDateTime::from_unix_timestamp(*ts).unwrap(),
                },
                0,
            );
        }
        SearchEngine::new(Arc::new(p.finish()), IdfMode::Plain)
    }

    fn scenario() -> SearchEngine {
        engine(&[
            (1, "local election results released today", 300),
            (2, "election results disputed after recount", 100),
            (3, "weather forecast sunny tomorrow", 200),
        ])
    }

    #[test]
    fn relevance_prefers_denser_documents() {
        let out = scenario().search(&SearchRequest::new("election results", RankingMode::Relevance));
        assert!(out.found);
        assert_eq!(out.ids(), vec![2, 1]);
        assert!(out.results[0].score >= out.results[1].score);
    }

    #[test]
    fn no_matching_term_is_not_found() {
        let out = scenario().search(&SearchRequest::new("volcano eruption", RankingMode::Relevance));
        assert_eq!(out, SearchOutcome::not_found());
        let out = scenario().search(&SearchRequest::new("   ", RankingMode::RecencyDesc));
        assert!(!out.found);
    }

    #[test]
    fn only_document_with_all_terms_ranks_first() {
        let e = engine(&[
            (3, "market rally", 10),
            (5, "storm warning coast", 10),
            (7, "market storm warning", 10),
            (9, "warning lights", 10),
        ]);
        let out = e.search(&SearchRequest::new("market storm warning", RankingMode::Relevance));
        assert!(out.found);
        assert_eq!(out.results[0].doc_id, 7);
    }

    #[test]
    fn recency_modes_order_by_timestamp() {
        let e = scenario();
        let asc = e.search(&SearchRequest::new("election results forecast", RankingMode::RecencyAsc));
        assert_eq!(asc.ids(), vec![2, 3, 1]);
        let desc = e.search(&SearchRequest::new("election results forecast", RankingMode::RecencyDesc));
        assert_eq!(desc.ids(), vec![1, 3, 2]);
    }

    #[test]
    fn ties_break_by_id() {
        let e = engine(&[(4, "same text", 50), (2, "same text", 50), (3, "same text", 50)]);
        for mode in [RankingMode::Relevance, RankingMode::RecencyAsc, RankingMode::RecencyDesc] {
            assert_eq!(e.search(&SearchRequest::new("text", mode)).ids(), vec![2, 3, 4]);
        }
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(matches!(SearchRequest::parse("q", "popularity"), Err(Error::UnknownMode(m)) if m == "popularity"));
        assert!(matches!("".parse::<RankingMode>(), Err(Error::UnknownMode(_))));
        assert_eq!("recency_desc".parse::<RankingMode>().unwrap(), RankingMode::RecencyDesc);
    }

    #[test]
    fn smoothed_idf_keeps_ubiquitous_terms_weighted() {
        assert_eq!(IdfMode::Plain.idf(4, 4), 0.0);
        assert!(IdfMode::Smoothed.idf(4, 4) > 0.0);
    }
}
