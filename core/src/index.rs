use crate::document::Document;
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type DocId = u32;

/// Occurrences of one term in one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingEntry {
    pub doc_id: DocId,
    pub term_frequency: u32,
}

/// Entries for a single term, sorted by `doc_id` with one entry per document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingsList {
    entries: Vec<PostingEntry>,
}

impl PostingsList {
    pub fn entries(&self) -> &[PostingEntry] {
        &self.entries
    }

    /// Number of distinct documents containing the term.
    pub fn document_frequency(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn term_frequency(&self, doc_id: DocId) -> Option<u32> {
        self.entries
            .binary_search_by_key(&doc_id, |e| e.doc_id)
            .ok()
            .map(|i| self.entries[i].term_frequency)
    }
}

/// Per-document figures needed at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocStats {
    /// Total number of (weighted) terms in the document.
    pub length: u32,
    /// Publication time as unix seconds.
    pub published_at: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingsList>,
    docs: BTreeMap<DocId, DocStats>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_docs(&self) -> u32 {
        self.docs.len() as u32
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn postings(&self, term: &str) -> Option<&PostingsList> {
        self.postings.get(term)
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &PostingsList)> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn doc_stats(&self, doc_id: DocId) -> Option<&DocStats> {
        self.docs.get(&doc_id)
    }

    /// Indexed document ids in ascending order.
    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.keys().copied()
    }
}

/// Term counts for a subset of documents. Workers each fill one and the results
/// are merged; [`PartialIndex::finish`] sorts every postings list so the final
/// index does not depend on how documents were partitioned.
#[derive(Debug, Default)]
pub struct PartialIndex {
    postings: HashMap<String, Vec<PostingEntry>>,
    docs: BTreeMap<DocId, DocStats>,
}

impl PartialIndex {
    /// Tokenize title and body, counting title terms `title_weight` times.
    pub fn add_document(&mut self, doc: &Document, title_weight: u32) {
        let mut counts: HashMap<String, u32> = HashMap::new();
        if title_weight > 0 {
            for term in tokenize(&doc.title) {
                let count = counts.entry(term).or_insert(0);
                *count = count.saturating_add(title_weight);
            }
        }
        for term in tokenize(&doc.body) {
            let count = counts.entry(term).or_insert(0);
            *count = count.saturating_add(1);
        }
        self.add_counts(doc.id, doc.published_at.unix_timestamp(), counts);
    }

    /// Record precomputed term counts for one document. A document already
    /// present is replaced.
    pub fn add_counts(&mut self, doc_id: DocId, published_at: i64, counts: HashMap<String, u32>) {
        if self.docs.contains_key(&doc_id) {
            for list in self.postings.values_mut() {
                list.retain(|e| e.doc_id != doc_id);
            }
        }
        let length = counts.values().fold(0u32, |acc, &tf| acc.saturating_add(tf));
        for (term, term_frequency) in counts {
            if term_frequency == 0 {
                continue;
            }
            self.postings.entry(term).or_default().push(PostingEntry { doc_id, term_frequency });
        }
        self.docs.insert(doc_id, DocStats { length, published_at });
    }

    pub fn merge(mut self, other: PartialIndex) -> PartialIndex {
        for (term, mut entries) in other.postings {
            self.postings.entry(term).or_default().append(&mut entries);
        }
        self.docs.extend(other.docs);
        self
    }

    pub fn finish(self) -> InvertedIndex {
        let postings = self
            .postings
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(term, mut entries)| {
                entries.sort_unstable_by_key(|e| e.doc_id);
                entries.dedup_by_key(|e| e.doc_id);
                (term, PostingsList { entries })
            })
            .collect();
        InvertedIndex { postings, docs: self.docs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn doc(id: DocId, title: &str, body: &str) -> Document {
        Document {
            id,
            url: format!("https://news.example.com/{id}.html"),
            title: title.into(),
            body: body.into(),
            published_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + id as i64).unwrap(),
        }
    }

    #[test]
    fn counts_term_frequency_and_length() {
        let mut p = PartialIndex::default();
        p.add_document(&doc(1, "", "rust rust tokio"), 0);
        let idx = p.finish();
        assert_eq!(idx.num_docs(), 1);
        assert_eq!(idx.postings("rust").unwrap().term_frequency(1), Some(2));
        assert_eq!(idx.postings("tokio").unwrap().document_frequency(), 1);
        assert_eq!(idx.doc_stats(1).unwrap().length, 3);
    }

    #[test]
    fn title_terms_are_weighted() {
        let mut p = PartialIndex::default();
        p.add_document(&doc(1, "Election", "election results"), 2);
        let idx = p.finish();
        assert_eq!(idx.postings("election").unwrap().term_frequency(1), Some(3));
        assert_eq!(idx.doc_stats(1).unwrap().length, 4);
    }

    #[test]
    fn oversized_title_weight_saturates() {
        let mut p = PartialIndex::default();
        p.add_document(&doc(1, "storm storm", "storm warning"), u32::MAX);
        let idx = p.finish();
        assert_eq!(idx.postings("storm").unwrap().term_frequency(1), Some(u32::MAX));
        assert_eq!(idx.doc_stats(1).unwrap().length, u32::MAX);
    }

    #[test]
    fn merge_order_does_not_change_result() {
        let docs = [doc(3, "", "alpha beta"), doc(1, "", "beta gamma"), doc(2, "", "alpha gamma gamma")];

        let mut a = PartialIndex::default();
        a.add_document(&docs[0], 1);
        let mut b = PartialIndex::default();
        b.add_document(&docs[1], 1);
        b.add_document(&docs[2], 1);
        let left = a.merge(b).finish();

        let mut c = PartialIndex::default();
        c.add_document(&docs[2], 1);
        let mut d = PartialIndex::default();
        d.add_document(&docs[1], 1);
        d.add_document(&docs[0], 1);
        let right = c.merge(d).finish();

        assert_eq!(left, right);
        let ids: Vec<DocId> = left.postings("alpha").unwrap().entries().iter().map(|e| e.doc_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn readding_a_document_replaces_it() {
        let mut p = PartialIndex::default();
        p.add_document(&doc(1, "", "old words"), 1);
        p.add_document(&doc(1, "", "new words"), 1);
        let idx = p.finish();
        assert!(idx.postings("old").is_none());
        assert_eq!(idx.postings("words").unwrap().document_frequency(), 1);
    }
}
