//! Offline nearest-neighbor precomputation.
//!
//! For every document the engine probes the inverted index with the document's
//! own highest-weighted terms, keeps the `candidate_pool` documents sharing the
//! most probe terms, and re-ranks that pool by cosine similarity of TF-IDF
//! vectors. Work is independent per document and runs on a bounded rayon pool.

use anyhow::{Context, Result};
use newsdex_core::persist::{load_index, save_neighbors, IndexPaths};
use newsdex_core::{Config, DocId, IdfMode, InvertedIndex, NeighborRecord, NeighborTable, PostingsList};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone)]
pub struct NeighborParams {
    pub k: usize,
    pub candidate_pool: usize,
    /// How many of a document's top terms are used to probe the index.
    pub probe_terms: usize,
    /// 0 means one thread per CPU.
    pub workers: usize,
    pub idf_mode: IdfMode,
}

impl From<&Config> for NeighborParams {
    fn from(config: &Config) -> Self {
        Self {
            k: config.recommend.k,
            candidate_pool: config.recommend.candidate_pool,
            probe_terms: config.recommend.probe_terms,
            workers: config.recommend.workers,
            idf_mode: config.ranking.idf,
        }
    }
}

/// Sparse TF-IDF vector sorted by term number.
#[derive(Debug, Default)]
struct DocVector {
    weights: Vec<(u32, f64)>,
    norm: f64,
}

struct Vectors<'a> {
    /// Postings in term-number order; term numbers follow lexical term order.
    postings: Vec<&'a PostingsList>,
    docs: HashMap<DocId, DocVector>,
}

impl<'a> Vectors<'a> {
    fn build(index: &'a InvertedIndex, idf_mode: IdfMode) -> Self {
        let mut terms: Vec<(&str, &PostingsList)> = index.terms().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut docs: HashMap<DocId, DocVector> = index.doc_ids().map(|id| (id, DocVector::default())).collect();
        for (term_no, (_, list)) in terms.iter().enumerate() {
            let idf = idf_mode.idf(index.num_docs(), list.document_frequency());
            if idf <= 0.0 {
                continue;
            }
            for entry in list.entries() {
                if let Some(vector) = docs.get_mut(&entry.doc_id) {
                    vector.weights.push((term_no as u32, entry.term_frequency as f64 * idf));
                }
            }
        }
        for vector in docs.values_mut() {
            vector.norm = vector.weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        }
        Self { postings: terms.into_iter().map(|(_, list)| list).collect(), docs }
    }

    fn neighbors_of(&self, doc_id: DocId, params: &NeighborParams) -> Vec<DocId> {
        let Some(target) = self.docs.get(&doc_id) else { return Vec::new() };
        if target.norm == 0.0 {
            return Vec::new();
        }

        let mut probes: Vec<(u32, f64)> = target.weights.clone();
        probes.sort_by(|a, b| cmp_desc(a.1, b.1).then(a.0.cmp(&b.0)));
        probes.truncate(params.probe_terms);

        let mut overlap: HashMap<DocId, u32> = HashMap::new();
        for (term_no, _) in &probes {
            for entry in self.postings[*term_no as usize].entries() {
                if entry.doc_id != doc_id {
                    *overlap.entry(entry.doc_id).or_insert(0) += 1;
                }
            }
        }
        let mut pool: Vec<(DocId, u32)> = overlap.into_iter().collect();
        pool.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        pool.truncate(params.candidate_pool);

        let mut ranked: Vec<(DocId, f64)> = pool
            .into_iter()
            .filter_map(|(candidate, _)| {
                let other = self.docs.get(&candidate)?;
                let sim = cosine(target, other);
                (sim > 0.0).then_some((candidate, sim))
            })
            .collect();
        ranked.sort_by(|a, b| cmp_desc(a.1, b.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(params.k).map(|(id, _)| id).collect()
    }
}

fn cosine(a: &DocVector, b: &DocVector) -> f64 {
    if a.norm == 0.0 || b.norm == 0.0 {
        return 0.0;
    }
    let (mut i, mut j, mut dot) = (0, 0, 0.0);
    while i < a.weights.len() && j < b.weights.len() {
        let (ta, wa) = a.weights[i];
        let (tb, wb) = b.weights[j];
        match ta.cmp(&tb) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                dot += wa * wb;
                i += 1;
                j += 1;
            }
        }
    }
    dot / (a.norm * b.norm)
}

fn cmp_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Compute one neighbor record per indexed document.
pub fn compute_neighbors(index: &InvertedIndex, params: &NeighborParams) -> Result<NeighborTable> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.workers)
        .build()
        .context("failed to build recommendation thread pool")?;

    let vectors = Vectors::build(index, params.idf_mode);
    let doc_ids: Vec<DocId> = index.doc_ids().collect();
    let records: Vec<NeighborRecord> = pool.install(|| {
        doc_ids
            .par_iter()
            .map(|&document_id| NeighborRecord { document_id, neighbors: vectors.neighbors_of(document_id, params) })
            .collect()
    });

    let mut table = NeighborTable::new(params.k);
    for record in records {
        table.insert(record);
    }
    let empty = table.records().filter(|r| r.neighbors.is_empty()).count();
    tracing::info!(docs = table.len(), without_neighbors = empty, k = params.k, "neighbors computed");
    Ok(table)
}

/// Load the persisted index, recompute every neighbor list, and atomically
/// replace the stored neighbor table.
pub fn recommend(config: &Config) -> Result<NeighborTable> {
    let paths = IndexPaths::new(&config.storage.index_dir);
    let index = load_index(&paths)
        .with_context(|| format!("failed to load index from {}", paths.root.display()))?;
    let table = compute_neighbors(&index, &NeighborParams::from(config))?;
    let created_at = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    save_neighbors(&paths, &table, &created_at).context("failed to persist neighbor table")?;
    Ok(table)
}
