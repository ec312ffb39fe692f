use anyhow::{Context, Result};
use newsdex_core::persist::{save_index, IndexPaths, MetaFile, FORMAT_VERSION};
use newsdex_core::{Config, DocId, DocumentStore, InvertedIndex, PartialIndex};
use rayon::prelude::*;
use time::format_description::well_known::Rfc3339;

/// Documents handed to one worker at a time.
const CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub title_weight: u32,
    /// 0 means one thread per CPU.
    pub workers: usize,
}

impl From<&Config> for IndexOptions {
    fn from(config: &Config) -> Self {
        Self { title_weight: config.index.title_weight, workers: config.index.workers }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub num_docs: u32,
    pub num_terms: usize,
    pub skipped_docs: usize,
}

/// Rebuild the inverted index from every document currently in `store`.
///
/// Documents are split into chunks tokenized on a bounded rayon pool; each chunk
/// produces a partial index and the partials are merged. A record that cannot be
/// read is logged and skipped.
pub fn construct_postings_lists(store: &DocumentStore, opts: &IndexOptions) -> Result<(InvertedIndex, IndexStats)> {
    let ids = store.ids();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers)
        .build()
        .context("failed to build indexing thread pool")?;

    let (partial, skipped_docs) = pool.install(|| {
        ids.par_chunks(CHUNK_SIZE)
            .map(|chunk| index_chunk(store, chunk, opts.title_weight))
            .reduce(|| (PartialIndex::default(), 0), |(a, sa), (b, sb)| (a.merge(b), sa + sb))
    });

    let index = partial.finish();
    let stats = IndexStats { num_docs: index.num_docs(), num_terms: index.num_terms(), skipped_docs };
    tracing::info!(num_docs = stats.num_docs, num_terms = stats.num_terms, skipped = stats.skipped_docs, "postings lists built");
    Ok((index, stats))
}

fn index_chunk(store: &DocumentStore, chunk: &[DocId], title_weight: u32) -> (PartialIndex, usize) {
    let mut partial = PartialIndex::default();
    let mut skipped = 0;
    for &id in chunk {
        match store.get(id) {
            Ok(Some(doc)) => partial.add_document(&doc, title_weight),
            Ok(None) => {
                tracing::warn!(doc_id = id, "document disappeared from store, skipping");
                skipped += 1;
            }
            Err(err) => {
                tracing::warn!(doc_id = id, error = %err, "failed to read document, skipping");
                skipped += 1;
            }
        }
    }
    (partial, skipped)
}

/// Build from the configured store and atomically replace the persisted index.
/// If anything fails before the final rename, the previous index stays in place.
pub fn build_index(config: &Config) -> Result<IndexStats> {
    let store = DocumentStore::open(&config.storage.doc_dir, &config.storage.encoding)
        .with_context(|| format!("failed to open document store {}", config.storage.doc_dir.display()))?;
    let (index, stats) = construct_postings_lists(&store, &IndexOptions::from(config))?;

    let paths = IndexPaths::new(&config.storage.index_dir);
    let meta = MetaFile {
        num_docs: stats.num_docs,
        num_terms: stats.num_terms,
        skipped_docs: stats.skipped_docs,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_index(&paths, &index, &meta).context("failed to persist index")?;
    tracing::info!(output = %paths.root.display(), "index build complete");
    Ok(stats)
}
