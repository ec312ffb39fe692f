//! Durable per-document records, one JSON file per document under a directory.
//!
//! Records are written to a temporary file and renamed into place, so readers in
//! other processes (indexer, server) never see a partial record. The in-memory
//! URL map is rebuilt from disk on open and guards against duplicate ingestion.

use crate::config::check_encoding;
use crate::document::{Document, NewDocument};
use crate::error::{Error, Result};
use crate::index::DocId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const RECORD_EXT: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(DocId),
    /// The URL was already stored under this id; nothing was written.
    Duplicate(DocId),
}

#[derive(Default)]
struct StoreState {
    urls: HashMap<String, DocId>,
    ids: Vec<DocId>,
    next_id: DocId,
}

pub struct DocumentStore {
    root: PathBuf,
    state: Mutex<StoreState>,
}

impl DocumentStore {
    /// Open (creating if needed) the store at `root`. Only UTF-8 is accepted as `encoding`.
    pub fn open<P: AsRef<Path>>(root: P, encoding: &str) -> Result<Self> {
        check_encoding(encoding)?;
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let mut state = StoreState { next_id: 1, ..Default::default() };
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            let Some(id) = record_id(&path) else { continue };
            let Some(after) = id.checked_add(1) else {
                tracing::warn!(doc_id = id, path = %path.display(), "skipping record with out-of-range id");
                continue;
            };
            state.next_id = state.next_id.max(after);
            match read_record(&path) {
                Ok(doc) => {
                    state.urls.insert(doc.url, id);
                    state.ids.push(id);
                }
                Err(err) => tracing::warn!(doc_id = id, error = %err, "skipping unreadable document record"),
            }
        }
        state.ids.sort_unstable();
        tracing::debug!(root = %root.display(), docs = state.ids.len(), next_id = state.next_id, "document store opened");
        Ok(Self { root, state: Mutex::new(state) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `doc` under a fresh id unless its URL is already stored.
    pub fn insert(&self, doc: NewDocument) -> Result<InsertOutcome> {
        let mut state = self.state.lock();
        if let Some(&id) = state.urls.get(&doc.url) {
            return Ok(InsertOutcome::Duplicate(id));
        }
        let id = state.next_id;
        let doc = doc.with_id(id);
        write_atomic(&self.record_path(id), &serde_json::to_vec_pretty(&doc)?)?;
        state.next_id = id + 1;
        state.urls.insert(doc.url, id);
        state.ids.push(id);
        Ok(InsertOutcome::Inserted(id))
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.state.lock().urls.contains_key(url)
    }

    /// Read a record straight from disk. A missing file is `Ok(None)`.
    pub fn get(&self, id: DocId) -> Result<Option<Document>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        read_record(&path).map(Some)
    }

    /// Ids of all readable records, ascending.
    pub fn ids(&self) -> Vec<DocId> {
        self.state.lock().ids.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record_path(&self, id: DocId) -> PathBuf {
        self.root.join(format!("{id}.{RECORD_EXT}"))
    }
}

fn record_id(path: &Path) -> Option<DocId> {
    if path.extension().and_then(|s| s.to_str()) != Some(RECORD_EXT) {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok().filter(|id| *id >= 1)
}

fn read_record(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    let doc: Document = serde_json::from_slice(&bytes)
        .map_err(|e| Error::CorruptRecord { path: path.to_path_buf(), reason: e.to_string() })?;
    if Some(doc.id) != record_id(path) {
        return Err(Error::CorruptRecord { path: path.to_path_buf(), reason: format!("record claims id {}", doc.id) });
    }
    Ok(doc)
}

/// Write `bytes` next to `path` and rename over it.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
