use crate::error::Result;
use crate::index::InvertedIndex;
use crate::neighbors::NeighborTable;
use crate::persist::{generation, load_index, load_neighbors, IndexPaths};
use crate::search::{IdfMode, SearchEngine};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::SystemTime;

/// A complete, immutable view of one index build and its neighbor table.
#[derive(Debug)]
pub struct Snapshot {
    pub engine: SearchEngine,
    pub neighbors: NeighborTable,
    generation: (Option<SystemTime>, Option<SystemTime>),
}

impl Snapshot {
    pub fn new(index: InvertedIndex, neighbors: NeighborTable, idf_mode: IdfMode) -> Self {
        Self { engine: SearchEngine::new(Arc::new(index), idf_mode), neighbors, generation: (None, None) }
    }

    pub fn load(paths: &IndexPaths, idf_mode: IdfMode) -> Result<Self> {
        let generation = generation(paths);
        let index = load_index(paths)?;
        let neighbors = load_neighbors(paths)?;
        Ok(Self { generation, ..Self::new(index, neighbors, idf_mode) })
    }
}

/// Shared handle to the current snapshot. Readers clone the inner `Arc` and keep
/// using it for the whole request, so a swap never affects a request in flight.
pub struct IndexHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl IndexHandle {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn swap(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        std::mem::replace(&mut *self.current.write(), Arc::new(snapshot))
    }

    /// Reload from disk if the files changed since the current snapshot was
    /// loaded. Returns whether a new snapshot was installed; on error the old
    /// one stays in place.
    pub fn reload_if_changed(&self, paths: &IndexPaths, idf_mode: IdfMode) -> Result<bool> {
        if generation(paths) == self.current().generation {
            return Ok(false);
        }
        let fresh = Snapshot::load(paths, idf_mode)?;
        self.swap(fresh);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PartialIndex;
    use crate::persist::{save_index, MetaFile, FORMAT_VERSION};
    use crate::search::{RankingMode, SearchRequest};
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn index_with(term: &str) -> InvertedIndex {
        let mut p = PartialIndex::default();
        p.add_counts(1, 0, HashMap::from([(term.to_string(), 1)]));
        p.finish()
    }

    fn meta() -> MetaFile {
        MetaFile { num_docs: 1, num_terms: 1, skipped_docs: 0, created_at: String::new(), version: FORMAT_VERSION }
    }

    #[test]
    fn readers_keep_their_snapshot_across_a_swap() {
        let handle = IndexHandle::new(Snapshot::new(index_with("old"), NeighborTable::default(), IdfMode::Plain));
        let before = handle.current();
        handle.swap(Snapshot::new(index_with("new"), NeighborTable::default(), IdfMode::Plain));

        let req = SearchRequest::new("old", RankingMode::Relevance);
        assert!(before.engine.search(&req).found);
        assert!(!handle.current().engine.search(&req).found);
    }

    #[test]
    fn reload_only_when_files_change() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        save_index(&paths, &index_with("first"), &meta()).unwrap();
        let handle = IndexHandle::new(Snapshot::load(&paths, IdfMode::Plain).unwrap());
        assert!(!handle.reload_if_changed(&paths, IdfMode::Plain).unwrap());

        std::fs::remove_file(paths.index()).unwrap();
        assert!(handle.reload_if_changed(&paths, IdfMode::Plain).is_err());
        let req = SearchRequest::new("first", RankingMode::Relevance);
        assert!(handle.current().engine.search(&req).found);
    }
}
