//! On-disk layout of a built index directory.
//!
//! Every file is written to `<name>.tmp` and renamed into place, so a reader
//! loads either the previous complete file or the new one.

use crate::error::Result;
use crate::index::InvertedIndex;
use crate::neighbors::NeighborTable;
use crate::store::write_atomic;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub skipped_docs: usize,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct NeighborFile {
    created_at: String,
    table: NeighborTable,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn neighbors(&self) -> PathBuf { self.root.join("neighbors.bin") }
}

/// Write the meta file and then the index. The index rename is the commit
/// point: a failure before it leaves the previous `index.bin` untouched.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let encoded = bincode::serialize(index)?;
    write_atomic(&paths.meta(), serde_json::to_string_pretty(meta)?.as_bytes())?;
    write_atomic(&paths.index(), &encoded)?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let buf = fs::read(paths.index())?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let buf = fs::read_to_string(paths.meta())?;
    Ok(serde_json::from_str(&buf)?)
}

pub fn save_neighbors(paths: &IndexPaths, table: &NeighborTable, created_at: &str) -> Result<()> {
    create_dir_all(&paths.root)?;
    let file = NeighborFile { created_at: created_at.to_string(), table: table.clone() };
    write_atomic(&paths.neighbors(), &bincode::serialize(&file)?)?;
    Ok(())
}

/// Load the neighbor table; before the first recommendation run there is none
/// and every lookup is empty.
pub fn load_neighbors(paths: &IndexPaths) -> Result<NeighborTable> {
    let path = paths.neighbors();
    if !path.exists() {
        return Ok(NeighborTable::default());
    }
    let file: NeighborFile = bincode::deserialize(&fs::read(path)?)?;
    Ok(file.table)
}

/// Modification times of the index and neighbor files, used to detect a rebuild.
pub fn generation(paths: &IndexPaths) -> (Option<SystemTime>, Option<SystemTime>) {
    let mtime = |p: PathBuf| fs::metadata(p).and_then(|m| m.modified()).ok();
    (mtime(paths.index()), mtime(paths.neighbors()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::NeighborRecord;
    use crate::index::PartialIndex;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn meta(num_docs: u32) -> MetaFile {
        MetaFile { num_docs, num_terms: 1, skipped_docs: 0, created_at: "2024-01-01T00:00:00Z".into(), version: FORMAT_VERSION }
    }

    #[test]
    fn index_survives_save_and_load() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("idx"));
        let mut p = PartialIndex::default();
        p.add_counts(1, 0, HashMap::from([("rust".to_string(), 2)]));
        let index = p.finish();
        save_index(&paths, &index, &meta(1)).unwrap();
        assert_eq!(load_index(&paths).unwrap(), index);
        assert_eq!(load_meta(&paths).unwrap(), meta(1));
        assert!(!dir.path().join("idx/index.bin.tmp").exists());
    }

    #[test]
    fn failed_meta_write_keeps_previous_index() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut p = PartialIndex::default();
        p.add_counts(1, 0, HashMap::from([("old".to_string(), 1)]));
        let old = p.finish();
        save_index(&paths, &old, &meta(1)).unwrap();

        // A directory where the meta temp file goes makes the meta write fail.
        std::fs::create_dir(dir.path().join("meta.json.tmp")).unwrap();
        let mut p = PartialIndex::default();
        p.add_counts(1, 0, HashMap::from([("new".to_string(), 1)]));
        assert!(save_index(&paths, &p.finish(), &meta(2)).is_err());
        assert_eq!(load_index(&paths).unwrap(), old);
        assert_eq!(load_meta(&paths).unwrap(), meta(1));
    }

    #[test]
    fn neighbors_default_to_empty_when_absent() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        assert!(load_neighbors(&paths).unwrap().is_empty());

        let table: NeighborTable = [NeighborRecord { document_id: 1, neighbors: vec![2] }].into_iter().collect();
        save_neighbors(&paths, &table, "2024-01-01T00:00:00Z").unwrap();
        assert_eq!(load_neighbors(&paths).unwrap().lookup(1), &[2]);
    }
}
