use crate::config::MAX_NEIGHBORS;
use crate::index::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nearest neighbors of one document, most similar first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub document_id: DocId,
    pub neighbors: Vec<DocId>,
}

/// One record per document, keyed for constant-time lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborTable {
    k: usize,
    records: BTreeMap<DocId, Vec<DocId>>,
}

impl NeighborTable {
    pub fn new(k: usize) -> Self {
        Self { k: k.min(MAX_NEIGHBORS), records: BTreeMap::new() }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Insert or replace the record for its document. The document itself and
    /// anything past `k` are dropped.
    pub fn insert(&mut self, record: NeighborRecord) {
        let NeighborRecord { document_id, mut neighbors } = record;
        neighbors.retain(|id| *id != document_id);
        neighbors.truncate(self.k);
        self.records.insert(document_id, neighbors);
    }

    /// Neighbors of `doc_id`; an unknown id yields an empty slice.
    pub fn lookup(&self, doc_id: DocId) -> &[DocId] {
        self.records.get(&doc_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = NeighborRecord> + '_ {
        self.records
            .iter()
            .map(|(&document_id, neighbors)| NeighborRecord { document_id, neighbors: neighbors.clone() })
    }
}

impl FromIterator<NeighborRecord> for NeighborTable {
    fn from_iter<I: IntoIterator<Item = NeighborRecord>>(iter: I) -> Self {
        let mut table = NeighborTable::new(MAX_NEIGHBORS);
        for record in iter {
            table.insert(record);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_empty() {
        let table = NeighborTable::new(5);
        assert!(table.lookup(42).is_empty());
    }

    #[test]
    fn insert_drops_self_and_caps_length() {
        let mut table = NeighborTable::new(3);
        table.insert(NeighborRecord { document_id: 1, neighbors: vec![1, 4, 2, 9, 7] });
        assert_eq!(table.lookup(1), &[4, 2, 9]);
        table.insert(NeighborRecord { document_id: 1, neighbors: vec![8] });
        assert_eq!(table.lookup(1), &[8]);
    }

    #[test]
    fn k_never_exceeds_five() {
        assert_eq!(NeighborTable::new(50).k(), MAX_NEIGHBORS);
    }
}
