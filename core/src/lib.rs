pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod neighbors;
pub mod persist;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tokenizer;

pub use config::Config;
pub use document::{Document, NewDocument};
pub use error::{Error, Result};
pub use index::{DocId, DocStats, InvertedIndex, PartialIndex, PostingEntry, PostingsList};
pub use neighbors::{NeighborRecord, NeighborTable};
pub use search::{IdfMode, RankingMode, ScoredDoc, SearchEngine, SearchOutcome, SearchRequest};
pub use snapshot::{IndexHandle, Snapshot};
pub use store::{DocumentStore, InsertOutcome};
