use newsdex_core::persist::{load_neighbors, IndexPaths};
use newsdex_core::{Config, DocumentStore, IdfMode, InvertedIndex, NewDocument};
use newsdex_indexer::{build_index, construct_postings_lists, IndexOptions};
use newsdex_recommender::{compute_neighbors, recommend, NeighborParams};
use std::path::Path;
use tempfile::tempdir;
use time::macros::datetime;

fn params(k: usize, workers: usize) -> NeighborParams {
    NeighborParams { k, candidate_pool: 25, probe_terms: 20, workers, idf_mode: IdfMode::Plain }
}

fn store_with(dir: &Path, bodies: &[&str]) -> DocumentStore {
    let store = DocumentStore::open(dir, "utf-8").unwrap();
    for (i, body) in bodies.iter().enumerate() {
        store
            .insert(NewDocument {
                url: format!("https://news.example.com/{i}.html"),
                title: String::new(),
                body: body.to_string(),
                published_at: datetime!(2024-05-01 12:00 UTC),
            })
            .unwrap();
    }
    store
}

fn index_of(dir: &Path, bodies: &[&str]) -> InvertedIndex {
    let store = store_with(dir, bodies);
    construct_postings_lists(&store, &IndexOptions { title_weight: 0, workers: 2 }).unwrap().0
}

#[test]
fn election_scenario() {
    let dir = tempdir().unwrap();
    let index = index_of(
        dir.path(),
        &[
            "local election results released today",
            "election results disputed after recount",
            "weather forecast sunny tomorrow",
        ],
    );
    let table = compute_neighbors(&index, &params(5, 2)).unwrap();
    assert_eq!(table.lookup(1), &[2]);
    assert_eq!(table.lookup(2), &[1]);
    assert!(table.lookup(3).is_empty());
}

#[test]
fn records_exclude_self_and_respect_k() {
    let dir = tempdir().unwrap();
    let bodies: Vec<String> = (0..40).map(|i| format!("budget vote parliament topic{} region{}", i % 4, i % 3)).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    let index = index_of(dir.path(), &refs);

    for k in [1, 3, 5] {
        let table = compute_neighbors(&index, &params(k, 4)).unwrap();
        assert_eq!(table.len(), 40);
        for record in table.records() {
            assert!(!record.neighbors.contains(&record.document_id));
            assert!(record.neighbors.len() <= k);
        }
    }
}

#[test]
fn fewer_candidates_than_k_gives_shorter_list() {
    let dir = tempdir().unwrap();
    let index = index_of(dir.path(), &["river flood warning", "river flood damage", "stock market news", "football final"]);
    let table = compute_neighbors(&index, &params(5, 1)).unwrap();
    assert_eq!(table.lookup(1), &[2]);
    assert!(table.lookup(4).is_empty());
}

#[test]
fn worker_count_does_not_change_neighbors() {
    let dir = tempdir().unwrap();
    let bodies: Vec<String> = (0..60).map(|i| format!("storm{} coast{} rain wind{}", i % 5, i % 7, i % 3)).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    let index = index_of(dir.path(), &refs);
    let one = compute_neighbors(&index, &params(5, 1)).unwrap();
    let many = compute_neighbors(&index, &params(5, 8)).unwrap();
    assert_eq!(one, many);
}

#[test]
fn recommend_persists_table() {
    let dir = tempdir().unwrap();
    let text = format!(
        r#"
        [crawl]
        root_url = "https://news.example.com"
        listing_url_template = "https://news.example.com/list?pn={{offset}}"

        [storage]
        doc_dir = "{}"
        index_dir = "{}"
        "#,
        dir.path().join("docs").display(),
        dir.path().join("index").display()
    );
    let config = Config::from_toml_str(&text).unwrap();
    store_with(&config.storage.doc_dir, &["flood warning river", "river flood rescue", "market report"]);
    build_index(&config).unwrap();

    let table = recommend(&config).unwrap();
    let stored = load_neighbors(&IndexPaths::new(&config.storage.index_dir)).unwrap();
    assert_eq!(stored, table);
    assert_eq!(stored.lookup(1), &[2]);
    assert!(stored.lookup(99).is_empty());
}
