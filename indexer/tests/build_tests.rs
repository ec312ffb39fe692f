use newsdex_core::persist::{load_index, load_meta, IndexPaths};
use newsdex_core::{Config, DocumentStore, NewDocument};
use newsdex_indexer::{build_index, construct_postings_lists, IndexOptions};
use std::path::Path;
use tempfile::tempdir;
use time::macros::datetime;

fn fill_store(dir: &Path, bodies: &[&str]) -> DocumentStore {
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

fn config_for(root: &Path) -> Config {
    let text = format!(
        r#"
        [crawl]
        root_url = "https://news.example.com"
        listing_url_template = "https://news.example.com/list?pn={{offset}}"

        [storage]
        doc_dir = "{}"
        index_dir = "{}"
        "#,
        root.join("docs").display(),
        root.join("index").display()
    );
    Config::from_toml_str(&text).unwrap()
}

#[test]
fn postings_are_sorted_and_unique() {
    let dir = tempdir().unwrap();
    let bodies: Vec<String> = (0..300).map(|i| format!("common story number{} shared{}", i, i % 7)).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    let store = fill_store(dir.path(), &refs);

    let (index, stats) = construct_postings_lists(&store, &IndexOptions { title_weight: 1, workers: 4 }).unwrap();
    assert_eq!(stats.num_docs, 300);
    assert_eq!(stats.skipped_docs, 0);
    for (term, list) in index.terms() {
        let ids: Vec<u32> = list.entries().iter().map(|e| e.doc_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "postings for {term} not strictly increasing");
        assert_eq!(list.document_frequency() as usize, ids.len());
    }
    assert_eq!(index.postings("common").unwrap().document_frequency(), 300);
}

#[test]
fn worker_count_does_not_change_the_index() {
    let dir = tempdir().unwrap();
    let bodies: Vec<String> = (0..200).map(|i| format!("topic{} topic{} update", i % 11, i % 5)).collect();
    let refs: Vec<&str> = bodies.iter().map(String::as_str).collect();
    let store = fill_store(dir.path(), &refs);

    let (single, _) = construct_postings_lists(&store, &IndexOptions { title_weight: 2, workers: 1 }).unwrap();
    let (many, _) = construct_postings_lists(&store, &IndexOptions { title_weight: 2, workers: 8 }).unwrap();
    assert_eq!(single, many);
}

#[test]
fn unreadable_document_is_skipped() {
    let dir = tempdir().unwrap();
    let store = fill_store(dir.path(), &["alpha story", "beta story", "gamma story"]);
    std::fs::write(dir.path().join("2.json"), b"garbage").unwrap();

    let (index, stats) = construct_postings_lists(&store, &IndexOptions { title_weight: 1, workers: 2 }).unwrap();
    assert_eq!(stats.skipped_docs, 1);
    assert_eq!(stats.num_docs, 2);
    assert!(index.postings("beta").is_none());
    assert_eq!(index.postings("story").unwrap().document_frequency(), 2);
}

#[test]
fn build_persists_and_failed_rebuild_keeps_previous_index() {
    let dir = tempdir().unwrap();
    let mut config = config_for(dir.path());
    fill_store(&config.storage.doc_dir, &["election results", "weather report"]);

    let stats = build_index(&config).unwrap();
    assert_eq!(stats.num_docs, 2);
    let paths = IndexPaths::new(&config.storage.index_dir);
    let before = load_index(&paths).unwrap();
    assert_eq!(load_meta(&paths).unwrap().num_docs, 2);

    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    config.storage.doc_dir = blocker;
    assert!(build_index(&config).is_err());
    assert_eq!(load_index(&paths).unwrap(), before);
}
