pub mod summary;

use anyhow::{Context, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use newsdex_core::persist::IndexPaths;
use newsdex_core::{Config, DocId, Document, DocumentStore, IdfMode, IndexHandle, SearchRequest, Snapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use summary::{SummaryGenerator, SummaryItem};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default)]
    pub summary: bool,
}
fn default_mode() -> String { "relevance".into() }
fn default_page() -> usize { 1 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: String,
    pub found: bool,
    pub total_hits: usize,
    pub page: usize,
    pub pages: usize,
    pub took_s: f64,
    /// Every matching id in rank order; `results` holds only the requested page.
    pub ids: Vec<DocId>,
    pub results: Vec<SearchHit>,
    pub summary: Option<String>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub published_at: String,
}

#[derive(Serialize)]
pub struct RelatedDoc {
    pub doc_id: DocId,
    pub title: String,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
    pub body: String,
    pub snippet: String,
    pub published_at: String,
    pub related: Vec<RelatedDoc>,
}

#[derive(Serialize)]
pub struct NeighborsResponse {
    pub doc_id: DocId,
    pub neighbors: Vec<DocId>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexHandle>,
    pub store: Arc<DocumentStore>,
    pub summarizer: Arc<dyn SummaryGenerator>,
    pub page_size: usize,
    pub summary_timeout: Duration,
}

impl AppState {
    /// Open the document store and load the current index snapshot.
    pub fn from_config(config: &Config) -> Result<Self> {
        let paths = IndexPaths::new(&config.storage.index_dir);
        let snapshot = Snapshot::load(&paths, config.ranking.idf)
            .with_context(|| format!("failed to load index from {}", paths.root.display()))?;
        let store = DocumentStore::open(&config.storage.doc_dir, &config.storage.encoding)?;
        Ok(Self {
            index: Arc::new(IndexHandle::new(snapshot)),
            store: Arc::new(store),
            summarizer: summary::from_config(&config.summary)?,
            page_size: config.server.page_size,
            summary_timeout: Duration::from_secs(config.summary.timeout_secs),
        })
    }

    fn document(&self, doc_id: DocId) -> Option<Document> {
        match self.store.get(doc_id) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(doc_id, error = %err, "failed to read document");
                None
            }
        }
    }
}

pub fn build_app(state: AppState, cors_allow_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_allow_origins.iter().filter_map(|s| s.trim().parse().ok()).collect();
    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/doc/:doc_id/neighbors", get(neighbors_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let Query(params) = params.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;
    let request = SearchRequest::parse(params.q.clone(), &params.mode)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let snapshot = state.index.current();
    let outcome = snapshot.engine.search(&request);
    let ids = outcome.ids();
    let total_hits = ids.len();
    let page_size = state.page_size.max(1);
    let pages = total_hits.div_ceil(page_size);
    let page = params.page.max(1);

    let results: Vec<SearchHit> = outcome
        .results
        .iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .filter_map(|hit| {
            let doc = state.document(hit.doc_id)?;
            Some(SearchHit {
                doc_id: hit.doc_id,
                score: hit.score,
                snippet: doc.snippet(),
                published_at: doc.published_rfc3339(),
                title: doc.title,
                url: doc.url,
            })
        })
        .collect();

    let summary = if params.summary && page == 1 && !results.is_empty() {
        let items: Vec<SummaryItem> =
            results.iter().map(|h| SummaryItem { title: h.title.clone(), snippet: h.snippet.clone() }).collect();
        match tokio::time::timeout(state.summary_timeout, state.summarizer.generate_summary(&params.q, &items)).await {
            Ok(summary) => summary,
            Err(_) => {
                tracing::warn!(query = %params.q, "summary timed out");
                None
            }
        }
    } else {
        None
    };

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, mode = %request.mode, total_hits, "search served");
    Ok(Json(SearchResponse {
        query: params.q,
        mode: request.mode.to_string(),
        found: outcome.found,
        total_hits,
        page,
        pages,
        took_s: elapsed.as_secs_f64(),
        ids,
        results,
        summary,
    }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<DocResponse>, ApiError> {
    let doc = state
        .document(doc_id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("document {doc_id} not found")))?;
    let snapshot = state.index.current();
    let related = snapshot
        .neighbors
        .lookup(doc_id)
        .iter()
        .filter_map(|&id| state.document(id).map(|d| RelatedDoc { doc_id: id, title: d.title }))
        .collect();
    Ok(Json(DocResponse {
        doc_id,
        snippet: doc.snippet(),
        published_at: doc.published_rfc3339(),
        title: doc.title,
        url: doc.url,
        body: doc.body,
        related,
    }))
}

pub async fn neighbors_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Json<NeighborsResponse> {
    let snapshot = state.index.current();
    Json(NeighborsResponse { doc_id, neighbors: snapshot.neighbors.lookup(doc_id).to_vec() })
}

/// Poll the index directory and swap in a fresh snapshot after a rebuild.
pub fn spawn_reloader(handle: Arc<IndexHandle>, paths: IndexPaths, idf_mode: IdfMode, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let (handle, paths) = (handle.clone(), paths.clone());
            match tokio::task::spawn_blocking(move || handle.reload_if_changed(&paths, idf_mode)).await {
                Ok(Ok(true)) => tracing::info!("index snapshot reloaded"),
                Ok(Ok(false)) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, "index reload failed, keeping current snapshot"),
                Err(err) => tracing::warn!(error = %err, "index reload task panicked"),
            }
        }
    });
}
