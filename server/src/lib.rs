use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use sift_core::tokenizer::tokenize_words;
use sift_core::topics::load_topics;
use sift_core::{CollectionConfig, DocId, Engine, EngineHandle, ExpandedQuery, SiftError};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub expand: bool,
    /// Comma-separated topic labels
    #[serde(default)]
    pub topics: Option<String>,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct BooleanParams {
    pub q: String,
    #[serde(default)]
    pub topics: Option<String>,
}

#[derive(Deserialize)]
pub struct CompleteParams {
    pub q: String,
}

#[derive(Deserialize)]
pub struct ExpandRequest {
    pub tokens: Vec<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<ExpandedQuery>,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub topic: String,
    pub snippet: Option<String>,
}

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<BooleanHit>,
}

#[derive(Serialize)]
pub struct BooleanHit {
    pub doc_id: DocId,
    pub title: String,
}

#[derive(Serialize)]
pub struct TopicsResponse {
    pub topics: Vec<String>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub query: String,
    pub suggestions: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineHandle>,
    /// Normalized topic list; empty when the server runs without one
    pub topics: Arc<Vec<String>>,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, String);

fn api_error(err: SiftError) -> ApiError {
    let status = if err.is_query_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
    if status.is_server_error() {
        tracing::error!(error = %err, "query failed");
    }
    (status, err.to_string())
}

pub fn build_app(index_dir: String, collection: String, topics_file: Option<String>) -> Result<Router> {
    // Load every artifact once at startup
    let handle = EngineHandle::open(CollectionConfig::new(&index_dir, &collection))?;
    let topics = match &topics_file {
        Some(path) => load_topics(path, handle.snapshot().config())?,
        None => Vec::new(),
    };
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { engine: Arc::new(handle), topics: Arc::new(topics), admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/boolean", get(boolean_handler))
        .route("/search", get(search_handler))
        .route("/expand", post(expand_handler))
        .route("/complete", get(complete_handler))
        .route("/topics", get(topics_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn split_topics(topics: &Option<String>) -> Vec<String> {
    topics
        .as_deref()
        .map(|t| t.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Normalize the `topics=` labels; with a topic list loaded, unknown labels are rejected.
fn selected_topics(state: &AppState, engine: &Engine, raw: &Option<String>) -> Result<Vec<String>, ApiError> {
    let mut labels = Vec::new();
    for raw_label in split_topics(raw) {
        let Some(label) = engine.topic_index().normalize(&raw_label) else { continue };
        if !state.topics.is_empty() && !state.topics.contains(&label) {
            return Err((StatusCode::BAD_REQUEST, format!("unknown topic '{raw_label}'")));
        }
        labels.push(label);
    }
    Ok(labels)
}

fn title_of(engine: &Engine, doc_id: DocId) -> String {
    engine.document(doc_id).map(|d| d.title.clone()).unwrap_or_default()
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<BooleanParams>) -> Result<Json<BooleanResponse>, ApiError> {
    let start = std::time::Instant::now();
    let engine = state.engine.snapshot();
    let ids = engine.evaluate_boolean(&params.q).map_err(api_error)?;
    let topics = selected_topics(&state, &engine, &params.topics)?;
    let ids = engine.topic_index().filter_labels(&topics).filter_ids(ids);
    let results: Vec<BooleanHit> = ids.into_iter().map(|doc_id| BooleanHit { doc_id, title: title_of(&engine, doc_id) }).collect();
    Ok(Json(BooleanResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits: results.len(), results }))
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let engine = state.engine.snapshot();
    let topics = selected_topics(&state, &engine, &params.topics)?;
    let (expanded, scored) = if params.expand {
        let (expanded, hits) = engine.rank_expanded(&params.q);
        (Some(expanded), hits)
    } else {
        (None, engine.rank_vector_space(&params.q))
    };
    let scored = engine.topic_index().filter_labels(&topics).filter_scored(scored);
    let total_hits = scored.len();
    let k = params.k.max(1).min(100);

    // Capture raw query terms for highlighting
    let raw_terms: Vec<String> = params
        .q
        .split_whitespace()
        .map(|s| s.to_string())
        .collect();
    let mut results: Vec<SearchHit> = Vec::new();
    for hit in scored.into_iter().take(k) {
        if let Some(doc) = engine.document(hit.doc_id) {
            let snippet = snippet_from_text(&doc.content, &raw_terms);
            results.push(SearchHit { doc_id: hit.doc_id, score: hit.score, title: doc.title.clone(), topic: doc.topic.clone(), snippet });
        }
    }

    Ok(Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits, expanded, results }))
}

pub async fn expand_handler(State(state): State<AppState>, Json(req): Json<ExpandRequest>) -> Json<ExpandedQuery> {
    let engine = state.engine.snapshot();
    let tokens = tokenize_words(&req.tokens, engine.config());
    Json(engine.expand_query(&tokens))
}

pub async fn topics_handler(State(state): State<AppState>) -> Json<TopicsResponse> {
    Json(TopicsResponse { topics: state.topics.as_ref().clone() })
}

pub async fn complete_handler(State(state): State<AppState>, Query(params): Query<CompleteParams>) -> Result<Json<CompleteResponse>, ApiError> {
    let suggestions = state.engine.snapshot().suggest_completions(&params.q).map_err(api_error)?;
    Ok(Json(CompleteResponse { query: params.q, suggestions }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Result<Json<serde_json::Value>, ApiError> {
    let engine = state.engine.snapshot();
    match engine.document(doc_id) {
        Some(doc) => Ok(Json(serde_json::json!(doc))),
        None => Err((StatusCode::NOT_FOUND, "not found".into())),
    }
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state.engine.reload().map_err(|e| {
        tracing::error!(error = %e, "reload failed, keeping previous snapshot");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let num_docs = state.engine.snapshot().num_docs();
    Ok(Json(serde_json::json!({ "reloaded": true, "num_docs": num_docs })))
}

fn snippet_from_text(text: &str, raw_terms: &[String]) -> Option<String> {
    if text.is_empty() { return None; }
    // find first match (case-insensitive) of any raw term
    let first_idx = raw_terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .find_map(|t| find_case_insensitive(text, t));
    let snippet: String = match first_idx {
        Some(idx) => {
            let start = floor_char_boundary(text, idx.saturating_sub(100));
            let end = floor_char_boundary(text, (idx + 200).min(text.len()));
            text[start..end].to_string()
        }
        None => text.chars().take(200).collect(),
    };
    Some(highlight_terms(&snippet, raw_terms))
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Byte offset in `haystack` of the first case-insensitive match.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let pat = regex::RegexBuilder::new(&regex::escape(needle)).case_insensitive(true).build().ok()?;
    pat.find(haystack).map(|m| m.start())
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    let mut s = snippet.to_string();
    for t in terms {
        if t.trim().is_empty() { continue; }
        let Ok(pat) = regex::RegexBuilder::new(&regex::escape(t)).case_insensitive(true).build() else { continue };
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
