use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use engine::generation::QueryAnalysis;
use engine::{EngineError, SearchEngine, SearchResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    /// Directory rebuilds read documents from.
    pub docs_root: PathBuf,
}

/// Engine failures mapped onto HTTP statuses; the body is `{"error": msg}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    NotReady(String),
    BuildFailed(String),
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let msg = err.to_string();
        match err {
            EngineError::InvalidQuery(_) | EngineError::InvalidConfig(_) => ApiError::BadRequest(msg),
            EngineError::DocumentNotFound(_) => ApiError::NotFound(msg),
            EngineError::IndexNotReady => ApiError::NotReady(msg),
            EngineError::RebuildInProgress => ApiError::Conflict(msg),
            EngineError::IndexBuild(_) => ApiError::BuildFailed(msg),
            _ => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::NotReady(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": msg, "suggestion": "POST /index/rebuild to build the index" }),
            ),
            ApiError::BuildFailed(msg) => (StatusCode::UNPROCESSABLE_ENTITY, json!({ "success": false, "error": msg })),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
    #[serde(default = "default_true")]
    pub include_snippets: bool,
    #[serde(default)]
    pub analyze_query: bool,
}
fn default_true() -> bool { true }

#[derive(Serialize)]
pub struct SearchReply {
    #[serde(flatten)]
    pub response: SearchResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_analysis: Option<QueryAnalysis>,
}

#[derive(Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_similar")]
    pub limit: usize,
}
fn default_similar() -> usize { 5 }

#[derive(Deserialize)]
pub struct DocParams {
    #[serde(default)]
    pub content: bool,
}

#[derive(Deserialize)]
pub struct AnalyzeParams {
    #[serde(default)]
    pub query: String,
}

fn cors_layer() -> CorsLayer {
    // CORS_ALLOW_ORIGIN is a comma-separated list; unset or unparsable means any origin
    let origins: Vec<_> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|val| val.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(search_get).post(search_post))
        .route("/stats", get(stats_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .route("/term/:term", get(term_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/similar/:doc_id", get(similar_handler))
        .route("/analyze", get(analyze_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<engine::Health> {
    Json(state.engine.health())
}

pub async fn search_get(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<SearchReply> {
    run_search(&state, params)
}

pub async fn search_post(State(state): State<AppState>, Json(params): Json<SearchParams>) -> ApiResult<SearchReply> {
    run_search(&state, params)
}

fn run_search(state: &AppState, params: SearchParams) -> ApiResult<SearchReply> {
    let response = state.engine.search(&params.query, params.limit, params.include_snippets)?;
    let query_analysis = if params.analyze_query { Some(state.engine.analyze_query(&params.query)?) } else { None };
    Ok(Json(SearchReply { response, query_analysis }))
}

pub async fn stats_handler(State(state): State<AppState>) -> ApiResult<engine::CorpusStatistics> {
    Ok(Json(state.engine.stats()?))
}

/// Rebuild from the configured document root on a blocking worker; queries
/// keep running against the current generation meanwhile.
pub async fn rebuild_handler(State(state): State<AppState>) -> ApiResult<engine::RebuildSummary> {
    let engine = state.engine.clone();
    let root = state.docs_root.clone();
    let summary = tokio::task::spawn_blocking(move || engine.rebuild_index(&root))
        .await
        .map_err(|e| ApiError::Internal(format!("rebuild task failed: {e}")))??;
    Ok(Json(summary))
}

pub async fn term_handler(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> ApiResult<engine::generation::TermStats> {
    Ok(Json(state.engine.term_stats(&term)?))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
    Query(params): Query<DocParams>,
) -> ApiResult<engine::generation::DocumentInfo> {
    Ok(Json(state.engine.document(doc_id, params.content)?))
}

pub async fn similar_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
    Query(params): Query<SimilarParams>,
) -> ApiResult<Vec<engine::generation::SimilarDocument>> {
    Ok(Json(state.engine.similar(doc_id, params.limit)?))
}

pub async fn analyze_handler(State(state): State<AppState>, Query(params): Query<AnalyzeParams>) -> ApiResult<QueryAnalysis> {
    Ok(Json(state.engine.analyze_query(&params.query)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode { ApiError::from(err).into_response().status() }

    #[test]
    fn engine_errors_map_to_statuses() {
        assert_eq!(status_of(EngineError::RebuildInProgress), StatusCode::CONFLICT);
        assert_eq!(status_of(EngineError::IndexNotReady), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(EngineError::InvalidQuery("empty".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(EngineError::DocumentNotFound(3)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(EngineError::IndexBuild("no documents".into())), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_of(EngineError::CorruptSnapshot("bad".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
