pub mod error;
pub mod tagger;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tagsim_core::{Hit, QueryEngine, DEFAULT_K};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use tagger::{CommandTagger, Tagger, TaggerError};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

#[derive(Deserialize)]
pub struct SearchParams {
    pub caption: String,
    pub exclude: Option<String>,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<Hit>,
}

#[derive(Serialize)]
pub struct SimilarResponse {
    pub query_image: String,
    pub caption: String,
    pub took_s: f64,
    pub results: Vec<Hit>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub num_docs: usize,
    pub num_terms: usize,
    pub tokenizer: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub index_path: PathBuf,
    pub tagger: Arc<dyn Tagger>,
    pub admin_token: Option<String>,
    pub max_upload_bytes: usize,
}

pub struct ServerConfig {
    pub index_path: PathBuf,
    pub tagger: Arc<dyn Tagger>,
    pub max_upload_bytes: usize,
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    // Start even without an index; queries answer 503 until /admin/reload succeeds
    let engine = Arc::new(QueryEngine::new());
    if let Err(e) = engine.load(&config.index_path) {
        tracing::warn!(path = %config.index_path.display(), error = %e, "starting without a caption index");
    }
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let state = AppState { engine, index_path: config.index_path, tagger: config.tagger, admin_token, max_upload_bytes: config.max_upload_bytes };

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

    Ok(router(state).layer(cors))
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/similar", post(similar_handler))
        .route("/stats", get(stats_handler))
        .route("/admin/reload", post(reload_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let caption = params.caption.trim();
    let k = params.k.max(1).min(100);
    let results = state.engine.query(caption, params.exclude.as_deref(), k)?;
    Ok(Json(SearchResponse { query: caption.to_string(), took_s: start.elapsed().as_secs_f64(), results }))
}

/// Caption an uploaded image with the tagger, then rank the index against that caption.
pub async fn similar_handler(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<SimilarResponse>, ApiError> {
    let start = std::time::Instant::now();
    let mut upload: Option<(String, axum::body::Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
        if field.name() != Some("file") { continue; }
        let name = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((name, data));
        break;
    }
    let (raw_name, data) = upload.ok_or_else(|| ApiError::BadRequest("no file selected".into()))?;
    if raw_name.is_empty() {
        return Err(ApiError::BadRequest("no file selected".into()));
    }
    if !allowed_file(&raw_name) {
        return Err(ApiError::BadRequest(format!("unsupported file type; expected one of {}", ALLOWED_EXTENSIONS.join(", "))));
    }
    let filename = sanitize_filename(&raw_name);

    // One scratch dir per request; removed when `scratch` drops
    let scratch = tempfile::tempdir().map_err(|e| ApiError::Internal(e.to_string()))?;
    let image_path = scratch.path().join(&filename);
    tokio::fs::write(&image_path, &data).await.map_err(|e| ApiError::Internal(e.to_string()))?;

    let caption = state.tagger.tag(&image_path).await?;
    let results = state.engine.query_top_k(&caption, Some(&filename))?;
    tracing::info!(query_image = %filename, hits = results.len(), "similar images");
    Ok(Json(SimilarResponse { query_image: filename, caption, took_s: start.elapsed().as_secs_f64(), results }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let index = state.engine.snapshot()?;
    Ok(Json(StatsResponse { num_docs: index.num_docs(), num_terms: index.num_terms(), tokenizer: index.space.tokenizer.id() }))
}

/// Reload the index file and swap it in whole.
pub async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<StatsResponse>, ApiError> {
    authorize(&state, &headers)?;
    let engine = Arc::clone(&state.engine);
    let path = state.index_path.clone();
    tokio::task::spawn_blocking(move || engine.load(path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    stats_handler(State(state)).await
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}

fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Keep only the final path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base.chars().map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' }).collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_extensions_allowed() {
        assert!(allowed_file("cat.PNG"));
        assert!(allowed_file("a.b.jpeg"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("png"));
    }

    #[test]
    fn sanitize_strips_directories_and_odd_chars() {
        assert_eq!(sanitize_filename("../../etc/my cat.png"), "my_cat.png");
        assert_eq!(sanitize_filename("C:\\Users\\x\\img 01.jpg"), "img_01.jpg");
        assert_eq!(sanitize_filename(".hidden.gif"), "hidden.gif");
    }
}
