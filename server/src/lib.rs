use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, HeaderValue, StatusCode}, routing::{get, post}, Json, Router};
use blogsearch_core::persist::load_search_artifacts;
use blogsearch_core::{SearchEngine, SearchHit, SearchRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 20 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub engine: Arc<RwLock<Arc<SearchEngine>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn engine(&self) -> Arc<SearchEngine> { Arc::clone(&self.engine.read()) }
}

fn load_engine(data_dir: &std::path::Path) -> Result<SearchEngine> {
    let (index, data) = load_search_artifacts(data_dir)?;
    Ok(SearchEngine::new(&index, data))
}

pub fn build_app(data_dir: String) -> Result<Router> {
    let data_dir = PathBuf::from(data_dir);
    let engine = load_engine(&data_dir)?;
    tracing::info!(posts = engine.len(), dir = %data_dir.display(), "search artifacts loaded");
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { data_dir, engine: Arc::new(RwLock::new(Arc::new(engine))), admin_token };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/post/:slug", get(post_handler))
        .route("/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors_layer(std::env::var("CORS_ALLOW_ORIGIN").ok().as_deref()))
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

/// Comma-separated origin list; anything unparseable or empty means any origin.
fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let mut results = state.engine().search(&params.q);
    let total_hits = results.len();
    results.truncate(params.k.clamp(1, 100));
    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn post_handler(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<SearchRecord>, (StatusCode, String)> {
    state
        .engine()
        .record(&slug)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("no post {slug}")))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let engine = load_engine(&state.data_dir).map_err(|err| {
        tracing::error!(error = %err, "reload failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {err:#}"))
    })?;
    let posts = engine.len();
    *state.engine.write() = Arc::new(engine);
    tracing::info!(posts, "search artifacts reloaded");
    Ok(Json(serde_json::json!({ "posts": posts })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
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
