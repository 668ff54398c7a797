use anyhow::Result;
use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use reelrank_core::request::DEFAULT_COUNT;
use reelrank_core::{load_catalog, EngineConfig, EngineError, FeedbackEvent, ItemSnapshot, QueryLog, QueryRequest, Recommender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct RecommendationParams {
    pub query: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_COUNT }

#[derive(Serialize)]
pub struct RecommendationResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<MovieHit>,
}

#[derive(Serialize)]
pub struct MovieHit {
    pub id: u32,
    pub movie_name: String,
    pub poster_path: Option<String>,
    pub overview: String,
    pub genres: Vec<String>,
    pub similarity: f32,
    pub popularity: f64,
    pub score: f64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Recommender>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Load the catalog, open the query log and replay it. Nothing is served until this returns.
pub fn load_engine(catalog_path: &str, log_dir: &str, config_path: Option<&str>) -> Result<Recommender> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let records = load_catalog(catalog_path)?;
    let log = QueryLog::open(log_dir)?;
    tracing::info!(catalog_path, log_dir, records = records.len(), logged = log.len(), "initializing recommender");
    Ok(Recommender::initialize(records, log, config)?)
}

pub fn build_app(engine: Arc<Recommender>) -> Router {
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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/recommendations", post(recommend_handler))
        .route("/feedback", post(feedback_handler))
        .route("/items/:id", get(item_handler))
        .with_state(AppState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn recommend_handler(State(state): State<AppState>, Json(params): Json<RecommendationParams>) -> Json<RecommendationResponse> {
    let start = std::time::Instant::now();
    let request = QueryRequest {
        text: params.query.clone(),
        count: params.k.max(1).min(100),
        age: params.age,
        genre_preferences: params.genres,
        gender: params.gender,
        country: params.country,
    };
    let results = state
        .engine
        .recommend(&request)
        .into_iter()
        .map(|r| MovieHit {
            id: r.id,
            movie_name: r.title,
            poster_path: r.poster_path,
            overview: r.overview,
            genres: r.genres,
            similarity: r.similarity,
            popularity: r.popularity,
            score: r.score,
        })
        .collect();
    Json(RecommendationResponse { query: params.query, took_s: start.elapsed().as_secs_f64(), results })
}

pub async fn feedback_handler(State(state): State<AppState>, Json(event): Json<FeedbackEvent>) -> Result<Json<serde_json::Value>, ApiError> {
    // Feedback fsyncs the query log; keep that off the async workers
    let engine = state.engine.clone();
    let receipt = tokio::task::spawn_blocking(move || engine.submit_feedback(&event))
        .await
        .map_err(|err| {
            tracing::error!(%err, "feedback task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": "feedback task failed" })))
        })?
        .map_err(engine_error)?;
    Ok(Json(serde_json::json!({ "applied": receipt.applied, "seq": receipt.seq })))
}

pub async fn item_handler(State(state): State<AppState>, Path(id): Path<u32>) -> Result<Json<ItemSnapshot>, ApiError> {
    state
        .engine
        .item(id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))))
}

fn engine_error(err: EngineError) -> ApiError {
    let status = match err {
        EngineError::UnknownItem { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(%err, "request failed");
    }
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}
