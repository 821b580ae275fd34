//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/sync` | Run one sync pass and return its report |
//! | `GET`  | `/series?q=&limit=` | List or search the catalog |
//! | `GET`  | `/series/{id}/observations` | Stored rows, segments, plottable flag |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "run_in_progress", "message": "a sync run is already in progress" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `run_in_progress` (409),
//! `internal` (500).
//!
//! Only one sync run executes at a time per server; a second `POST /sync`
//! while one is in flight is rejected rather than queued.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use fred_sync_core::models::SeriesDescriptor;

use crate::config::Config;
use crate::progress::NoProgress;
use crate::series::{find_series, load_observations, SeriesObservations, DEFAULT_SEARCH_LIMIT};
use crate::sqlite_store::SqliteStore;
use crate::sync::{build_job, SyncJob, SyncOptions, SyncReport};

/// Upper bound on `limit` for `GET /series`.
const MAX_SEARCH_LIMIT: usize = 500;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    store: Arc<SqliteStore>,
    job: Arc<SyncJob>,
    /// Held for the duration of a sync run.
    run_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<SqliteStore>, job: SyncJob) -> Self {
        Self {
            store,
            job: Arc::new(job),
            run_guard: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the router with all routes and CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sync", post(handle_sync))
        .route("/series", get(handle_series))
        .route("/series/{id}/observations", get(handle_observations))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated; returns an error if binding fails.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let (job, store) = build_job(config, SyncOptions::from_config(&config.sync)).await?;
    let app = router(AppState::new(store, job));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "http server listening");
    println!("fredsync listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "run_in_progress",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /sync ============

/// Runs one pass over the catalog.
///
/// Returns `409` if another run holds the guard and `500` if the catalog
/// could not be read. Per-series failures are part of a `200` report.
async fn handle_sync(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    let _guard = state
        .run_guard
        .try_lock()
        .map_err(|_| conflict("a sync run is already in progress"))?;

    let report = state.job.run(None, &NoProgress).await.map_err(internal)?;
    Ok(Json(report))
}

// ============ GET /series ============

#[derive(Deserialize)]
struct SeriesQuery {
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SeriesListResponse {
    series: Vec<SeriesDescriptor>,
}

async fn handle_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<SeriesListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(bad_request(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    let series = find_series(state.store.as_ref(), query.q.as_deref(), limit)
        .await
        .map_err(internal)?;
    Ok(Json(SeriesListResponse { series }))
}

// ============ GET /series/{id}/observations ============

async fn handle_observations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SeriesObservations>, AppError> {
    let store = state.store.as_ref();
    load_observations(store, store, &id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("series not found: {}", id)))
}
