//! HTTP server for SDG matching.
//!
//! Exposes the matcher through a small JSON API. The index is built once at
//! startup and can be refreshed in place with `POST /reload`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version, statement count, model) |
//! | `POST` | `/match` | Match a query: `{query, top_n?, threshold?}` |
//! | `GET`  | `/statements` | The flattened reference corpus |
//! | `POST` | `/reload` | Re-read the taxonomy and rebuild the index if it changed |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "empty_query", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `empty_query` (400), `bad_request` (400),
//! `invalid_taxonomy` (422), `provider_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::MatchError;
use crate::export::{self, MatchRecord, StatementRecord};
use crate::matcher::Matcher;
use crate::rank::MatchResult;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    matcher: Arc<Matcher>,
}

impl AppState {
    pub fn new(config: Config, matcher: Matcher) -> Self {
        Self {
            config: Arc::new(config),
            matcher: Arc::new(matcher),
        }
    }
}

/// Load the taxonomy, create the provider and build the initial index.
///
/// Provider construction and the corpus embedding both block, so they run
/// on the blocking pool.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<AppState> {
        let taxonomy = config.load_taxonomy()?;
        let provider: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        let matcher = Matcher::new(&taxonomy, provider)?;
        Ok(AppState::new(config, matcher))
    })
    .await?
}

/// Build the router with all routes and CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/match", post(handle_match))
        .route("/statements", get(handle_statements))
        .route("/reload", post(handle_reload))
        .layer(cors)
        .with_state(state)
}

/// Serve `state` on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Starts the HTTP server on `[server].bind`.
///
/// Returns `Ok(())` when the server shuts down, or an error if the index
/// cannot be built or binding fails.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = build_state(config).await?;
    let bind_addr = config.server.bind.clone();

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        addr = %bind_addr,
        statements = state.matcher.index().len(),
        "listening"
    );
    println!("SDG matcher listening on http://{}", bind_addr);

    serve(listener, state).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
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

fn invalid_taxonomy(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "invalid_taxonomy",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        let message = err.to_string();
        match err {
            MatchError::EmptyQuery => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "empty_query",
                message,
            },
            MatchError::Validation { .. } => invalid_taxonomy(message),
            MatchError::Provider(_) | MatchError::DimensionMismatch { .. } => {
                warn!(error = %message, "provider failure");
                AppError {
                    status: StatusCode::BAD_GATEWAY,
                    code: "provider_error",
                    message,
                }
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        internal(format!("worker task failed: {}", err))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    statements: usize,
    model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let index = state.matcher.index();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        statements: index.len(),
        model: index.model_name().to_string(),
    })
}

// ============ POST /match ============

#[derive(Deserialize)]
struct MatchRequest {
    query: String,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    threshold: Option<f32>,
}

#[derive(Serialize)]
struct MatchResponse {
    results: Vec<MatchRecord>,
}

/// Handler for `POST /match`.
///
/// `top_n` and `threshold` fall back to `[matching]` in the config. The
/// query embedding runs on the blocking pool.
async fn handle_match(
    State(state): State<AppState>,
    body: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Json<MatchResponse>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;

    let top_n = req.top_n.unwrap_or(state.config.matching.top_n);
    if top_n == 0 {
        return Err(bad_request("top_n must be >= 1"));
    }
    let threshold = req.threshold.unwrap_or(state.config.matching.threshold);
    if !threshold.is_finite() {
        return Err(bad_request("threshold must be a finite number"));
    }

    let matcher = state.matcher.clone();
    let results: Vec<MatchResult> =
        tokio::task::spawn_blocking(move || matcher.find(&req.query, top_n, threshold)).await??;

    Ok(Json(MatchResponse {
        results: export::records(&results),
    }))
}

// ============ GET /statements ============

#[derive(Serialize)]
struct StatementsResponse {
    statements: Vec<StatementRecord>,
}

async fn handle_statements(State(state): State<AppState>) -> Json<StatementsResponse> {
    let index = state.matcher.index();
    Json(StatementsResponse {
        statements: index.statements().iter().map(StatementRecord::from).collect(),
    })
}

// ============ POST /reload ============

#[derive(Serialize)]
struct ReloadResponse {
    rebuilt: bool,
    statements: usize,
}

/// Handler for `POST /reload`.
///
/// Re-reads the configured taxonomy. The index is only re-embedded when
/// the flattened corpus changed; a failed reload keeps the old index.
async fn handle_reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let config = state.config.clone();
    let matcher = state.matcher.clone();

    let rebuilt = tokio::task::spawn_blocking(move || -> Result<bool, AppError> {
        let taxonomy = config.load_taxonomy().map_err(|e| match e.downcast::<MatchError>() {
            Ok(err) => AppError::from(err),
            Err(e) => invalid_taxonomy(format!("{:#}", e)),
        })?;
        Ok(matcher.refresh(&taxonomy)?)
    })
    .await??;

    let statements = state.matcher.index().len();
    info!(rebuilt, statements, "taxonomy reloaded");
    Ok(Json(ReloadResponse {
        rebuilt,
        statements,
    }))
}
