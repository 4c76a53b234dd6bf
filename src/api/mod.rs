//! HTTP surface — router assembly, shared state, health and fallback routes.

pub mod envelope;
pub mod requests;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::TodoError;
use crate::store::Database;
use crate::subtasks::repository::SubtaskRepository;
use crate::subtasks::routes::subtask_routes;
use crate::todos::repository::TodoRepository;
use crate::todos::routes::todo_routes;

pub use envelope::{ApiError, ApiResponse, FieldError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub todos: TodoRepository,
    pub subtasks: SubtaskRepository,
    /// Include internal error detail in responses (development mode).
    pub expose_errors: bool,
}

impl AppState {
    pub fn new(db: Arc<dyn Database>, expose_errors: bool) -> Self {
        Self {
            todos: TodoRepository::new(Arc::clone(&db)),
            subtasks: SubtaskRepository::new(Arc::clone(&db)),
            db,
            expose_errors,
        }
    }

    /// Turn a domain error into a response, honoring the detail policy.
    pub fn reject(&self, err: TodoError) -> ApiError {
        ApiError::from_domain(err, self.expose_errors)
    }
}

/// Unwrap a typed JSON body, answering malformed input with the 400 envelope.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Build the full application router: todo and subtask resources, health,
/// root, 404 fallback, CORS, and per-request tracing.
pub fn app(state: AppState, cors_origins: Option<&[String]>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(todo_routes())
        .merge(subtask_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Allow the listed origins, or mirror any origin when none are configured.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let allow_origin = match origins {
        Some(list) if !list.is_empty() => {
            let parsed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
        _ => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Hufflepuff Todo API is running",
                "database": "Connected",
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            })),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Database connection failed",
                    "error": state.expose_errors.then(|| e.to_string()),
                })),
            )
        }
    }
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "Welcome to Hufflepuff Todo API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "todos": "/api/todos",
            "subtasks": "/api/subtasks",
            "health": "/health",
        },
    }))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::route_not_found(uri.path())
}
