use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::services::processing::ProcessingError;
use crate::services::storage::StorageError;
use crate::store::StoreError;

pub mod auth;
pub mod health;
pub mod images;
pub mod metrics;
pub mod tasks;

/// Assemble the API routes. Middleware layers and the metrics endpoint
/// are stacked on top by the caller.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/content", get(auth::content))
        .route("/health", get(health::health_check))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{task_id}",
            get(tasks::get_task).delete(tasks::delete_task),
        )
        .route("/images/{filename}", get(images::get_image))
        .with_state(state)
}

/// Request-level errors. Missing tasks and files surface as 404 with a
/// `{"detail": ...}` body; external-service and filesystem failures
/// surface as 500 with no retry.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Item is not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(id),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(name) => ApiError::NotFound(name),
            other => ApiError::Storage(other),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) | ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
