use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::app_state::AppState;
use crate::routes::ApiError;

/// GET /images/{filename} — serve a stored upload back. Content type is
/// sniffed from the bytes; anything unrecognized goes out as an octet
/// stream.
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    tracing::debug!(%filename, "image requested");
    let bytes = state.images.read(&filename).await?;

    let content_type = image::guess_format(&bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
