// src/handlers/output.rs
use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::validate_session_id;
use crate::error::VeoError;
use crate::services::output_video::content_type_for;
use crate::AppState;

pub fn output_routes() -> Router {
    Router::new().route("/api/sessions/:session_id/video", get(stream_session_video))
}

/// Stream the session's most recent clip (for browser playback)
async fn stream_session_video(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, VeoError> {
    validate_session_id(&session_id)?;

    let local_path = state
        .sessions
        .snapshot(&session_id)
        .last_result
        .and_then(|result| result.video.local_path)
        .ok_or_else(|| VeoError::NotFound(format!("No generated video for session {}", session_id)))?;

    stream_file(std::path::Path::new(&local_path)).await
}

/// Streams a local video file with a content type matching its extension.
pub async fn stream_file(path: &std::path::Path) -> Result<Response, VeoError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VeoError::NotFound(format!("{} does not exist", path.display())));
        }
        Err(e) => {
            tracing::error!("Failed to open file for streaming: {}", e);
            return Err(VeoError::Download(format!("{}: {}", path.display(), e)));
        }
    };

    let stream = ReaderStream::new(file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(path))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(axum::body::Body::from_stream(stream))
        .map_err(|e| VeoError::Download(e.to_string()))
}
