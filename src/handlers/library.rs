// src/handlers/library.rs
use axum::{
    extract::{Extension, Query},
    response::{Json, Response},
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;

use super::output::stream_file;
use super::validate_session_id;
use crate::error::VeoError;
use crate::models::{GcsUri, VideoRef};
use crate::services::video_library::folder;
use crate::services::{SortOrder, VideoPage};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub query: String,
    pub page: Option<usize>,
    #[serde(default)]
    pub sort: SortOrder,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub uri: String,
}

pub fn library_routes() -> Router {
    Router::new()
        .route("/api/videos", get(list_videos))
        .route("/api/videos/file", get(library_video_file))
}

/// GET /api/videos - One page of the filtered, sorted library
async fn list_videos(
    WithRejection(Query(params), _): WithRejection<Query<LibraryQuery>, VeoError>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VideoPage>, VeoError> {
    if let Some(session_id) = &params.session_id {
        validate_session_id(session_id)?;
    }

    // fall back to the page the session was last on
    let requested_page = params
        .page
        .or_else(|| {
            params
                .session_id
                .as_deref()
                .map(|id| state.sessions.snapshot(id).page)
        })
        .unwrap_or(1);

    let page = state
        .library
        .page(
            &state.config.bucket,
            &state.config.prefix,
            &params.query,
            params.sort,
            requested_page,
        )
        .await?;

    if let Some(session_id) = &params.session_id {
        state.sessions.set_page(session_id, page.page);
    }

    Ok(Json(page))
}

/// GET /api/videos/file?uri=gs://... - Stream a library clip, downloading it first if needed
async fn library_video_file(
    WithRejection(Query(params), _): WithRejection<Query<FileQuery>, VeoError>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, VeoError> {
    let uri = GcsUri::parse(&params.uri)?;
    let in_library = uri.bucket == state.config.bucket
        && uri.path.starts_with(&folder(&state.config.prefix));
    if !in_library {
        return Err(VeoError::InvalidUri(format!(
            "{} is outside gs://{}/{}",
            params.uri, state.config.bucket, state.config.prefix
        )));
    }

    let video = state.outputs.preview(&VideoRef::new(params.uri)).await?;
    let local_path = video
        .local_path
        .ok_or_else(|| VeoError::Download(format!("{} has no local copy", video.uri)))?;

    stream_file(std::path::Path::new(&local_path)).await
}
