// src/handlers/generate.rs
//! Generation endpoints - submit a prompt for a session and inspect session state

use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validate_session_id;
use crate::error::VeoError;
use crate::models::{AspectRatio, GenerationRequest, DEFAULT_DURATION_SECONDS, EXAMPLE_PROMPTS};
use crate::session::{GenerationResult, SessionState};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
    #[serde(default = "default_duration")]
    pub duration_seconds: u8,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

fn default_duration() -> u8 {
    DEFAULT_DURATION_SECONDS
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub result: GenerationResult,
    pub video_url: String,
}

#[derive(Deserialize)]
pub struct PromptBody {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct ExamplesResponse {
    pub examples: Vec<&'static str>,
}

pub fn generate_routes() -> Router {
    Router::new()
        .route("/api/examples", get(list_examples))
        .route("/api/sessions/:session_id", get(get_session))
        .route("/api/sessions/:session_id/prompt", put(set_prompt))
        .route("/api/sessions/:session_id/generate", post(generate_video))
}

/// GET /api/examples - Example prompts offered by the UI
async fn list_examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: EXAMPLE_PROMPTS.to_vec(),
    })
}

/// GET /api/sessions/:session_id - Current session snapshot
async fn get_session(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<SessionState>, VeoError> {
    validate_session_id(&session_id)?;
    Ok(Json(state.sessions.snapshot(&session_id)))
}

/// PUT /api/sessions/:session_id/prompt - Remember the prompt being edited (example buttons)
async fn set_prompt(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<PromptBody>, VeoError>,
) -> Result<Json<SessionState>, VeoError> {
    validate_session_id(&session_id)?;
    state.sessions.set_prompt(&session_id, &body.prompt);
    Ok(Json(state.sessions.snapshot(&session_id)))
}

/// POST /api/sessions/:session_id/generate - Run the full workflow and download the clip
async fn generate_video(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<GenerateBody>, VeoError>,
) -> Result<Json<GenerateResponse>, VeoError> {
    validate_session_id(&session_id)?;
    let request = GenerationRequest::new(body.prompt, body.duration_seconds, body.aspect_ratio)?;

    let _in_flight = state.sessions.begin_generation(&session_id, &request)?;

    let video = state.workflow.submit_and_wait(&request).await?;
    let video = state.outputs.materialize_generated(&video, &session_id).await?;
    state.library.invalidate().await;

    let result = GenerationResult::new(&request, video);
    state.sessions.record_result(&session_id, result.clone());

    tracing::info!("✅ Video generated for session {}: {}", session_id, result.video.uri);

    Ok(Json(GenerateResponse {
        success: true,
        video_url: format!("/api/sessions/{}/video", session_id),
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{app, send_json, state};
    use crate::gcs_client::MockObjectStore;
    use crate::models::OperationStatus;
    use crate::veo_client::MockGenerationApi;
    use axum::{body::Body, http::{Request, StatusCode}};
    use serde_json::json;

    fn post_generate(session_id: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{}/generate", session_id))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn succeeding_api() -> MockGenerationApi {
        let mut api = MockGenerationApi::new();
        api.expect_submit()
            .withf(|request, _| request.prompt() == "cat" && request.duration_seconds() == 5)
            .returning(|_, _| Ok("operations/1".to_string()));
        api.expect_poll().returning(|_| {
            Ok(OperationStatus {
                done: true,
                error: None,
                video_uri: Some("gs://b/veo_outputs/1/sample_0.mp4".to_string()),
            })
        });
        api
    }

    fn store() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|_| Ok(true));
        store.expect_download().returning(|_, _, local_path| {
            std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
            std::fs::write(local_path, b"mp4-bytes").unwrap();
            Ok(())
        });
        store
    }

    #[tokio::test]
    async fn test_generate_records_session_result() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), succeeding_api(), store());

        let (status, body) = send_json(
            app(state.clone()),
            post_generate("s1", json!({"prompt": "cat", "aspect_ratio": "16:9"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["video"]["uri"], "gs://b/veo_outputs/1/sample_0.mp4");
        assert_eq!(body["video_url"], "/api/sessions/s1/video");

        let session = state.sessions.snapshot("s1");
        assert!(!session.in_flight);
        assert_eq!(session.prompt, "cat");
        assert!(session.last_result.unwrap().video.local_path.is_some());
    }

    #[tokio::test]
    async fn test_generation_failure_is_reported_and_clears_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockGenerationApi::new();
        api.expect_submit().returning(|_, _| Ok("operations/1".to_string()));
        api.expect_poll().returning(|_| {
            Ok(OperationStatus {
                done: true,
                error: Some("blocked by safety filter".to_string()),
                video_uri: None,
            })
        });
        let state = state(dir.path(), api, store());

        let (status, body) = send_json(app(state.clone()), post_generate("s1", json!({"prompt": "cat"}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "generation_error");
        assert!(!state.sessions.snapshot("s1").in_flight);
        assert!(state.sessions.snapshot("s1").last_result.is_none());
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected_without_submitting() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockGenerationApi::new();
        api.expect_submit().never();
        let state = state(dir.path(), api, MockObjectStore::new());

        let (status, body) = send_json(app(state), post_generate("s1", json!({"prompt": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockGenerationApi::new();
        api.expect_submit().never();
        let state = state(dir.path(), api, MockObjectStore::new());

        for body in [
            json!({"prompt": "cat", "duration_seconds": 300}),
            json!({"prompt": "cat", "aspect_ratio": "4:3"}),
            json!({"duration_seconds": 5}),
        ] {
            let (status, response) = send_json(app(state.clone()), post_generate("s1", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["success"], false);
            assert_eq!(response["kind"], "invalid_request");
        }
        assert!(!state.sessions.snapshot("s1").in_flight);
    }

    #[tokio::test]
    async fn test_in_flight_session_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockGenerationApi::new();
        api.expect_submit().never();
        let state = state(dir.path(), api, MockObjectStore::new());

        let request = crate::models::GenerationRequest::new("dog", 5, Default::default()).unwrap();
        let _guard = state.sessions.begin_generation("s1", &request).unwrap();

        let (status, body) = send_json(app(state.clone()), post_generate("s1", json!({"prompt": "cat"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "generation_in_flight");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_gateway_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = MockGenerationApi::new();
        api.expect_submit().returning(|_, _| Ok("operations/1".to_string()));
        api.expect_poll().times(3).returning(|_| {
            Ok(OperationStatus {
                done: false,
                error: None,
                video_uri: None,
            })
        });
        let state = state(dir.path(), api, store());

        let (status, body) = send_json(app(state), post_generate("s1", json!({"prompt": "cat"}))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["kind"], "timeout");
    }

    #[tokio::test]
    async fn test_session_snapshot_and_examples() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), MockGenerationApi::new(), MockObjectStore::new());

        let (status, body) = send_json(app(state.clone()), get("/api/sessions/fresh")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["in_flight"], false);

        let (_, body) = send_json(app(state.clone()), get("/api/examples")).await;
        assert_eq!(body["examples"].as_array().unwrap().len(), 4);

        let (status, _) = send_json(app(state), get("/api/sessions/bad.id")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
