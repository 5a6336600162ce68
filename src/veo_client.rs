// src/veo_client.rs - Vertex AI Veo long-running prediction client
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::auth::TokenProvider;
use crate::error::{VeoError, VeoResult};
use crate::models::{GenerationRequest, OperationStatus};

const PERSON_GENERATION: &str = "allow";
const SAMPLE_COUNT: u32 = 1;

/// Why a single status poll failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// Worth another attempt: network trouble, throttling, server-side errors.
    #[error("retryable poll failure: {0}")]
    Retryable(String),
    /// The operation cannot be polled at all (bad credentials, unknown operation).
    #[error("terminal poll failure: {0}")]
    Terminal(String),
}

impl PollFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PollFailure::Retryable(_))
    }

    fn from_status(status: StatusCode, body: String) -> Self {
        let message = format!("poll endpoint returned {}: {}", status, body);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            PollFailure::Retryable(message)
        } else {
            PollFailure::Terminal(message)
        }
    }
}

/// The two remote calls the generation workflow needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Starts a generation job and returns its opaque operation name.
    async fn submit(&self, request: &GenerationRequest, storage_uri: &str) -> VeoResult<String>;

    /// Fetches the current status of a previously submitted operation.
    async fn poll(&self, operation_name: &str) -> Result<OperationStatus, PollFailure>;
}

#[derive(Debug, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub aspect_ratio: String,
    pub person_generation: String,
    pub duration_seconds: u8,
    pub sample_count: u32,
    pub storage_uri: String,
}

impl PredictRequest {
    pub fn new(request: &GenerationRequest, storage_uri: &str) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: request.prompt().to_string(),
            }],
            parameters: PredictParameters {
                aspect_ratio: request.aspect_ratio().as_str().to_string(),
                person_generation: PERSON_GENERATION.to_string(),
                duration_seconds: request.duration_seconds(),
                sample_count: SAMPLE_COUNT,
                storage_uri: storage_uri.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OperationHandle {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOperationRequest<'a> {
    pub operation_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct FetchOperationResponse {
    #[serde(default)]
    pub done: bool,
    pub error: Option<Value>,
    pub response: Option<PredictResponse>,
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub videos: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSample {
    pub gcs_uri: Option<String>,
    pub mime_type: Option<String>,
}

impl From<FetchOperationResponse> for OperationStatus {
    fn from(response: FetchOperationResponse) -> Self {
        let error = response.error.map(|error| {
            error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string())
        });
        let video_uri = response
            .response
            .and_then(|payload| payload.videos.into_iter().find_map(|video| video.gcs_uri));

        OperationStatus {
            done: response.done,
            error,
            video_uri,
        }
    }
}

#[derive(Clone)]
pub struct VeoClient {
    client: Client,
    tokens: Arc<TokenProvider>,
    model_endpoint: String,
}

impl VeoClient {
    pub fn new(tokens: Arc<TokenProvider>, model_endpoint: String) -> Self {
        Self {
            client: Client::new(),
            tokens,
            model_endpoint,
        }
    }
}

#[async_trait]
impl GenerationApi for VeoClient {
    async fn submit(&self, request: &GenerationRequest, storage_uri: &str) -> VeoResult<String> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| VeoError::Request(format!("Failed to obtain access token: {}", e)))?;
        let body = PredictRequest::new(request, storage_uri);

        tracing::info!(
            "🎬 Submitting Veo generation: {}s, {}, storage {}",
            request.duration_seconds(),
            request.aspect_ratio(),
            storage_uri
        );

        let response = self
            .client
            .post(format!("{}:predictLongRunning", self.model_endpoint))
            .bearer_auth(&token)
            .timeout(Duration::from_secs(60))
            .json(&body)
            .send()
            .await
            .map_err(|e| VeoError::Request(format!("Failed to reach generation endpoint: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Veo API error ({}): {}", status, error_text);
            return Err(VeoError::Request(format!("API Error ({}): {}", status, error_text)));
        }

        let handle: OperationHandle = response
            .json()
            .await
            .map_err(|e| VeoError::Request(format!("Invalid submission response: {}", e)))?;

        tracing::info!("✅ Veo operation started: {}", handle.name);
        Ok(handle.name)
    }

    async fn poll(&self, operation_name: &str) -> Result<OperationStatus, PollFailure> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| PollFailure::Retryable(e.to_string()))?;

        let response = self
            .client
            .post(format!("{}:fetchPredictOperation", self.model_endpoint))
            .bearer_auth(&token)
            .timeout(Duration::from_secs(30))
            .json(&FetchOperationRequest { operation_name })
            .send()
            .await
            .map_err(|e| PollFailure::Retryable(format!("poll request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PollFailure::from_status(status, error_text));
        }

        let body: FetchOperationResponse = response
            .json()
            .await
            .map_err(|e| PollFailure::Retryable(format!("undecodable poll response: {}", e)))?;

        Ok(body.into())
    }
}
