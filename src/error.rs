// src/error.rs
use thiserror::Error;

pub type VeoResult<T> = Result<T, VeoError>;

/// Every failure the generation workflow and video library can report.
///
/// None of these are fatal to the process; handlers turn them into JSON
/// error responses.
#[derive(Error, Debug)]
pub enum VeoError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid storage URI: {0}")]
    InvalidUri(String),
    #[error("Request error: {0}")]
    Request(String),
    #[error("Generation error: {0}")]
    Generation(String),
    #[error("Operation {0} finished without a video reference")]
    MissingResult(String),
    #[error("Timeout waiting for video generation after {attempts} polls")]
    Timeout { attempts: u32 },
    #[error("Download error: {0}")]
    Download(String),
    #[error("List error: {0}")]
    List(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("A generation is already in flight for session {0}")]
    GenerationInFlight(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl VeoError {
    /// Stable tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            VeoError::InvalidRequest(_) => "invalid_request",
            VeoError::InvalidUri(_) => "invalid_uri",
            VeoError::Request(_) => "request_error",
            VeoError::Generation(_) => "generation_error",
            VeoError::MissingResult(_) => "missing_result",
            VeoError::Timeout { .. } => "timeout",
            VeoError::Download(_) => "download_error",
            VeoError::List(_) => "list_error",
            VeoError::Auth(_) => "auth_error",
            VeoError::Config(_) => "config_error",
            VeoError::GenerationInFlight(_) => "generation_in_flight",
            VeoError::NotFound(_) => "not_found",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for VeoError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        VeoError::Auth(format!("Failed to sign service account assertion: {}", err))
    }
}
