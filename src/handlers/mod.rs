// src/handlers/mod.rs
pub mod generate;
pub mod library;
pub mod output;
pub mod ui;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Router,
};
use serde::Serialize;

use crate::error::VeoError;

const MAX_SESSION_ID_LEN: usize = 64;

/// All application routes. Shared state is attached by the caller as an `Extension`.
pub fn router() -> Router {
    Router::new()
        .merge(ui::ui_routes())
        .merge(generate::generate_routes())
        .merge(library::library_routes())
        .merge(output::output_routes())
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub kind: &'static str,
    pub message: String,
}

impl VeoError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            VeoError::InvalidRequest(_) | VeoError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            VeoError::GenerationInFlight(_) => StatusCode::CONFLICT,
            VeoError::NotFound(_) => StatusCode::NOT_FOUND,
            VeoError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            VeoError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VeoError::Request(_)
            | VeoError::Generation(_)
            | VeoError::MissingResult(_)
            | VeoError::Download(_)
            | VeoError::List(_)
            | VeoError::Auth(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<JsonRejection> for VeoError {
    fn from(rejection: JsonRejection) -> Self {
        VeoError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for VeoError {
    fn from(rejection: QueryRejection) -> Self {
        VeoError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for VeoError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            success: false,
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Session ids end up in file system paths, so only a safe alphabet is accepted.
pub fn validate_session_id(session_id: &str) -> Result<(), VeoError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(VeoError::InvalidRequest(format!("Invalid session id: {}", session_id)))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_validation() {
        assert!(validate_session_id("3f2a-b_9").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc").is_err());
        assert!(validate_session_id(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(VeoError::Timeout { attempts: 1 }.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(VeoError::GenerationInFlight("s".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(VeoError::InvalidRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(VeoError::Generation("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    }
}
