// src/models.rs - Domain types shared by the workflow, the library and the handlers
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{VeoError, VeoResult};

pub const MIN_DURATION_SECONDS: u8 = 1;
pub const MAX_DURATION_SECONDS: u8 = 8;
pub const DEFAULT_DURATION_SECONDS: u8 = 5;

pub const DEFAULT_PROMPT: &str = "A cinematic drone shot over a misty forest at sunrise";

pub const EXAMPLE_PROMPTS: [&str; 4] = [
    "A cinematic drone shot over a misty forest at sunrise",
    "A futuristic city with flying cars and neon lights",
    "A peaceful beach with gentle waves at sunset",
    "An astronaut walking on the surface of Mars",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated prompt submission. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    prompt: String,
    duration_seconds: u8,
    aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        duration_seconds: u8,
        aspect_ratio: AspectRatio,
    ) -> VeoResult<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(VeoError::InvalidRequest(
                "Please enter a prompt before generating a video".to_string(),
            ));
        }
        if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration_seconds) {
            return Err(VeoError::InvalidRequest(format!(
                "Duration must be between {} and {} seconds, got {}",
                MIN_DURATION_SECONDS, MAX_DURATION_SECONDS, duration_seconds
            )));
        }

        Ok(Self {
            prompt,
            duration_seconds,
            aspect_ratio,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn duration_seconds(&self) -> u8 {
        self.duration_seconds
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }
}

/// Pointer to a generated clip in cloud storage, optionally materialized locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub uri: String,
    pub local_path: Option<String>,
}

impl VideoRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            local_path: None,
        }
    }

    pub fn with_local_path(mut self, local_path: impl Into<String>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }

    /// Last path segment of the storage locator.
    pub fn file_name(&self) -> &str {
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }
}

/// Snapshot of a remote long-running job as reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationStatus {
    pub done: bool,
    pub error: Option<String>,
    pub video_uri: Option<String>,
}

/// Client-side view of a long-running generation job.
///
/// Result and error are mutually exclusive and the state is frozen once
/// `done` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    name: String,
    done: bool,
    result: Option<VideoRef>,
    error: Option<String>,
}

impl Operation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            result: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn result(&self) -> Option<&VideoRef> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Folds a poll snapshot into the operation. Ignored once terminal.
    pub fn apply(&mut self, status: OperationStatus) {
        if self.done || !status.done {
            return;
        }

        self.done = true;
        match status.error {
            Some(error) => self.error = Some(error),
            None => self.result = status.video_uri.map(VideoRef::new),
        }
    }

    /// `None` while pending, otherwise exactly one of success or failure.
    pub fn outcome(&self) -> Option<VeoResult<VideoRef>> {
        if !self.done {
            return None;
        }

        Some(match (&self.result, &self.error) {
            (_, Some(error)) => Err(VeoError::Generation(error.clone())),
            (Some(video), None) => Ok(video.clone()),
            (None, None) => Err(VeoError::MissingResult(self.name.clone())),
        })
    }
}

/// A `gs://bucket/path` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsUri {
    pub bucket: String,
    pub path: String,
}

impl GcsUri {
    pub fn parse(uri: &str) -> VeoResult<Self> {
        let rest = uri
            .strip_prefix("gs://")
            .ok_or_else(|| VeoError::InvalidUri(format!("{} does not start with gs://", uri)))?;

        match rest.split_once('/') {
            Some((bucket, path)) if !bucket.is_empty() && !path.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                path: path.to_string(),
            }),
            _ => Err(VeoError::InvalidUri(format!(
                "{} must name both a bucket and an object",
                uri
            ))),
        }
    }
}

impl fmt::Display for GcsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.path)
    }
}

/// One object returned by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub name: String,
    pub created: DateTime<Utc>,
}

impl StoredObject {
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(done: bool, error: Option<&str>, uri: Option<&str>) -> OperationStatus {
        OperationStatus {
            done,
            error: error.map(str::to_string),
            video_uri: uri.map(str::to_string),
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new("cat", 5, AspectRatio::Landscape).is_ok());
        assert!(GenerationRequest::new("cat", 1, AspectRatio::Square).is_ok());
        assert!(GenerationRequest::new("cat", 8, AspectRatio::Portrait).is_ok());

        assert!(matches!(
            GenerationRequest::new("   ", 5, AspectRatio::Landscape),
            Err(VeoError::InvalidRequest(_))
        ));
        assert!(matches!(
            GenerationRequest::new("cat", 0, AspectRatio::Landscape),
            Err(VeoError::InvalidRequest(_))
        ));
        assert!(matches!(
            GenerationRequest::new("cat", 9, AspectRatio::Landscape),
            Err(VeoError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_aspect_ratio_wire_names() {
        assert_eq!(serde_json::to_string(&AspectRatio::Landscape).unwrap(), "\"16:9\"");
        let parsed: AspectRatio = serde_json::from_str("\"9:16\"").unwrap();
        assert_eq!(parsed, AspectRatio::Portrait);
        assert!(serde_json::from_str::<AspectRatio>("\"4:3\"").is_err());
    }

    #[test]
    fn test_operation_pending_until_done() {
        let mut op = Operation::pending("operations/1");
        op.apply(status(false, None, None));
        assert!(!op.is_done());
        assert!(op.outcome().is_none());
    }

    #[test]
    fn test_operation_success() {
        let mut op = Operation::pending("operations/1");
        op.apply(status(true, None, Some("gs://b/v.mp4")));
        assert_eq!(op.outcome().unwrap().unwrap(), VideoRef::new("gs://b/v.mp4"));
    }

    #[test]
    fn test_operation_error_excludes_result() {
        let mut op = Operation::pending("operations/1");
        op.apply(status(true, Some("quota exceeded"), Some("gs://b/v.mp4")));
        assert!(op.result().is_none());
        assert_eq!(op.error(), Some("quota exceeded"));
        assert!(matches!(op.outcome(), Some(Err(VeoError::Generation(_)))));
    }

    #[test]
    fn test_operation_missing_result() {
        let mut op = Operation::pending("operations/1");
        op.apply(status(true, None, None));
        assert!(matches!(op.outcome(), Some(Err(VeoError::MissingResult(_)))));
    }

    #[test]
    fn test_terminal_operation_is_frozen() {
        let mut op = Operation::pending("operations/1");
        op.apply(status(true, None, Some("gs://b/first.mp4")));
        let frozen = op.clone();

        op.apply(status(true, Some("late failure"), None));
        op.apply(status(false, None, None));
        assert_eq!(op, frozen);
    }

    #[test]
    fn test_gcs_uri_parse() {
        let uri = GcsUri::parse("gs://bucket/veo_outputs/clip.mp4").unwrap();
        assert_eq!(uri.bucket, "bucket");
        assert_eq!(uri.path, "veo_outputs/clip.mp4");
        assert_eq!(uri.to_string(), "gs://bucket/veo_outputs/clip.mp4");

        assert!(GcsUri::parse("https://bucket/clip.mp4").is_err());
        assert!(GcsUri::parse("gs://bucket").is_err());
        assert!(GcsUri::parse("gs:///clip.mp4").is_err());
    }

    #[test]
    fn test_video_ref_file_name() {
        assert_eq!(VideoRef::new("gs://b/veo_outputs/123/sample_0.mp4").file_name(), "sample_0.mp4");
    }
}
