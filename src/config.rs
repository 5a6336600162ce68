// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{VeoError, VeoResult};

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_MODEL_ID: &str = "veo-2.0-generate-001";
pub const DEFAULT_PREFIX: &str = "veo_outputs";
pub const DEFAULT_GCS_API_BASE: &str = "https://storage.googleapis.com";
pub const DEFAULT_POLL_ATTEMPTS: u32 = 40;
pub const DEFAULT_POLL_DELAY_SECS: u64 = 10;
pub const DEFAULT_LIST_TTL_SECS: u64 = 60;

/// How the service authenticates against Google APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A ready-made bearer token, used as-is.
    AccessToken(String),
    /// Path to a service-account JSON key.
    ServiceAccountFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub location: String,
    pub model_id: String,
    pub bucket: String,
    pub prefix: String,
    pub veo_api_base: String,
    pub gcs_api_base: String,
    pub credentials: Credentials,
    pub poll_attempts: u32,
    pub poll_delay: Duration,
    pub list_ttl: Duration,
    pub output_dir: PathBuf,
    pub bind_addr: String,
}

impl Config {
    /// Reads the configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> VeoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch the environment.
    pub fn from_lookup<F>(lookup: F) -> VeoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| VeoError::Config(format!("{} must be set", key)))
        };

        let project_id = required("VEO_PROJECT_ID")?;
        let bucket = required("VEO_BUCKET")?;
        let location = var("VEO_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let veo_api_base = var("VEO_API_BASE")
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com/v1", location));

        let credentials = match (var("GOOGLE_ACCESS_TOKEN"), var("GOOGLE_APPLICATION_CREDENTIALS")) {
            (Some(token), _) => Credentials::AccessToken(token),
            (None, Some(path)) => Credentials::ServiceAccountFile(PathBuf::from(path)),
            (None, None) => {
                return Err(VeoError::Config(
                    "Set GOOGLE_ACCESS_TOKEN or GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                ))
            }
        };

        Ok(Self {
            project_id,
            model_id: var("VEO_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            bucket,
            prefix: var("VEO_PREFIX")
                .map(|prefix| prefix.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            veo_api_base: veo_api_base.trim_end_matches('/').to_string(),
            gcs_api_base: var("GCS_API_BASE")
                .unwrap_or_else(|| DEFAULT_GCS_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            location,
            credentials,
            poll_attempts: parse_or(var("VEO_POLL_ATTEMPTS"), "VEO_POLL_ATTEMPTS", DEFAULT_POLL_ATTEMPTS)?,
            poll_delay: Duration::from_secs(parse_or(
                var("VEO_POLL_DELAY_SECS"),
                "VEO_POLL_DELAY_SECS",
                DEFAULT_POLL_DELAY_SECS,
            )?),
            list_ttl: Duration::from_secs(parse_or(
                var("VEO_LIST_TTL_SECS"),
                "VEO_LIST_TTL_SECS",
                DEFAULT_LIST_TTL_SECS,
            )?),
            output_dir: PathBuf::from(var("OUTPUT_DIR").unwrap_or_else(|| "outputs".to_string())),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }

    /// Storage URI the generation endpoint writes its samples under.
    pub fn storage_uri(&self) -> String {
        format!("gs://{}/{}/", self.bucket, self.prefix)
    }

    /// Base URL of the publisher model, without the `:method` suffix.
    pub fn model_endpoint(&self) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}",
            self.veo_api_base, self.project_id, self.location, self.model_id
        )
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> VeoResult<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| VeoError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
