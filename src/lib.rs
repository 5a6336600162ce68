// lib.rs - Veo text-to-video studio: generation workflow, clip library and HTTP surface
pub mod auth;
pub mod config;
pub mod error;
pub mod gcs_client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod veo_client;
pub mod workflow;

use std::sync::Arc;

pub use config::Config;
pub use error::{VeoError, VeoResult};
pub use models::*;

use auth::TokenProvider;
use gcs_client::{GcsClient, ObjectStore};
use services::{OutputVideoService, VideoLibrary};
use session::SessionStore;
use veo_client::{GenerationApi, VeoClient};
use workflow::{GenerationWorkflow, RetryPolicy};

// AppState holds the configuration, the generation workflow, the clip library and the session store
pub struct AppState {
    pub config: Config,
    pub workflow: GenerationWorkflow,
    pub library: VideoLibrary,
    pub outputs: OutputVideoService,
    pub sessions: SessionStore,
}

impl AppState {
    /// Wires the real Vertex AI and Cloud Storage clients.
    pub async fn from_config(config: Config) -> VeoResult<Self> {
        let tokens = Arc::new(TokenProvider::from_credentials(&config.credentials).await?);
        let api = Arc::new(VeoClient::new(tokens.clone(), config.model_endpoint()));
        let store = Arc::new(GcsClient::new(
            tokens,
            config.gcs_api_base.clone(),
            config.project_id.clone(),
            config.location.clone(),
        ));
        Ok(Self::new(config, api, store))
    }

    pub fn new(config: Config, api: Arc<dyn GenerationApi>, store: Arc<dyn ObjectStore>) -> Self {
        let policy = RetryPolicy::fixed(config.poll_attempts, config.poll_delay);
        Self {
            workflow: GenerationWorkflow::new(
                api,
                store.clone(),
                policy,
                config.bucket.clone(),
                config.prefix.clone(),
            ),
            library: VideoLibrary::with_ttl(store.clone(), config.list_ttl),
            outputs: OutputVideoService::new(store, config.output_dir.clone()),
            sessions: SessionStore::new(),
            config,
        }
    }
}
