// Generation workflow - submit → poll → resolve
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use crate::error::{VeoError, VeoResult};
use crate::gcs_client::ObjectStore;
use crate::models::{GenerationRequest, Operation, VideoRef};
use crate::veo_client::{GenerationApi, PollFailure};

/// Drives one prompt from submission to a resolved clip reference.
///
/// The poll loop awaits its full delay between polls and there is no way to
/// cancel a submitted job; dropping the future only stops waiting for it.
pub struct GenerationWorkflow {
    api: Arc<dyn GenerationApi>,
    store: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
    bucket: String,
    prefix: String,
}

impl GenerationWorkflow {
    pub fn new(
        api: Arc<dyn GenerationApi>,
        store: Arc<dyn ObjectStore>,
        policy: RetryPolicy,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            policy,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Storage URI the generated samples are written under.
    pub fn storage_uri(&self) -> String {
        format!("gs://{}/{}/", self.bucket, self.prefix)
    }

    /// Submits `request` and waits until the operation resolves or the poll budget runs out.
    pub async fn submit_and_wait(&self, request: &GenerationRequest) -> VeoResult<VideoRef> {
        self.ensure_bucket().await?;

        let name = self.api.submit(request, &self.storage_uri()).await?;
        self.wait_for(Operation::pending(name)).await
    }

    /// Polls `operation` until it is terminal.
    ///
    /// Retryable poll failures consume an attempt like any unfinished poll;
    /// terminal ones end the wait with a request error.
    pub async fn wait_for(&self, mut operation: Operation) -> VeoResult<VideoRef> {
        let max_attempts = self.policy.max_attempts;
        let mut delays = self.policy.delays();

        for attempt in 1..=max_attempts {
            match self.api.poll(operation.name()).await {
                Ok(status) => {
                    operation.apply(status);
                    if let Some(outcome) = operation.outcome() {
                        match &outcome {
                            Ok(video) => info!("✅ Operation {} produced {}", operation.name(), video.uri),
                            Err(e) => warn!("❌ Operation {} failed: {}", operation.name(), e),
                        }
                        return outcome;
                    }
                    debug!("⏳ Operation {} still running (poll {}/{})", operation.name(), attempt, max_attempts);
                }
                Err(PollFailure::Retryable(reason)) => {
                    warn!("Poll {}/{} for {} failed, will retry: {}", attempt, max_attempts, operation.name(), reason);
                }
                Err(PollFailure::Terminal(reason)) => {
                    return Err(VeoError::Request(reason));
                }
            }

            if attempt < max_attempts {
                if let Some(delay) = delays.next() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!("⌛ Gave up on operation {} after {} polls", operation.name(), max_attempts);
        Err(VeoError::Timeout {
            attempts: max_attempts,
        })
    }

    /// Any failure here, credentials included, is reported as a request error.
    async fn ensure_bucket(&self) -> VeoResult<()> {
        let exists = self
            .store
            .bucket_exists(&self.bucket)
            .await
            .map_err(as_request_error)?;
        if !exists {
            self.store
                .create_bucket(&self.bucket)
                .await
                .map_err(as_request_error)?;
        }
        Ok(())
    }
}

fn as_request_error(error: VeoError) -> VeoError {
    match error {
        VeoError::Request(_) => error,
        other => VeoError::Request(other.to_string()),
    }
}
