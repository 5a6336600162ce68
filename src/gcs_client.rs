// src/gcs_client.rs - Google Cloud Storage JSON API client
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::auth::TokenProvider;
use crate::error::{VeoError, VeoResult};
use crate::models::StoredObject;

/// Blob store addressed by (bucket, path).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> VeoResult<bool>;

    async fn create_bucket(&self, bucket: &str) -> VeoResult<()>;

    /// Every object whose name starts with `prefix`, in listing order.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> VeoResult<Vec<StoredObject>>;

    /// Writes the object's bytes to `local_path`, creating parent directories.
    async fn download(&self, bucket: &str, path: &str, local_path: &Path) -> VeoResult<()>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectListResponse {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    time_created: DateTime<Utc>,
}

#[derive(Clone)]
pub struct GcsClient {
    client: Client,
    tokens: Arc<TokenProvider>,
    base_url: String,
    project_id: String,
    location: String,
}

impl GcsClient {
    pub fn new(tokens: Arc<TokenProvider>, base_url: String, project_id: String, location: String) -> Self {
        Self {
            client: Client::new(),
            tokens,
            base_url,
            project_id,
            location,
        }
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/storage/v1/b/{}", self.base_url, urlencoding::encode(bucket))
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn bucket_exists(&self, bucket: &str) -> VeoResult<bool> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(self.bucket_url(bucket))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| VeoError::Request(format!("Failed to look up bucket {}: {}", bucket, e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(VeoError::Request(format!(
                    "Bucket lookup for {} returned {}: {}",
                    bucket, status, error_text
                )))
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> VeoResult<()> {
        let token = self.tokens.access_token().await?;
        info!("🪣 Creating bucket {} in {}", bucket, self.location);

        let response = self
            .client
            .post(format!("{}/storage/v1/b", self.base_url))
            .query(&[("project", self.project_id.as_str())])
            .bearer_auth(&token)
            .json(&serde_json::json!({ "name": bucket, "location": self.location }))
            .send()
            .await
            .map_err(|e| VeoError::Request(format!("Failed to create bucket {}: {}", bucket, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Bucket creation failed ({}): {}", status, error_text);
            return Err(VeoError::Request(format!(
                "Bucket creation for {} returned {}: {}",
                bucket, status, error_text
            )));
        }

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> VeoResult<Vec<StoredObject>> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| VeoError::List(e.to_string()))?;
        let url = format!("{}/o", self.bucket_url(bucket));

        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("prefix", prefix.to_string()),
                ("fields", "items(name,timeCreated),nextPageToken".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(&url)
                .query(&query)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| VeoError::List(format!("Failed to list gs://{}/{}: {}", bucket, prefix, e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(VeoError::List(format!(
                    "Listing gs://{}/{} returned {}: {}",
                    bucket, prefix, status, error_text
                )));
            }

            let page: ObjectListResponse = response
                .json()
                .await
                .map_err(|e| VeoError::List(format!("Invalid listing response: {}", e)))?;

            objects.extend(page.items.into_iter().map(|item| StoredObject {
                bucket: bucket.to_string(),
                name: item.name,
                created: item.time_created,
            }));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        info!("📂 Listed {} objects under gs://{}/{}", objects.len(), bucket, prefix);
        Ok(objects)
    }

    async fn download(&self, bucket: &str, path: &str, local_path: &Path) -> VeoResult<()> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| VeoError::Download(e.to_string()))?;

        info!("⬇️ Downloading gs://{}/{} to {}", bucket, path, local_path.display());

        let mut response = self
            .client
            .get(format!("{}/o/{}", self.bucket_url(bucket), urlencoding::encode(path)))
            .query(&[("alt", "media")])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| VeoError::Download(format!("Failed to fetch gs://{}/{}: {}", bucket, path, e)))?;

        if !response.status().is_success() {
            return Err(VeoError::Download(format!(
                "Failed to download gs://{}/{}: {}",
                bucket,
                path,
                response.status()
            )));
        }

        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| VeoError::Download(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let mut file = fs::File::create(local_path)
            .await
            .map_err(|e| VeoError::Download(format!("Failed to create {}: {}", local_path.display(), e)))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| VeoError::Download(format!("Download of gs://{}/{} interrupted: {}", bucket, path, e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| VeoError::Download(format!("Failed to write {}: {}", local_path.display(), e)))?;
        }
        file.flush()
            .await
            .map_err(|e| VeoError::Download(format!("Failed to write {}: {}", local_path.display(), e)))?;

        info!("✅ Downloaded video to: {}", local_path.display());
        Ok(())
    }
}
