// src/services/video_library.rs
//! Library of generated clips: a TTL-memoized bucket listing plus the pure
//! filter / sort / paginate stages applied on top of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::DEFAULT_LIST_TTL_SECS;
use crate::error::VeoResult;
use crate::gcs_client::ObjectStore;
use crate::models::VideoRef;

pub const PAGE_SIZE: usize = 6;

pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "webm", "mkv", "avi"];

/// A clip found in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryVideo {
    #[serde(flatten)]
    pub video: VideoRef,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// One page of the library as served to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoPage {
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub videos: Vec<LibraryVideo>,
}

struct CacheEntry {
    fetched_at: Instant,
    videos: Arc<Vec<LibraryVideo>>,
}

pub struct VideoLibrary {
    store: Arc<dyn ObjectStore>,
    ttl: Duration,
    cache: RwLock<HashMap<(String, String), CacheEntry>>,
    /// Bumped by `invalidate`; listings started under an older epoch are not cached.
    epoch: AtomicU64,
}

impl VideoLibrary {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_ttl(store, Duration::from_secs(DEFAULT_LIST_TTL_SECS))
    }

    pub fn with_ttl(store: Arc<dyn ObjectStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            cache: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Videos under `prefix`, newest first. Served from cache while younger than the TTL.
    pub async fn list_videos(&self, bucket: &str, prefix: &str) -> VeoResult<Arc<Vec<LibraryVideo>>> {
        let key = (bucket.to_string(), prefix.to_string());

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    tracing::debug!("Library cache hit for gs://{}/{}", bucket, prefix);
                    return Ok(entry.videos.clone());
                }
            }
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let objects = self.store.list_objects(bucket, &folder(prefix)).await?;
        let mut videos: Vec<LibraryVideo> = objects
            .into_iter()
            .filter(|object| is_video(&object.name))
            .map(|object| LibraryVideo {
                video: VideoRef::new(object.uri()),
                file_name: object.name.rsplit('/').next().unwrap_or(&object.name).to_string(),
                created_at: object.created,
            })
            .collect();
        // stable sort keeps listing order among equal timestamps
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let videos = Arc::new(videos);
        {
            let mut cache = self.cache.write().await;
            if self.epoch.load(Ordering::SeqCst) == epoch {
                cache.insert(
                    key,
                    CacheEntry {
                        fetched_at: Instant::now(),
                        videos: videos.clone(),
                    },
                );
            } else {
                tracing::debug!("Library invalidated during listing of gs://{}/{}, not caching", bucket, prefix);
            }
        }

        tracing::info!("🎞️ Library gs://{}/{} holds {} videos", bucket, prefix, videos.len());
        Ok(videos)
    }

    /// Drops every cached listing.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        cache.clear();
    }

    /// List, filter, sort and paginate in one go.
    pub async fn page(
        &self,
        bucket: &str,
        prefix: &str,
        query: &str,
        sort: SortOrder,
        page: usize,
    ) -> VeoResult<VideoPage> {
        let videos = self.list_videos(bucket, prefix).await?;
        let mut filtered = filter_videos(&videos, query);
        if sort == SortOrder::Oldest {
            filtered.reverse();
        }
        Ok(paginate(&filtered, page, PAGE_SIZE))
    }
}

/// Listing prefix for a folder, so `veo_outputs` does not also match `veo_outputs_old/`.
pub fn folder(prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{}/", prefix)
    }
}

pub fn is_video(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| VIDEO_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Case-insensitive substring match over the full storage URI. A blank query keeps everything.
pub fn filter_videos(videos: &[LibraryVideo], query: &str) -> Vec<LibraryVideo> {
    let needle = query.trim().to_lowercase();
    videos
        .iter()
        .filter(|entry| needle.is_empty() || entry.video.uri.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// Slice out 1-based `page`, clamped to `[1, total_pages]`.
pub fn paginate(videos: &[LibraryVideo], page: usize, page_size: usize) -> VideoPage {
    let page_size = page_size.max(1);
    let total_pages = total_pages(videos.len(), page_size);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(videos.len());

    VideoPage {
        page,
        total_pages,
        total: videos.len(),
        videos: videos[start..end].to_vec(),
    }
}
