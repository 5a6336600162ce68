// src/services/output_video.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{VeoError, VeoResult};
use crate::gcs_client::ObjectStore;
use crate::models::{GcsUri, VideoRef};

pub const GENERATED_FILE_NAME: &str = "generated_video.mp4";
const PREVIEW_DIR: &str = "previews";
const PARTIAL_SUFFIX: &str = "part";

/// Materializes clips from cloud storage onto local disk so they can be streamed.
pub struct OutputVideoService {
    store: Arc<dyn ObjectStore>,
    output_dir: PathBuf,
    /// One lock per destination so a file is never fetched twice at once.
    in_progress: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl OutputVideoService {
    pub fn new(store: Arc<dyn ObjectStore>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
            in_progress: Mutex::new(HashMap::new()),
        }
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.output_dir.join(session_id)
    }

    async fn lock_for(&self, local_path: &Path) -> Arc<Mutex<()>> {
        self.in_progress
            .lock()
            .await
            .entry(local_path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Downloads `video` to `{dir}/{file_name}` and returns it with the local path filled in.
    pub async fn download(&self, video: &VideoRef, dir: &Path, file_name: &str) -> VeoResult<VideoRef> {
        let local_path = dir.join(file_name);
        let lock = self.lock_for(&local_path).await;
        let _guard = lock.lock().await;

        self.fetch(video, &local_path).await
    }

    /// Downloads into a sibling `.part` file and renames it into place, so
    /// `local_path` only ever holds a complete copy.
    async fn fetch(&self, video: &VideoRef, local_path: &Path) -> VeoResult<VideoRef> {
        let uri = GcsUri::parse(&video.uri).map_err(|e| VeoError::Download(e.to_string()))?;
        let partial = partial_path(local_path);

        if let Err(e) = self.store.download(&uri.bucket, &uri.path, &partial).await {
            discard(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, local_path).await {
            discard(&partial).await;
            return Err(VeoError::Download(format!(
                "Failed to move {} into place: {}",
                local_path.display(),
                e
            )));
        }

        Ok(video.clone().with_local_path(local_path.to_string_lossy()))
    }

    /// Downloads a freshly generated clip into the session's output directory.
    pub async fn materialize_generated(&self, video: &VideoRef, session_id: &str) -> VeoResult<VideoRef> {
        self.download(video, &self.session_dir(session_id), GENERATED_FILE_NAME)
            .await
    }

    /// Local copy of a library clip, downloading it on first use.
    ///
    /// Generated objects are never rewritten, so an existing copy is reused.
    pub async fn preview(&self, video: &VideoRef) -> VeoResult<VideoRef> {
        let uri = GcsUri::parse(&video.uri)?;
        let local_path = self
            .output_dir
            .join(PREVIEW_DIR)
            .join(preview_file_name(&uri));

        let lock = self.lock_for(&local_path).await;
        let _guard = lock.lock().await;

        if let Ok(metadata) = tokio::fs::metadata(&local_path).await {
            if metadata.is_file() && metadata.len() > 0 {
                tracing::debug!("Reusing preview {}", local_path.display());
                return Ok(video.clone().with_local_path(local_path.to_string_lossy()));
            }
        }

        self.fetch(video, &local_path).await
    }
}

fn partial_path(local_path: &Path) -> PathBuf {
    let mut name = local_path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    local_path.with_file_name(name)
}

async fn discard(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove partial download {}: {}", partial.display(), e);
        }
    }
}

/// Flattens the object path so clips sharing a file name in different folders don't collide.
fn preview_file_name(uri: &GcsUri) -> String {
    format!("{}__{}", uri.bucket, uri.path.replace('/', "_"))
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcs_client::MockObjectStore;

    fn writing_store(times: usize) -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store
            .expect_download()
            .times(times)
            .returning(|_, _, local_path| {
                std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
                std::fs::write(local_path, b"clip").unwrap();
                Ok(())
            });
        store
    }

    #[tokio::test]
    async fn test_materialize_generated_sets_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store
            .expect_download()
            .withf(|bucket, path, _| bucket == "b" && path == "veo_outputs/op/sample_0.mp4")
            .times(1)
            .returning(|_, _, local_path| {
                std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
                std::fs::write(local_path, b"clip").unwrap();
                Ok(())
            });
        let service = OutputVideoService::new(Arc::new(store), dir.path());

        let video = service
            .materialize_generated(&VideoRef::new("gs://b/veo_outputs/op/sample_0.mp4"), "session-1")
            .await
            .unwrap();

        let expected = dir.path().join("session-1").join(GENERATED_FILE_NAME);
        assert_eq!(video.local_path.as_deref(), Some(expected.to_string_lossy().as_ref()));
        assert_eq!(video.uri, "gs://b/veo_outputs/op/sample_0.mp4");
        assert_eq!(std::fs::read(&expected).unwrap(), b"clip");
        assert!(!partial_path(&expected).exists());
    }

    #[tokio::test]
    async fn test_download_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MockObjectStore::new();
        store
            .expect_download()
            .returning(|_, _, _| Err(VeoError::Download("404".into())));
        let service = OutputVideoService::new(Arc::new(store), dir.path());

        let err = service
            .materialize_generated(&VideoRef::new("gs://b/v.mp4"), "s")
            .await
            .unwrap_err();
        assert!(matches!(err, VeoError::Download(_)));
    }

    #[tokio::test]
    async fn test_bad_uri_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = OutputVideoService::new(Arc::new(MockObjectStore::new()), dir.path());

        let err = service
            .materialize_generated(&VideoRef::new("https://example.com/v.mp4"), "s")
            .await
            .unwrap_err();
        assert!(matches!(err, VeoError::Download(_)));
    }

    #[tokio::test]
    async fn test_preview_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = OutputVideoService::new(Arc::new(writing_store(1)), dir.path());
        let video = VideoRef::new("gs://b/veo_outputs/op/sample_0.mp4");

        let first = service.preview(&video).await.unwrap();
        let second = service.preview(&video).await.unwrap();

        assert_eq!(first.local_path, second.local_path);
        assert!(first
            .local_path
            .unwrap()
            .ends_with("b__veo_outputs_op_sample_0.mp4"));
    }

    #[tokio::test]
    async fn test_failed_preview_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MockObjectStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_download()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, local_path| {
                std::fs::create_dir_all(local_path.parent().unwrap()).unwrap();
                std::fs::write(local_path, b"trunc").unwrap();
                Err(VeoError::Download("connection reset".into()))
            });
        store
            .expect_download()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, local_path| {
                std::fs::write(local_path, b"complete clip").unwrap();
                Ok(())
            });
        let service = OutputVideoService::new(Arc::new(store), dir.path());
        let video = VideoRef::new("gs://b/veo_outputs/clip.mp4");
        let local_path = dir.path().join(PREVIEW_DIR).join("b__veo_outputs_clip.mp4");

        let err = service.preview(&video).await.unwrap_err();
        assert!(matches!(err, VeoError::Download(_)));
        assert!(!local_path.exists());
        assert!(!partial_path(&local_path).exists());

        let retried = service.preview(&video).await.unwrap();
        let path = retried.local_path.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"complete clip");
        assert!(!partial_path(&local_path).exists());
    }

    #[tokio::test]
    async fn test_concurrent_previews_share_one_download() {
        let dir = tempfile::tempdir().unwrap();
        let service = OutputVideoService::new(Arc::new(writing_store(1)), dir.path());
        let video = VideoRef::new("gs://b/veo_outputs/op/sample_0.mp4");

        let (first, second) = tokio::join!(service.preview(&video), service.preview(&video));

        let first = first.unwrap().local_path.unwrap();
        assert_eq!(Some(first.clone()), second.unwrap().local_path);
        assert_eq!(std::fs::read(first).unwrap(), b"clip");
    }

    #[test]
    fn test_partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("out/s1/generated_video.mp4")),
            PathBuf::from("out/s1/generated_video.mp4.part")
        );
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for(Path::new("a/b.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a/b.webm")), "video/webm");
        assert_eq!(content_type_for(Path::new("a/b")), "application/octet-stream");
    }
}
