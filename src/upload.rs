//! Exercise-level media upload.
//!
//! One `upload` call reads the picked video, obtains a presigned write URL,
//! PUTs the payload, derives the public URL and tries to produce a
//! thumbnail. Sources that already uploaded successfully are remembered so
//! a repeated trigger on the same selection performs no storage write.

use bytes::Bytes;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::draft::DraftStore;
use crate::error::UploadError;
use crate::media::MediaRuntime;
use crate::models::{MediaHandle, UploadResult};
use crate::picker::DEFAULT_VIDEO_MIME;
use crate::storage::{StorageWriter, UploadUrlIssuer};

/// Filled once the source is stored; a failed attempt leaves it empty.
type UploadSlot = Arc<OnceCell<UploadResult>>;

pub struct MediaUploadPipeline {
    runtime: Arc<dyn MediaRuntime>,
    issuer: Arc<dyn UploadUrlIssuer>,
    writer: Arc<dyn StorageWriter>,
    uploaded: Mutex<HashMap<String, UploadSlot>>,
}

impl MediaUploadPipeline {
    pub fn new(
        runtime: Arc<dyn MediaRuntime>,
        issuer: Arc<dyn UploadUrlIssuer>,
        writer: Arc<dyn StorageWriter>,
    ) -> Self {
        Self {
            runtime,
            issuer,
            writer,
            uploaded: Mutex::new(HashMap::new()),
        }
    }

    fn seen(&self) -> MutexGuard<'_, HashMap<String, UploadSlot>> {
        self.uploaded.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn slot(&self, uri: &str) -> UploadSlot {
        self.seen().entry(uri.to_string()).or_default().clone()
    }

    pub fn is_uploaded(&self, source: &MediaHandle) -> bool {
        self.seen()
            .get(&source.uri)
            .is_some_and(|slot| slot.initialized())
    }

    /// Seed the seen-set with uploads recorded in a draft from an earlier session.
    pub fn restore(&self, store: &DraftStore) {
        for (uri, result) in store.uploaded_media() {
            if self.slot(&uri).set(result).is_ok() {
                debug!("Restored upload of {}", uri);
            }
        }
    }

    /// Upload one picked video and report its public and thumbnail URLs.
    ///
    /// Concurrent calls for the same source share one transfer: later
    /// callers wait for the first and receive its result.
    pub async fn upload(&self, source: &MediaHandle) -> Result<UploadResult, UploadError> {
        let slot = self.slot(&source.uri);
        if let Some(previous) = slot.get() {
            debug!("Skipping upload of {}: already stored", source.filename);
            return Ok(previous.clone());
        }

        let result = slot.get_or_try_init(|| self.transfer(source)).await?;
        Ok(result.clone())
    }

    async fn transfer(&self, source: &MediaHandle) -> Result<UploadResult, UploadError> {
        let content_type = if source.mime_type.is_empty() {
            DEFAULT_VIDEO_MIME
        } else {
            source.mime_type.as_str()
        };

        let body: Bytes = self.runtime.read_binary(source).await.map_err(UploadError::Read)?;
        info!("Uploading {} ({} bytes)", source.filename, body.len());

        let presigned = self
            .issuer
            .issue(&source.filename, content_type)
            .await
            .map_err(|e| UploadError::UrlIssueFailed(e.to_string()))?;

        self.writer.put(&presigned.write_url, content_type, body.clone()).await?;

        let video_url = self.issuer.public_url(&presigned.object_key);

        let thumbnail_url = match self.runtime.make_thumbnail(source, &body).await {
            Ok(uri) => uri,
            Err(e) => {
                warn!("No thumbnail for {}: {}", source.filename, e);
                String::new()
            }
        };

        info!("Upload complete: {}", video_url);
        Ok(UploadResult {
            video_url,
            thumbnail_url,
        })
    }

    /// Upload every pending selection in the draft concurrently and attach
    /// the results. Failed exercises keep their selection for a retry.
    pub async fn upload_pending(&self, store: &mut DraftStore) -> Vec<(usize, UploadError)> {
        let pending = store.pending_media();
        let outcomes = join_all(pending.iter().map(|(index, handle)| async move {
            (*index, self.upload(handle).await)
        }))
        .await;

        let mut failures = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    store.attach_media(index, result);
                }
                Err(e) => {
                    warn!(index, "Upload failed: {}", e);
                    failures.push((index, e));
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeKind;
    use crate::error::{ComposerError, ThumbnailError, UploadStage};
    use crate::media::MockMediaRuntime;
    use crate::storage::{MockStorageWriter, MockUploadUrlIssuer, PresignedUpload, public_object_url};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle(uri: &str) -> MediaHandle {
        MediaHandle::new(uri, "squat.mov", "video/quicktime")
    }

    fn runtime_ok(thumbnail: std::result::Result<&'static str, ()>) -> MockMediaRuntime {
        let mut runtime = MockMediaRuntime::new();
        runtime.expect_kind().return_const(RuntimeKind::Native);
        runtime
            .expect_read_binary()
            .returning(|_| Ok(Bytes::from_static(b"video-bytes")));
        runtime.expect_make_thumbnail().returning(move |_, _| match thumbnail {
            Ok(uri) => Ok(uri.to_string()),
            Err(()) => Err(ThumbnailError::Extract("codec".to_string())),
        });
        runtime
    }

    fn issuer_ok() -> MockUploadUrlIssuer {
        let mut issuer = MockUploadUrlIssuer::new();
        issuer.expect_issue().returning(|_, _| {
            Ok(PresignedUpload {
                write_url: "https://pt-videos.s3.us-west-2.amazonaws.com/1-a.mov?X-Amz-Signature=x".to_string(),
                object_key: "1-a.mov".to_string(),
            })
        });
        issuer
            .expect_public_url()
            .returning(|key| public_object_url("pt-videos", "us-west-2", key));
        issuer
    }

    fn pipeline(runtime: MockMediaRuntime, issuer: MockUploadUrlIssuer, writer: MockStorageWriter) -> MediaUploadPipeline {
        MediaUploadPipeline::new(Arc::new(runtime), Arc::new(issuer), Arc::new(writer))
    }

    #[tokio::test]
    async fn test_upload_reports_public_url_and_thumbnail() {
        let mut writer = MockStorageWriter::new();
        writer
            .expect_put()
            .withf(|url, ct, body| url.contains("X-Amz-Signature") && ct == "video/quicktime" && &body[..] == b"video-bytes")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let pipeline = pipeline(runtime_ok(Ok("file:///thumbs/1.jpg")), issuer_ok(), writer);
        let result = pipeline.upload(&handle("file:///v/squat.mov")).await.unwrap();

        assert_eq!(result.video_url, "https://pt-videos.s3.us-west-2.amazonaws.com/1-a.mov");
        assert_eq!(result.thumbnail_url, "file:///thumbs/1.jpg");
    }

    #[tokio::test]
    async fn test_same_source_is_written_once() {
        let mut writer = MockStorageWriter::new();
        writer.expect_put().times(1).returning(|_, _, _| Ok(()));

        let pipeline = pipeline(runtime_ok(Ok("file:///thumbs/1.jpg")), issuer_ok(), writer);
        let source = handle("file:///v/squat.mov");

        let first = pipeline.upload(&source).await.unwrap();
        let second = pipeline.upload(&source).await.unwrap();
        assert_eq!(first, second);
        assert!(pipeline.is_uploaded(&source));
    }

    #[tokio::test]
    async fn test_thumbnail_failure_keeps_video_url() {
        let mut writer = MockStorageWriter::new();
        writer.expect_put().returning(|_, _, _| Ok(()));

        let pipeline = pipeline(runtime_ok(Err(())), issuer_ok(), writer);
        let result = pipeline.upload(&handle("file:///v/squat.mov")).await.unwrap();

        assert_eq!(result.video_url, "https://pt-videos.s3.us-west-2.amazonaws.com/1-a.mov");
        assert_eq!(result.thumbnail_url, "");
    }

    #[tokio::test]
    async fn test_url_issue_failure_skips_write() {
        let mut issuer = MockUploadUrlIssuer::new();
        issuer
            .expect_issue()
            .returning(|_, _| Err(ComposerError::Storage("expired credentials".to_string())));
        let mut writer = MockStorageWriter::new();
        writer.expect_put().never();

        let pipeline = pipeline(runtime_ok(Ok("t")), issuer, writer);
        let source = handle("file:///v/squat.mov");
        let err = pipeline.upload(&source).await.unwrap_err();

        assert_eq!(err.stage(), UploadStage::UrlIssue);
        assert!(!pipeline.is_uploaded(&source));
    }

    #[tokio::test]
    async fn test_storage_failure_allows_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let mut writer = MockStorageWriter::new();
        writer.expect_put().times(2).returning(move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(UploadError::StorageWriteFailed {
                    status: 403,
                    message: "AccessDenied".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let pipeline = pipeline(runtime_ok(Ok("t")), issuer_ok(), writer);
        let source = handle("file:///v/squat.mov");

        let err = pipeline.upload(&source).await.unwrap_err();
        assert_eq!(err.stage(), UploadStage::StorageWrite);
        assert!(pipeline.upload(&source).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_pending_attaches_results() {
        let mut writer = MockStorageWriter::new();
        writer.expect_put().times(2).returning(|_, _, _| Ok(()));
        let pipeline = pipeline(runtime_ok(Ok("data:image/jpeg;base64,AA==")), issuer_ok(), writer);

        let mut store = DraftStore::new();
        let a = store.add_exercise();
        store.add_exercise();
        let c = store.add_exercise();
        store.select_media(a, handle("file:///v/a.mov"));
        store.select_media(c, handle("file:///v/c.mov"));

        let failures = pipeline.upload_pending(&mut store).await;
        assert!(failures.is_empty());
        assert!(store.pending_media().is_empty());
        assert!(store.draft().exercises[a].video_url.is_some());
        assert!(store.draft().exercises[1].video_url.is_none());
        assert_eq!(
            store.draft().exercises[c].thumbnail_url.as_deref(),
            Some("data:image/jpeg;base64,AA==")
        );
    }

    /// Suspends while reading, the way a real file or network read does.
    struct SlowRuntime {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl MediaRuntime for SlowRuntime {
        fn kind(&self) -> RuntimeKind {
            RuntimeKind::Native
        }

        async fn read_binary(&self, _source: &MediaHandle) -> crate::error::Result<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Bytes::from_static(b"video-bytes"))
        }

        async fn make_thumbnail(&self, _source: &MediaHandle, _payload: &Bytes) -> std::result::Result<String, ThumbnailError> {
            tokio::task::yield_now().await;
            Ok("file:///thumbs/1.jpg".to_string())
        }
    }

    #[tokio::test]
    async fn test_overlapping_uploads_of_one_source_write_once() {
        let mut writer = MockStorageWriter::new();
        writer.expect_put().times(1).returning(|_, _, _| Ok(()));
        let runtime = Arc::new(SlowRuntime { reads: AtomicUsize::new(0) });
        let pipeline = MediaUploadPipeline::new(runtime.clone(), Arc::new(issuer_ok()), Arc::new(writer));

        let mut store = DraftStore::new();
        let a = store.add_exercise();
        let b = store.add_exercise();
        store.select_media(a, handle("file:///v/squat.mov"));
        store.select_media(b, handle("file:///v/squat.mov"));

        let failures = pipeline.upload_pending(&mut store).await;
        assert!(failures.is_empty());
        assert_eq!(runtime.reads.load(Ordering::SeqCst), 1);
        assert_eq!(store.draft().exercises[a].video_url, store.draft().exercises[b].video_url);
        assert!(store.draft().exercises[b].video_url.is_some());
    }

    #[tokio::test]
    async fn test_restored_uploads_are_not_written_again() {
        let mut store = DraftStore::new();
        let i = store.add_exercise();
        store.select_media(i, handle("file:///v/squat.mov"));
        store.attach_media(
            i,
            UploadResult {
                video_url: "https://pt-videos.s3.us-west-2.amazonaws.com/1-a.mov".to_string(),
                thumbnail_url: String::new(),
            },
        );

        // No expectations: any read, issue or write would panic.
        let pipeline = pipeline(MockMediaRuntime::new(), MockUploadUrlIssuer::new(), MockStorageWriter::new());
        pipeline.restore(&store);

        let source = handle("file:///v/squat.mov");
        assert!(pipeline.is_uploaded(&source));
        let result = pipeline.upload(&source).await.unwrap();
        assert_eq!(result.video_url, "https://pt-videos.s3.us-west-2.amazonaws.com/1-a.mov");
    }
}
