//! Upload collaborator: where a finished drawing goes.

use crate::media::{MediaItem, MediaKind, NoteId};
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use uuid::Uuid;

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload rejected by server (HTTP {0})")]
    Rejected(u16),
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upload error: {0}")]
    Other(String),
}

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Submits one binary image for one note.
///
/// Implementations decide the transport; the contract is one call per save,
/// a unique filename, and an acknowledged [`MediaItem`] on success.
pub trait Uploader: Send + Sync {
    fn submit(
        &self,
        note_id: NoteId,
        filename: &str,
        data: Vec<u8>,
    ) -> BoxFuture<'_, UploadResult<MediaItem>>;
}

/// One recorded call to [`MemoryUploader::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub note_id: NoteId,
    pub filename: String,
    pub data: Vec<u8>,
}

/// In-memory uploader for testing and offline use.
#[derive(Default)]
pub struct MemoryUploader {
    submissions: RwLock<Vec<Submission>>,
    failing: AtomicBool,
}

impl MemoryUploader {
    /// Create an uploader that acknowledges every submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an uploader that rejects every submission.
    pub fn failing() -> Self {
        let uploader = Self::default();
        uploader.set_failing(true);
        uploader
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Every submission received so far, accepted or not.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .read()
            .map(|subs| subs.clone())
            .unwrap_or_default()
    }
}

impl Uploader for MemoryUploader {
    fn submit(
        &self,
        note_id: NoteId,
        filename: &str,
        data: Vec<u8>,
    ) -> BoxFuture<'_, UploadResult<MediaItem>> {
        let filename = filename.to_string();
        Box::pin(async move {
            let mut subs = self
                .submissions
                .write()
                .map_err(|e| UploadError::Other(format!("Lock error: {}", e)))?;
            subs.push(Submission {
                note_id,
                filename: filename.clone(),
                data,
            });
            drop(subs);

            if self.failing.load(Ordering::Relaxed) {
                return Err(UploadError::Rejected(500));
            }
            Ok(MediaItem {
                id: Uuid::new_v4().to_string(),
                kind: MediaKind::Image,
                url: format!("/static/uploads/{}", filename),
            })
        })
    }
}

#[cfg(feature = "http")]
pub use http::HttpUploader;

#[cfg(feature = "http")]
mod http {
    use super::{BoxFuture, UploadError, UploadResult, Uploader};
    use crate::media::{MediaItem, MediaResponse, NoteId};
    use reqwest::multipart::{Form, Part};

    /// Posts drawings as `multipart/form-data` to `{base_url}/note/{id}/add_media`.
    #[derive(Debug, Clone)]
    pub struct HttpUploader {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpUploader {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), base_url)
        }

        pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            Self { client, base_url }
        }

        /// Endpoint a drawing for `note_id` is posted to.
        pub fn endpoint(&self, note_id: NoteId) -> String {
            format!("{}/note/{}/add_media", self.base_url, note_id)
        }
    }

    impl Uploader for HttpUploader {
        fn submit(
            &self,
            note_id: NoteId,
            filename: &str,
            data: Vec<u8>,
        ) -> BoxFuture<'_, UploadResult<MediaItem>> {
            let url = self.endpoint(note_id);
            let filename = filename.to_string();
            Box::pin(async move {
                let part = Part::bytes(data).file_name(filename).mime_str("image/png")?;
                let form = Form::new().part("file", part);

                let response = self.client.post(&url).multipart(form).send().await?;
                let status = response.status();
                log::debug!("Upload to {} answered {}", url, status);

                // Error bodies may not be JSON at all.
                let body: MediaResponse = response
                    .json()
                    .await
                    .map_err(|_| UploadError::Rejected(status.as_u16()))?;

                match body.media {
                    Some(media) if body.is_success() && status.is_success() => Ok(media),
                    _ => Err(UploadError::Rejected(status.as_u16())),
                }
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_endpoint_trims_slash() {
            let uploader = HttpUploader::new("http://localhost:3030/");
            assert_eq!(
                uploader.endpoint(NoteId(42)),
                "http://localhost:3030/note/42/add_media"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::block_on;

    #[test]
    fn test_memory_uploader_records() {
        let uploader = MemoryUploader::new();
        let media = block_on(uploader.submit(NoteId(7), "a.png", vec![1, 2, 3])).unwrap();
        assert_eq!(media.url, "/static/uploads/a.png");

        let subs = uploader.submissions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].note_id, NoteId(7));
        assert_eq!(subs[0].data, vec![1, 2, 3]);
    }

    #[test]
    fn test_failing_uploader_still_records() {
        let uploader = MemoryUploader::failing();
        let result = block_on(uploader.submit(NoteId(1), "b.png", vec![]));
        assert!(matches!(result, Err(UploadError::Rejected(500))));
        assert_eq!(uploader.submissions().len(), 1);
    }
}
