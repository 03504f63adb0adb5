//! Image upload pipeline types.
//!
//! The editor accepts image files from a file picker or a drop, hands each one
//! to an injected `ImageUploader`, and splices a markdown image reference into
//! the document once the upload resolves. Failed uploads fall back to a
//! placeholder reference so the user always sees that an image slot exists.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::future::{FutureExt, LocalBoxFuture};
use futures_util::stream::FuturesUnordered;
use smol_str::SmolStr;

/// Reference inserted when no uploader is configured or an upload fails.
pub const PLACEHOLDER_IMAGE: &str = "![](image-url)";

/// URL used inside the placeholder reference.
pub const PLACEHOLDER_URL: &str = "image-url";

/// A file chosen by the user or dropped onto the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    /// Original file name.
    pub name: SmolStr,
    /// Media type as reported by the platform, e.g. `image/png`.
    pub media_type: SmolStr,
    /// File contents.
    pub data: Bytes,
}

impl ImageFile {
    pub fn new(
        name: impl Into<SmolStr>,
        media_type: impl Into<SmolStr>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Whether the media type is an image type.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Keep only image files, discarding the rest.
pub fn accept_images(files: impl IntoIterator<Item = ImageFile>) -> Vec<ImageFile> {
    files
        .into_iter()
        .filter(|file| {
            let keep = file.is_image();
            if !keep {
                tracing::debug!(
                    name = %file.name,
                    media_type = %file.media_type,
                    "discarding non-image file"
                );
            }
            keep
        })
        .collect()
}

/// Error returned by an upload delegate.
///
/// The pipeline treats every variant the same way (placeholder fallback).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("no upload delegate configured")]
    NotConfigured,
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("upload transport failed: {0}")]
    Transport(String),
}

/// Uploads an image and returns the path the server stored it under.
///
/// The path may be server-relative (`images/cat.png`) or an absolute URL.
pub trait ImageUploader {
    fn upload_image(&self, file: &ImageFile) -> impl Future<Output = Result<String, UploadError>>;
}

/// Unit type implementation - no uploader configured.
impl ImageUploader for () {
    async fn upload_image(&self, _file: &ImageFile) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

impl<T: ImageUploader> ImageUploader for &T {
    fn upload_image(&self, file: &ImageFile) -> impl Future<Output = Result<String, UploadError>> {
        (*self).upload_image(file)
    }
}

impl<T: ImageUploader> ImageUploader for Arc<T> {
    fn upload_image(&self, file: &ImageFile) -> impl Future<Output = Result<String, UploadError>> {
        self.as_ref().upload_image(file)
    }
}

/// Whether `url` starts with a URL scheme (`https:`, `data:`, ...).
pub fn is_absolute_url(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Turn an uploaded path into the URL embedded in markdown.
///
/// Absolute URLs pass through unchanged. Relative paths are joined onto the
/// base URL with exactly one slash between them.
pub fn resolve_image_url(base_url: Option<&str>, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    match base_url {
        Some(base) if !base.is_empty() => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
        _ => path.to_string(),
    }
}

/// Markdown image reference for a resolved URL.
pub fn image_markdown(url: &str) -> String {
    format!("![]({url})")
}

/// How a batch of uploads is ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UploadOrdering {
    /// All uploads run at once; each reference is inserted as soon as its
    /// upload resolves. Insertion order follows resolution order.
    #[default]
    Resolution,
    /// Uploads run one at a time in the order the files arrived.
    Queued,
}

/// Shared count of uploads in flight.
///
/// Cloning gives another handle onto the same counter, so a host can keep
/// one to drive a spinner while the upload future is running.
#[derive(Clone, Debug, Default)]
pub struct UploadTracker {
    pending: Arc<AtomicUsize>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff at least one upload is pending.
    pub fn is_uploading(&self) -> bool {
        self.pending() > 0
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Mark one upload as started. The returned guard marks it finished when
    /// dropped, including when the owning future is dropped mid-flight.
    pub fn begin(&self) -> PendingUpload {
        self.pending.fetch_add(1, Ordering::AcqRel);
        PendingUpload {
            pending: self.pending.clone(),
        }
    }
}

/// Guard for one in-flight upload.
#[derive(Debug)]
pub struct PendingUpload {
    pending: Arc<AtomicUsize>,
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A finished upload, waiting to be inserted by the editor.
///
/// Holds the upload's pending guard, so the editor still counts as uploading
/// until the result is inserted or thrown away.
#[derive(Debug)]
pub struct CompletedUpload {
    pub(crate) file: ImageFile,
    pub(crate) result: Result<String, UploadError>,
    pub(crate) pending: PendingUpload,
}

impl CompletedUpload {
    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    /// The stored path, or why the upload failed.
    pub fn result(&self) -> Result<&str, &UploadError> {
        self.result.as_deref()
    }
}

/// Uploads started by one picker selection or drop.
///
/// The batch owns its uploads and borrows nothing from the editor, so the
/// editor stays usable while it is awaited. Dropping the batch abandons the
/// uploads that haven't been yielded yet.
pub struct UploadBatch<'u> {
    in_flight: FuturesUnordered<LocalBoxFuture<'u, CompletedUpload>>,
    queued: VecDeque<LocalBoxFuture<'u, CompletedUpload>>,
    ordering: UploadOrdering,
}

impl<'u> UploadBatch<'u> {
    pub fn new(ordering: UploadOrdering) -> Self {
        Self {
            in_flight: FuturesUnordered::new(),
            queued: VecDeque::new(),
            ordering,
        }
    }

    /// Add an upload. Queued batches don't poll it until the ones before it
    /// have been yielded.
    pub fn push(&mut self, upload: impl Future<Output = CompletedUpload> + 'u) {
        let upload = upload.boxed_local();
        match self.ordering {
            UploadOrdering::Resolution => self.in_flight.push(upload),
            UploadOrdering::Queued => self.queued.push_back(upload),
        }
    }

    /// Wait for the next upload to finish. `None` once the batch is drained.
    pub async fn next(&mut self) -> Option<CompletedUpload> {
        if self.in_flight.is_empty() {
            let upload = self.queued.pop_front()?;
            self.in_flight.push(upload);
        }
        self.in_flight.next().await
    }

    /// Uploads not yet yielded.
    pub fn len(&self) -> usize {
        self.in_flight.len() + self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for UploadBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadBatch")
            .field("in_flight", &self.in_flight.len())
            .field("queued", &self.queued.len())
            .field("ordering", &self.ordering)
            .finish()
    }
}

/// What the pipeline inserted for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Upload succeeded; a reference to `url` was inserted.
    Uploaded { name: SmolStr, url: String },
    /// Upload failed or no uploader is configured; the placeholder was
    /// inserted instead.
    Placeholder { name: SmolStr },
    /// Nothing was inserted because the editing surface is gone.
    Dropped { name: SmolStr },
}

impl UploadOutcome {
    pub fn name(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { name, .. }
            | UploadOutcome::Placeholder { name }
            | UploadOutcome::Dropped { name } => name,
        }
    }
}
