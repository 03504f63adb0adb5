//! The editor shell: command dispatch, image uploads and preview toggling
//! over one editing surface and its document host.

use futures_util::future;
use web_time::Instant;

use crate::actions::{CommandOutcome, FormatCommand};
use crate::execute::EditTarget;
use crate::platform::{DocumentHost, DragEvent, PlatformError, SelectionSurface};
use crate::render::render_preview;
use crate::sanitize::render_preview_sanitized;
use crate::text::utf16_len;
use crate::types::{Selection, ViewMode};
use crate::upload::{
    CompletedUpload, ImageFile, ImageUploader, PLACEHOLDER_URL, PendingUpload, UploadBatch,
    UploadError, UploadOrdering, UploadOutcome, UploadTracker, accept_images, resolve_image_url,
};

/// Markdown editor over a selection surface `S` and document host `H`, with
/// an optional image uploader `U`.
///
/// The editor holds no document state of its own. Every edit reads the host's
/// current value and hands back a replacement.
#[derive(Debug)]
pub struct CodeEditor<S, H, U = ()> {
    target: EditTarget<S, H>,
    uploader: Option<U>,
    base_url: Option<String>,
    ordering: UploadOrdering,
    tracker: UploadTracker,
    view: ViewMode,
}

impl<S: SelectionSurface, H: DocumentHost> CodeEditor<S, H, ()> {
    /// An editor without an uploader. Image files insert the placeholder.
    pub fn new(surface: S, host: H) -> Self {
        Self {
            target: EditTarget::new(surface, host),
            uploader: None,
            base_url: None,
            ordering: UploadOrdering::default(),
            tracker: UploadTracker::new(),
            view: ViewMode::default(),
        }
    }
}

impl<S: SelectionSurface, H: DocumentHost, U: ImageUploader> CodeEditor<S, H, U> {
    /// Replace the upload delegate.
    pub fn with_uploader<V: ImageUploader>(self, uploader: V) -> CodeEditor<S, H, V> {
        CodeEditor {
            target: self.target,
            uploader: Some(uploader),
            base_url: self.base_url,
            ordering: self.ordering,
            tracker: self.tracker,
            view: self.view,
        }
    }

    /// Base URL that relative upload paths are resolved against.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_ordering(mut self, ordering: UploadOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn surface(&self) -> &S {
        self.target.surface()
    }

    pub fn surface_mut(&mut self) -> &mut S {
        self.target.surface_mut()
    }

    pub fn host(&self) -> &H {
        self.target.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.target.host_mut()
    }

    pub fn into_parts(self) -> (S, H) {
        self.target.into_parts()
    }

    /// Wrap the current selection with `before` and `after`.
    ///
    /// Returns false if the surface isn't mounted. The selection is restored
    /// by the next `after_render`.
    pub fn insert_around_selection(&mut self, before: &str, after: &str) -> bool {
        self.target.insert_around_selection(before, after)
    }

    /// Apply the selection restore scheduled by the last insertion.
    ///
    /// Hosts call this once the new value has been rendered.
    pub fn after_render(&mut self) -> Result<Option<Selection>, PlatformError> {
        self.target.flush_restore()
    }

    /// Run a toolbar command.
    pub fn apply_command(&mut self, command: FormatCommand) -> CommandOutcome {
        let Some(wrapper) = command.wrapper() else {
            // Only the image command has no wrapper.
            if self.tracker.is_uploading() {
                tracing::debug!("image command ignored while uploading");
                return CommandOutcome::Ignored;
            }
            return CommandOutcome::OpenFilePicker;
        };

        if self.insert_around_selection(wrapper.before, wrapper.after) {
            tracing::trace!(%command, "applied formatting command");
            CommandOutcome::Applied
        } else {
            CommandOutcome::Ignored
        }
    }

    /// Run a toolbar command by name. Unknown names are ignored.
    pub fn apply_named_command(&mut self, name: &str) -> CommandOutcome {
        match FormatCommand::from_name(name) {
            Some(command) => self.apply_command(command),
            None => {
                tracing::debug!(name, "ignoring unknown formatting command");
                CommandOutcome::Ignored
            }
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    /// Switch between the editing surface and the preview. The document is
    /// left alone.
    pub fn toggle_view(&mut self) -> ViewMode {
        self.view = self.view.toggled();
        self.view
    }

    /// Sanitized preview of the host's current value.
    pub fn preview_html(&self) -> String {
        render_preview_sanitized(&self.target.host().value())
    }

    /// Preview of the host's current value without the allow-list pass.
    pub fn preview_html_raw(&self) -> String {
        render_preview(&self.target.host().value())
    }

    /// Document length in UTF-16 code units.
    pub fn character_count(&self) -> usize {
        utf16_len(&self.target.host().value())
    }

    pub fn is_uploading(&self) -> bool {
        self.tracker.is_uploading()
    }

    /// A handle onto the pending-upload counter.
    pub fn upload_tracker(&self) -> UploadTracker {
        self.tracker.clone()
    }

    /// Drag-over on the editing surface. Suppresses the platform default so
    /// dropping a file doesn't navigate away.
    pub fn on_drag_over<E: DragEvent>(&self, event: &mut E) {
        event.prevent_default();
        event.stop_propagation();
    }

    /// Insert a finished upload at the current selection.
    ///
    /// A successful upload is referenced by its resolved URL; a failed one
    /// gets the placeholder. Either way the upload stops counting as pending.
    pub fn complete_upload(&mut self, done: CompletedUpload) -> UploadOutcome {
        let CompletedUpload {
            file,
            result,
            pending,
        } = done;
        let outcome = match result {
            Ok(path) => {
                let url = resolve_image_url(self.base_url.as_deref(), &path);
                if self.insert_around_selection("![", &format!("]({url})")) {
                    UploadOutcome::Uploaded {
                        name: file.name,
                        url,
                    }
                } else {
                    UploadOutcome::Dropped { name: file.name }
                }
            }
            Err(UploadError::NotConfigured) => self.insert_placeholder(file),
            Err(err) => {
                tracing::warn!(name = %file.name, error = %err, "image upload failed, inserting placeholder");
                self.insert_placeholder(file)
            }
        };
        drop(pending);
        outcome
    }

    fn insert_placeholder(&mut self, file: ImageFile) -> UploadOutcome {
        if self.insert_around_selection("![", &format!("]({PLACEHOLDER_URL})")) {
            UploadOutcome::Placeholder { name: file.name }
        } else {
            UploadOutcome::Dropped { name: file.name }
        }
    }
}

impl<S: SelectionSurface, H: DocumentHost, U: ImageUploader + Clone> CodeEditor<S, H, U> {
    /// Start uploading image files without holding on to the editor.
    ///
    /// Non-image files are discarded here. Each accepted file counts as
    /// pending from now until its result is passed to `complete_upload` or
    /// the batch is dropped. Without an uploader every file completes at once
    /// with `UploadError::NotConfigured`.
    pub fn start_upload<'u>(&self, files: impl IntoIterator<Item = ImageFile>) -> UploadBatch<'u>
    where
        U: 'u,
    {
        let mut batch = UploadBatch::new(self.ordering);
        for file in accept_images(files) {
            let pending = self.tracker.begin();
            match &self.uploader {
                Some(uploader) => batch.push(upload_one(uploader.clone(), file, pending)),
                None => batch.push(future::ready(CompletedUpload {
                    file,
                    result: Err(UploadError::NotConfigured),
                    pending,
                })),
            }
        }
        batch
    }

    /// Drop on the editing surface. Uploads the image files it carries.
    pub async fn on_drop<E: DragEvent>(&mut self, event: &mut E) -> Vec<UploadOutcome> {
        event.prevent_default();
        event.stop_propagation();
        let files = event.files();
        self.upload_files(files).await
    }

    /// Files chosen in the picker opened by the image command.
    pub async fn on_files_selected(
        &mut self,
        files: impl IntoIterator<Item = ImageFile>,
    ) -> Vec<UploadOutcome> {
        self.upload_files(files).await
    }

    /// Upload image files and insert a reference for each as it finishes.
    ///
    /// Shorthand for `start_upload` followed by `complete_upload` on every
    /// result. Dropping the returned future abandons the remaining uploads
    /// without touching the document.
    pub async fn upload_files(
        &mut self,
        files: impl IntoIterator<Item = ImageFile>,
    ) -> Vec<UploadOutcome> {
        let mut batch = self.start_upload(files);
        let mut outcomes = Vec::with_capacity(batch.len());
        while let Some(done) = batch.next().await {
            outcomes.push(self.complete_upload(done));
        }
        outcomes
    }
}

async fn upload_one<U: ImageUploader>(
    uploader: U,
    file: ImageFile,
    pending: PendingUpload,
) -> CompletedUpload {
    let started = Instant::now();
    let result = uploader.upload_image(&file).await;
    tracing::debug!(
        name = %file.name,
        ok = result.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "upload finished"
    );
    CompletedUpload {
        file,
        result,
        pending,
    }
}
