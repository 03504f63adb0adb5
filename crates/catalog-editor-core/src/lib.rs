//! catalog-editor-core: markdown authoring logic without UI dependencies.
//!
//! This crate provides:
//! - `TextBuffer` trait and the ropey-backed `EditorRope`, UTF-16 aware
//! - Platform traits (`SelectionSurface`, `DocumentHost`, `DragEvent`)
//! - Splicing around the selection with deferred selection restore
//! - Toolbar `FormatCommand`s and their dispatch
//! - The image upload pipeline over an injected `ImageUploader`
//! - `render_preview` and the `sanitize_preview` allow-list pass
//! - `CodeEditor`, which ties the above together for a host

pub mod actions;
pub mod editor;
pub mod execute;
pub mod platform;
pub mod render;
pub mod sanitize;
pub mod text;
pub mod types;
pub mod upload;

pub use actions::{CommandOutcome, FormatCommand, UnknownCommand, Wrapper};
pub use editor::CodeEditor;
pub use execute::{EditTarget, splice_around, splice_str};
pub use platform::{DocumentHost, DragEvent, MemorySurface, PlatformError, SelectionSurface};
pub use render::render_preview;
pub use sanitize::{render_preview_sanitized, sanitize_preview};
pub use smol_str::SmolStr;
pub use text::{EditorRope, TextBuffer, utf16_len};
pub use types::{Selection, ViewMode};
pub use upload::{
    CompletedUpload, ImageFile, ImageUploader, PLACEHOLDER_IMAGE, PLACEHOLDER_URL, PendingUpload,
    UploadBatch, UploadError, UploadOrdering, UploadOutcome, UploadTracker, accept_images,
    image_markdown, is_absolute_url, resolve_image_url,
};
