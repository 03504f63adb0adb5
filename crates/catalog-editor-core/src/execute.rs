//! Splicing text around the current selection.
//!
//! Every edit the editor makes goes through `splice_around`: the selected text
//! is kept, `before` lands in front of it and `after` behind it. The host gets
//! the whole new value, and the selection is restored on the next render so
//! the original text stays highlighted between the new markers.

use crate::platform::{DocumentHost, PlatformError, SelectionSurface};
use crate::text::{EditorRope, TextBuffer, utf16_len};
use crate::types::Selection;

/// Insert `before` and `after` around `selection` in `buffer`.
///
/// The selection is clamped to the buffer first. Returns the selection that
/// wraps the originally selected text in the new buffer.
pub fn splice_around<B: TextBuffer>(
    buffer: &mut B,
    selection: Selection,
    before: &str,
    after: &str,
) -> Selection {
    let selection = selection.clamped(buffer.len_utf16());
    let start = buffer.utf16_to_char(selection.start);
    let end = buffer.utf16_to_char(selection.end);

    // Snap to char boundaries so the restored range matches what was kept.
    let start_utf16 = buffer.char_to_utf16(start);
    let selected_len = buffer.char_to_utf16(end) - start_utf16;

    // Insert the closing marker first so `start` stays valid.
    buffer.insert(end, after);
    buffer.insert(start, before);

    let restored_start = start_utf16 + utf16_len(before);
    Selection::new(restored_start, restored_start + selected_len)
}

/// Splice a plain string. Convenience wrapper over `splice_around`.
pub fn splice_str(value: &str, selection: Selection, before: &str, after: &str) -> (String, Selection) {
    let mut rope = EditorRope::from_str(value);
    let restore = splice_around(&mut rope, selection, before, after);
    (rope.to_string(), restore)
}

/// The editing surface paired with the document host.
///
/// Owns the bookkeeping for deferred selection restoration: an insertion
/// records where the selection should go, and `flush_restore` applies it once
/// the host has re-rendered with the new value.
#[derive(Debug)]
pub struct EditTarget<S, H> {
    surface: S,
    host: H,
    pending_restore: Option<Selection>,
}

impl<S: SelectionSurface, H: DocumentHost> EditTarget<S, H> {
    pub fn new(surface: S, host: H) -> Self {
        Self {
            surface,
            host,
            pending_restore: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Selection waiting to be restored on the next render.
    pub fn pending_restore(&self) -> Option<Selection> {
        self.pending_restore
    }

    /// Wrap the current selection with `before` and `after`.
    ///
    /// Reads the live selection and the host's current value, hands the host
    /// the spliced value, and schedules the selection restore. Returns false
    /// without touching anything when the surface isn't mounted.
    pub fn insert_around_selection(&mut self, before: &str, after: &str) -> bool {
        let Some(selection) = self.surface.selection() else {
            tracing::debug!("insert skipped: editing surface not mounted");
            return false;
        };

        let (new_value, restore) = splice_str(&self.host.value(), selection, before, after);
        self.host.on_change(new_value);
        // A newer insertion supersedes any restore that hasn't been flushed.
        self.pending_restore = Some(restore);
        true
    }

    /// Apply the pending selection restore, if any.
    ///
    /// Call after the host has rendered the new value. Restoring before that
    /// races the surface's own re-render.
    pub fn flush_restore(&mut self) -> Result<Option<Selection>, PlatformError> {
        let Some(selection) = self.pending_restore.take() else {
            return Ok(None);
        };
        self.surface.focus_and_select(selection)?;
        Ok(Some(selection))
    }

    pub fn into_parts(self) -> (S, H) {
        (self.surface, self.host)
    }
}
