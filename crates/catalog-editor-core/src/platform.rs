//! Platform abstraction traits for editor operations.
//!
//! These traits define the interface between the editor logic and whatever
//! actually displays the text (a browser textarea, a native widget, a terminal
//! front end, a test double). The splicing and dispatch logic depends only on
//! these traits, never on a specific UI toolkit.

use crate::types::Selection;
use crate::upload::ImageFile;

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// The editable text surface: reads the live selection and restores it.
///
/// Implementations wrap the native text-input primitive. The browser
/// implementation reads `selectionStart`/`selectionEnd` from a textarea.
pub trait SelectionSurface {
    /// Read the current selection in UTF-16 code units.
    ///
    /// Returns `None` when the surface isn't mounted, in which case editing
    /// operations become no-ops.
    fn selection(&self) -> Option<Selection>;

    /// Return focus to the surface and select the given range.
    fn focus_and_select(&mut self, selection: Selection) -> Result<(), PlatformError>;
}

/// The owner of the authoritative document value.
///
/// The editor never mutates the document in place. It reads the current
/// value, computes a replacement and hands the whole thing back.
pub trait DocumentHost {
    /// The current document value.
    fn value(&self) -> String;

    /// Replace the document value.
    fn on_change(&mut self, new_value: String);
}

/// A drag-over or drop event delivered to the editing surface.
pub trait DragEvent {
    /// Suppress the platform's default handling (navigating to the file).
    fn prevent_default(&mut self);

    /// Keep the event from reaching enclosing handlers.
    fn stop_propagation(&mut self);

    /// Files carried by the event's data transfer. Text payloads are ignored.
    fn files(&self) -> Vec<ImageFile>;
}

impl<T: SelectionSurface + ?Sized> SelectionSurface for &mut T {
    fn selection(&self) -> Option<Selection> {
        (**self).selection()
    }

    fn focus_and_select(&mut self, selection: Selection) -> Result<(), PlatformError> {
        (**self).focus_and_select(selection)
    }
}

impl<T: DocumentHost + ?Sized> DocumentHost for &mut T {
    fn value(&self) -> String {
        (**self).value()
    }

    fn on_change(&mut self, new_value: String) {
        (**self).on_change(new_value)
    }
}

/// In-memory surface for hosts without a native text control.
///
/// Holds a selection directly; `focus_and_select` just records it. Useful
/// for command-line hosts and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySurface {
    selection: Option<Selection>,
    focused: bool,
}

impl MemorySurface {
    /// A mounted surface with the given selection.
    pub fn new(selection: Selection) -> Self {
        Self {
            selection: Some(selection),
            focused: false,
        }
    }

    /// A surface that isn't mounted.
    pub fn unmounted() -> Self {
        Self::default()
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    pub fn unmount(&mut self) {
        self.selection = None;
        self.focused = false;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

impl SelectionSurface for MemorySurface {
    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn focus_and_select(&mut self, selection: Selection) -> Result<(), PlatformError> {
        if self.selection.is_none() {
            return Err("surface is not mounted".into());
        }
        self.selection = Some(selection);
        self.focused = true;
        Ok(())
    }
}

/// A plain string document.
impl DocumentHost for String {
    fn value(&self) -> String {
        self.clone()
    }

    fn on_change(&mut self, new_value: String) {
        *self = new_value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_surface_restore() {
        let mut surface = MemorySurface::new(Selection::collapsed(0));
        assert!(!surface.is_focused());
        surface.focus_and_select(Selection::new(2, 4)).unwrap();
        assert!(surface.is_focused());
        assert_eq!(surface.selection(), Some(Selection::new(2, 4)));
    }

    #[test]
    fn test_unmounted_surface_refuses_restore() {
        let mut surface = MemorySurface::unmounted();
        assert_eq!(surface.selection(), None);
        assert!(surface.focus_and_select(Selection::collapsed(0)).is_err());
    }

    #[test]
    fn test_string_host() {
        let mut doc = String::from("a");
        doc.on_change("b".to_string());
        assert_eq!(doc.value(), "b");
    }
}
