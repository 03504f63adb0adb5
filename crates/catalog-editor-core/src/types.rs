//! Core editor types: selection ranges and the edit/preview toggle.
//!
//! These types are framework-agnostic. Offsets are UTF-16 code units, which is
//! what native text controls report for their selection.

use std::ops::Range;

/// Text selection as an ordered pair of UTF-16 offsets.
///
/// `start <= end` always holds; constructing from an unordered pair swaps the
/// bounds. A collapsed selection is a plain cursor.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Create a selection, normalizing the bounds so that `start <= end`.
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Selection length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    /// Move both bounds forward by `by` code units.
    pub fn shifted(&self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }

    /// Clamp both bounds to `len`.
    pub fn clamped(&self, len: usize) -> Self {
        Self {
            start: self.start.min(len),
            end: self.end.min(len),
        }
    }

    /// Convert to a Range<usize>.
    pub fn to_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Selection {
    fn from(r: Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

/// Which surface the editor currently shows.
///
/// Switching modes never touches the document; it only selects between the
/// editable surface and the rendered preview.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Editing,
    Previewing,
}

impl ViewMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Editing => ViewMode::Previewing,
            ViewMode::Previewing => ViewMode::Editing,
        }
    }

    pub fn is_preview(self) -> bool {
        self == ViewMode::Previewing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_bounds() {
        let sel = Selection::new(5, 10);
        assert_eq!(sel.start, 5);
        assert_eq!(sel.end, 10);

        // Reversed input is normalized
        let sel = Selection::new(10, 5);
        assert_eq!(sel.start, 5);
        assert_eq!(sel.end, 10);
    }

    #[test]
    fn test_selection_collapsed() {
        let sel = Selection::collapsed(7);
        assert!(sel.is_collapsed());
        assert!(sel.is_empty());
        assert_eq!(sel.len(), 0);
        assert_eq!(sel.to_range(), 7..7);
    }

    #[test]
    fn test_selection_shift_and_clamp() {
        let sel = Selection::new(2, 6);
        assert_eq!(sel.shifted(3), Selection::new(5, 9));
        assert_eq!(sel.clamped(4), Selection::new(2, 4));
        assert_eq!(sel.clamped(1), Selection::collapsed(1));
    }

    #[test]
    fn test_view_mode_toggle() {
        let mode = ViewMode::default();
        assert_eq!(mode, ViewMode::Editing);
        assert!(mode.toggled().is_preview());
        assert_eq!(mode.toggled().toggled(), ViewMode::Editing);
    }
}
