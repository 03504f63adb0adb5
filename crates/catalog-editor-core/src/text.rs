//! Text buffer abstraction for editor storage.
//!
//! The `TextBuffer` trait gives the splicing code one interface over whatever
//! holds the document text. Native text controls report selections in UTF-16
//! code units, so the trait converts between those and char offsets.

use smol_str::{SmolStr, ToSmolStr};
use std::ops::Range;

/// Length of a string in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// A text buffer that supports insertion and UTF-16 offset conversion.
///
/// Char offsets are Unicode scalar values. UTF-16 offsets are code units.
pub trait TextBuffer {
    /// Total length in chars (Unicode scalar values).
    fn len_chars(&self) -> usize;

    /// Total length in UTF-16 code units.
    fn len_utf16(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Convert a UTF-16 offset to a char offset.
    ///
    /// Offsets past the end clamp to the end. An offset that lands inside a
    /// surrogate pair resolves to the char the pair encodes.
    fn utf16_to_char(&self, utf16_offset: usize) -> usize;

    /// Convert a char offset to a UTF-16 offset.
    fn char_to_utf16(&self, char_offset: usize) -> usize;

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Get a slice as SmolStr. Returns None if range is invalid.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Get a slice addressed in UTF-16 code units.
    fn slice_utf16(&self, utf16_range: Range<usize>) -> Option<SmolStr> {
        if utf16_range.start > utf16_range.end || utf16_range.end > self.len_utf16() {
            return None;
        }
        let start = self.utf16_to_char(utf16_range.start);
        let end = self.utf16_to_char(utf16_range.end);
        self.slice(start..end)
    }

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) insertion and offset conversions.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from string.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope.
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }
}

impl TextBuffer for EditorRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    fn utf16_to_char(&self, utf16_offset: usize) -> usize {
        let clamped = utf16_offset.min(self.rope.len_utf16_cu());
        self.rope.utf16_cu_to_char(clamped)
    }

    fn char_to_utf16(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.rope.len_chars());
        self.rope.char_to_utf16_cu(clamped)
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        let clamped = char_offset.min(self.rope.len_chars());
        self.rope.insert(clamped, text);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EditorRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut rope = EditorRope::from_str("hello world");
        assert_eq!(rope.len_chars(), 11);
        assert_eq!(rope.len_utf16(), 11);

        rope.insert(5, " beautiful");
        assert_eq!(rope.to_string(), "hello beautiful world");
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut rope = EditorRope::from_str("abc");
        rope.insert(99, "!");
        assert_eq!(rope.to_string(), "abc!");
    }

    #[test]
    fn test_slice() {
        let rope = EditorRope::from_str("hello world");
        assert_eq!(rope.slice(0..5).as_deref(), Some("hello"));
        assert_eq!(rope.slice(6..11).as_deref(), Some("world"));
        assert_eq!(rope.slice(0..100), None);
    }

    #[test]
    fn test_utf16_conversion() {
        // The emoji is one char but two UTF-16 code units
        let rope = EditorRope::from_str("hi 🌍!");
        assert_eq!(rope.len_chars(), 5);
        assert_eq!(rope.len_utf16(), 6);
        assert_eq!(utf16_len("hi 🌍!"), 6);

        assert_eq!(rope.utf16_to_char(3), 3); // before emoji
        assert_eq!(rope.utf16_to_char(5), 4); // after emoji
        assert_eq!(rope.char_to_utf16(4), 5);
        assert_eq!(rope.utf16_to_char(50), 5); // clamped

        assert_eq!(rope.slice_utf16(3..5).as_deref(), Some("🌍"));
        assert_eq!(rope.slice_utf16(0..7), None);
    }
}
