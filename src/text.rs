//! Codepoint offset handling.
//!
//! Spans are expressed in codepoints while Rust strings and the `regex` crate
//! work in bytes. [`CharIndex`] converts between the two for a single text.

/// Byte offsets of every codepoint in a text, plus a trailing sentinel.
#[derive(Debug, Clone)]
pub struct CharIndex<'a> {
    text: &'a str,
    byte_offsets: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    /// Builds the index for `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        byte_offsets.push(text.len());
        Self { text, byte_offsets }
    }

    /// Returns the indexed text.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// Length of the text in codepoints.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.byte_offsets.len() - 1
    }

    /// Converts a byte offset to a codepoint offset.
    ///
    /// Offsets inside a multi-byte character round up to the next character.
    #[must_use]
    pub fn char_offset(&self, byte: usize) -> usize {
        match self.byte_offsets.binary_search(&byte) {
            Ok(i) | Err(i) => i.min(self.char_len()),
        }
    }

    /// Converts a codepoint offset to a byte offset.
    #[must_use]
    pub fn byte_offset(&self, char_offset: usize) -> Option<usize> {
        self.byte_offsets.get(char_offset).copied()
    }

    /// Returns the substring between two codepoint offsets.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }
        let from = self.byte_offset(start)?;
        let to = self.byte_offset(end)?;
        self.text.get(from..to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets_are_identity() {
        let index = CharIndex::new("hello");
        assert_eq!(index.char_len(), 5);
        assert_eq!(index.char_offset(3), 3);
        assert_eq!(index.byte_offset(5), Some(5));
        assert_eq!(index.slice(1, 4), Some("ell"));
    }

    #[test]
    fn test_multibyte_offsets() {
        // "é" is two bytes, "日" three
        let index = CharIndex::new("é日x");
        assert_eq!(index.char_len(), 3);
        assert_eq!(index.byte_offset(1), Some(2));
        assert_eq!(index.byte_offset(2), Some(5));
        assert_eq!(index.char_offset(5), 2);
        assert_eq!(index.slice(1, 2), Some("日"));
    }

    #[test]
    fn test_out_of_range() {
        let index = CharIndex::new("abc");
        assert_eq!(index.byte_offset(4), None);
        assert_eq!(index.slice(2, 5), None);
        assert_eq!(index.slice(2, 1), None);
        assert_eq!(index.char_offset(99), 3);
    }

    #[test]
    fn test_empty_text() {
        let index = CharIndex::new("");
        assert_eq!(index.char_len(), 0);
        assert_eq!(index.slice(0, 0), Some(""));
    }
}
