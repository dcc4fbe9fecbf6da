//! Transport-independent user input events.
//!
//! Protocol layers decode raw bytes into [`UiEvent`]s; the line editor and
//! the read state machine consume nothing else.

use heapless::Vec;

/// Encoded bytes of one typed character.
///
/// Normally one complete UTF-8 sequence. Plain-mode sessions pass every
/// byte on its own, so a multi-byte character arrives as several glyphs
/// whose concatenation is the full sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph(Vec<u8, 4>);

impl Glyph {
    /// One raw byte.
    pub fn from_byte(byte: u8) -> Self {
        let mut bytes = Vec::new();
        // Capacity is 4; the first push always fits.
        let _ = bytes.push(byte);
        Self(bytes)
    }

    /// UTF-8 encoding of `c`.
    pub fn from_char(c: char) -> Self {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        Self::from_slice(encoded.as_bytes())
    }

    /// Up to four bytes; anything beyond is dropped.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let len = bytes.len().min(4);
        let mut v = Vec::new();
        let _ = v.extend_from_slice(&bytes[..len]);
        Self(v)
    }

    /// Encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if this glyph is exactly the single byte `b`.
    pub fn is(&self, b: u8) -> bool {
        self.0.as_slice() == [b]
    }
}

/// Abstract user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Typed character; `\n` completes the line
    Codepoint(Glyph),

    /// Show context help
    Help,

    /// Erase the character before the cursor
    Backspace,

    /// Erase the character under the cursor
    Delete,

    /// Erase the whole line
    DeleteLine,

    /// Erase from the cursor to end of line
    DeleteToEol,

    /// Erase the previous word
    DeleteWord,

    /// Abandon the current line (Ctrl-C)
    Cancel,

    /// Previous history entry
    HistPrev,

    /// Next history entry
    HistNext,

    /// Cursor one character left
    CursorLeft,

    /// Cursor one character right
    CursorRight,

    /// Cursor one word left
    CursorLeftWord,

    /// Cursor one word right
    CursorRightWord,

    /// Cursor to end of line
    CursorEol,

    /// Cursor to start of line
    CursorSol,
}

impl UiEvent {
    /// Codepoint event for one ASCII byte.
    pub fn byte(b: u8) -> Self {
        UiEvent::Codepoint(Glyph::from_byte(b))
    }
}
