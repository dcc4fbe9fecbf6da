//! Terminal key decoder.
//!
//! Converts the raw byte stream of an ECMA-48 terminal into [`Character`]s:
//! literal codepoints, special keys (C0 controls, cursor keys, function
//! keys) with their modifiers, and decode errors.
//!
//! This is a pure decoder: one byte in, at most one character out. It never
//! times out by itself. A lone `ESC` stays pending until the next byte
//! arrives; callers with a clock call [`KeyDecoder::flush`] when their
//! escape timeout expires.

use core::fmt;

use bitflags::bitflags;

use super::event::Glyph;
use crate::error::DecodeError;

const ESC: u8 = 0x1b;

bitflags! {
    /// Key modifiers, in xterm's parameter encoding.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        /// Shift held
        const SHIFT = 1 << 0;
        /// Alt held
        const ALT = 1 << 1;
        /// Control held
        const CTRL = 1 << 2;
        /// Meta held, or the key was prefixed with ESC
        const CMD = 1 << 3;
    }
}

/// Non-literal key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpecialKey {
    /// C0 control code (1..=31)
    Control(u8),
    /// Cursor up
    Up,
    /// Cursor down
    Down,
    /// Cursor right
    Right,
    /// Cursor left
    Left,
    /// End
    End,
    /// Home
    Home,
    /// Keypad centre
    Begin,
    /// SS3 function key F1..F4
    Function(u8),
    /// `CSI n ~` key, by its number
    Tilde(u32),
}

impl SpecialKey {
    /// Conventional key name.
    pub fn name(&self) -> &'static str {
        const C0: [&str; 32] = [
            "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", "BS", "HT", "NL", "VT", "NP",
            "CR", "SO", "SI", "DLE", "DC1", "DC2", "DC3", "DC4", "NAK", "SYN", "ETB", "CAN", "EM",
            "SUB", "ESC", "FS", "GS", "RS", "US",
        ];

        match self {
            SpecialKey::Control(c) => C0.get(*c as usize).copied().unwrap_or(""),
            SpecialKey::Up => "up",
            SpecialKey::Down => "down",
            SpecialKey::Right => "right",
            SpecialKey::Left => "left",
            SpecialKey::End => "end",
            SpecialKey::Home => "home",
            SpecialKey::Begin => "begin",
            SpecialKey::Function(1) => "F1",
            SpecialKey::Function(2) => "F2",
            SpecialKey::Function(3) => "F3",
            SpecialKey::Function(4) => "F4",
            SpecialKey::Function(_) => "",
            SpecialKey::Tilde(1 | 7) => "home",
            SpecialKey::Tilde(2) => "insert",
            SpecialKey::Tilde(3) => "delete",
            SpecialKey::Tilde(4 | 8) => "end",
            SpecialKey::Tilde(5) => "pgup",
            SpecialKey::Tilde(6) => "pgdown",
            SpecialKey::Tilde(11) => "F1",
            SpecialKey::Tilde(_) => "",
        }
    }
}

/// One decoded unit of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Character {
    /// End of input
    Eof,

    /// Printable (or DEL/NUL) codepoint
    Literal {
        /// Decoded value
        codepoint: char,
        /// UTF-8 bytes as received
        glyph: Glyph,
        /// Modifiers
        mode: Modifiers,
    },

    /// Control code or function key
    Special {
        /// Which key
        key: SpecialKey,
        /// Modifiers
        mode: Modifiers,
    },

    /// Signal delivered by the transport adapter
    Signal(i32),

    /// Malformed input
    Error(DecodeError),
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Character::Eof => write!(f, "<EOF>"),
            Character::Signal(n) => write!(f, "<SIGNAL {n}>"),
            Character::Error(e) => write!(f, "<ERROR {e}>"),
            Character::Special { key, mode } => {
                if let SpecialKey::Control(c) = key {
                    write!(f, "<SPECIAL {c}> <^{} ({c})>", (c + b'A' - 1) as char)?;
                } else {
                    write!(f, "<SPECIAL {key:?}>")?;
                }
                write!(f, " {}", key.name())?;
                write_mode(f, *mode)
            }
            Character::Literal {
                codepoint,
                glyph,
                mode,
            } => {
                let n = u32::from(*codepoint);
                let text = core::str::from_utf8(glyph.as_bytes()).unwrap_or("?");
                if n < 32 {
                    write!(f, "<LITERAL #{n}>")?;
                } else if n > 0xFF {
                    write!(f, "<LITERAL {text} U{n:X}>")?;
                } else {
                    write!(f, "<LITERAL {text} #{n}>")?;
                }
                write_mode(f, *mode)
            }
        }
    }
}

fn write_mode(f: &mut fmt::Formatter<'_>, mode: Modifiers) -> fmt::Result {
    const NAMES: [(Modifiers, &str); 4] = [
        (Modifiers::SHIFT, "shift"),
        (Modifiers::ALT, "alt"),
        (Modifiers::CTRL, "ctrl"),
        (Modifiers::CMD, "cmd"),
    ];

    if mode.is_empty() {
        return Ok(());
    }

    write!(f, ", mode={} ", mode.bits())?;
    for (flag, name) in NAMES {
        if mode.contains(flag) {
            write!(f, "({name}) ")?;
        }
    }
    Ok(())
}

/// Decoder state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecoderState {
    /// Between characters
    Char,
    /// Inside a multi-byte UTF-8 sequence
    Utf8,
    /// Saw ESC
    Esc,
    /// Saw ESC ESC
    Esc2,
    /// Saw ESC O
    Ss3,
    /// Saw ESC [
    Csi,
}

/// Incremental terminal key decoder.
///
/// # Example
///
/// ```rust,ignore
/// use clink::shell::decoder::{Character, KeyDecoder, SpecialKey};
///
/// let mut decoder = KeyDecoder::new();
/// assert_eq!(decoder.decode(0x1b), None);
/// assert_eq!(decoder.decode(b'['), None);
/// assert!(matches!(
///     decoder.decode(b'A'),
///     Some(Character::Special { key: SpecialKey::Up, .. })
/// ));
/// ```
#[derive(Debug)]
pub struct KeyDecoder {
    state: DecoderState,
    mode: Modifiers,
    utf8: heapless::Vec<u8, 4>,
    utf8_len: usize,
    params: [u32; 3],
    index: usize,
}

impl KeyDecoder {
    /// Create a decoder between characters.
    pub fn new() -> Self {
        Self {
            state: DecoderState::Char,
            mode: Modifiers::empty(),
            utf8: heapless::Vec::new(),
            utf8_len: 0,
            params: [0; 3],
            index: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// True when no sequence is partially decoded.
    pub fn is_idle(&self) -> bool {
        self.state == DecoderState::Char
    }

    /// Decode one byte.
    ///
    /// Returns `None` while a sequence is incomplete.
    pub fn decode(&mut self, byte: u8) -> Option<Character> {
        match self.state {
            DecoderState::Char => self.decode_char(byte),
            DecoderState::Utf8 => self.decode_utf8(byte),
            DecoderState::Esc => self.decode_esc(byte),
            DecoderState::Esc2 => self.decode_esc2(byte),
            DecoderState::Ss3 => self.decode_ss3(byte),
            DecoderState::Csi => self.decode_csi(byte),
        }
    }

    /// Resolve a pending escape after the caller's timeout.
    ///
    /// A lone ESC becomes the ESC key, `ESC [` the literal `[` and `ESC O`
    /// the literal `O` with [`Modifiers::CMD`]. Partial UTF-8 keeps waiting.
    pub fn flush(&mut self) -> Option<Character> {
        match self.state {
            DecoderState::Esc | DecoderState::Esc2 => {
                self.special(SpecialKey::Control(ESC), Modifiers::empty())
            }
            DecoderState::Csi => self.literal('[', Modifiers::empty()),
            DecoderState::Ss3 => self.literal('O', Modifiers::CMD),
            DecoderState::Char | DecoderState::Utf8 => None,
        }
    }

    /// Drop any partial sequence.
    pub fn reset(&mut self) {
        self.state = DecoderState::Char;
        self.mode = Modifiers::empty();
        self.utf8.clear();
    }

    fn emit(&mut self, c: Character) -> Option<Character> {
        self.reset();
        Some(c)
    }

    fn literal(&mut self, c: char, mode: Modifiers) -> Option<Character> {
        self.emit(Character::Literal {
            codepoint: c,
            glyph: Glyph::from_char(c),
            mode,
        })
    }

    fn special(&mut self, key: SpecialKey, mode: Modifiers) -> Option<Character> {
        self.emit(Character::Special { key, mode })
    }

    fn error(&mut self, e: DecodeError) -> Option<Character> {
        self.emit(Character::Error(e))
    }

    // ========================================
    // Characters and UTF-8
    // ========================================

    fn decode_char(&mut self, byte: u8) -> Option<Character> {
        let len = match sequence_len(byte) {
            Ok(len) => len,
            Err(e) => return self.error(e),
        };

        if len > 1 {
            self.utf8.clear();
            let _ = self.utf8.push(byte);
            self.utf8_len = len;
            self.state = DecoderState::Utf8;
            return None;
        }

        match byte {
            ESC => {
                self.state = DecoderState::Esc;
                None
            }
            1..=31 => self.special(SpecialKey::Control(byte), self.mode),
            _ => self.literal(byte as char, self.mode),
        }
    }

    fn decode_utf8(&mut self, byte: u8) -> Option<Character> {
        if byte & 0xC0 != 0x80 {
            return self.error(DecodeError::InvalidFollowByte);
        }

        let _ = self.utf8.push(byte);
        if self.utf8.len() < self.utf8_len {
            return None;
        }

        match char::from_u32(assemble(&self.utf8)) {
            Some(codepoint) => {
                let glyph = Glyph::from_slice(&self.utf8);
                let mode = self.mode;
                self.emit(Character::Literal {
                    codepoint,
                    glyph,
                    mode,
                })
            }
            None => self.error(DecodeError::InvalidCodepoint),
        }
    }

    // ========================================
    // Escape sequences
    // ========================================

    fn decode_esc(&mut self, byte: u8) -> Option<Character> {
        match byte {
            b'[' => {
                self.params = [0; 3];
                self.index = 0;
                self.state = DecoderState::Csi;
                None
            }
            b'O' => {
                self.state = DecoderState::Ss3;
                None
            }
            ESC => {
                self.state = DecoderState::Esc2;
                None
            }
            _ => {
                self.mode = Modifiers::CMD;
                self.decode_char(byte)
            }
        }
    }

    fn decode_esc2(&mut self, byte: u8) -> Option<Character> {
        match byte {
            // held down
            ESC => self.special(SpecialKey::Control(ESC), Modifiers::empty()),
            _ => {
                self.mode = Modifiers::CMD;
                self.decode_char(byte)
            }
        }
    }

    fn decode_ss3(&mut self, byte: u8) -> Option<Character> {
        let key = match byte {
            b'P'..=b'S' => SpecialKey::Function(byte - b'P' + 1),
            _ => match cursor_key(byte) {
                Some(key) => key,
                None => return self.error(DecodeError::UnrecognisedCsi),
            },
        };
        self.special(key, Modifiers::empty())
    }

    fn decode_csi(&mut self, byte: u8) -> Option<Character> {
        match byte {
            b'0'..=b'9' => {
                let p = &mut self.params[self.index];
                *p = p.saturating_mul(10).saturating_add(u32::from(byte - b'0'));
                None
            }
            // held down
            ESC => self.literal('[', Modifiers::empty()),
            b'[' => self.special(SpecialKey::Control(ESC), Modifiers::empty()),
            b';' => {
                self.index += 1;
                if self.index >= self.params.len() {
                    return self.error(DecodeError::CsiTooManyParameters);
                }
                None
            }
            b'~' => {
                if self.index > 1 {
                    return self.error(DecodeError::TildeTooManyArguments);
                }
                let mode = self.csi_modifiers();
                self.special(SpecialKey::Tilde(self.params[0]), mode)
            }
            _ => match cursor_key(byte) {
                Some(key) => {
                    let mode = self.csi_modifiers();
                    self.special(key, mode)
                }
                None => self.error(DecodeError::UnrecognisedCsi),
            },
        }
    }

    fn csi_modifiers(&self) -> Modifiers {
        if self.index == 0 {
            return Modifiers::empty();
        }
        let bits = self.params[1].saturating_sub(1).min(u32::from(u8::MAX));
        Modifiers::from_bits_truncate(bits as u8)
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn cursor_key(byte: u8) -> Option<SpecialKey> {
    Some(match byte {
        b'A' => SpecialKey::Up,
        b'B' => SpecialKey::Down,
        b'C' => SpecialKey::Right,
        b'D' => SpecialKey::Left,
        b'E' => SpecialKey::Begin,
        b'F' => SpecialKey::End,
        b'H' => SpecialKey::Home,
        _ => return None,
    })
}

/// Length of the UTF-8 sequence introduced by `byte`.
fn sequence_len(byte: u8) -> Result<usize, DecodeError> {
    match byte {
        0x00..=0x7F => Ok(1),
        0x80..=0xBF => Err(DecodeError::StrayFollowByte),
        0xC0..=0xDF => Ok(2),
        0xE0..=0xEF => Ok(3),
        0xF0..=0xF7 => Ok(4),
        _ => Err(DecodeError::InvalidFirstByte),
    }
}

/// Combine a complete sequence into its scalar value.
fn assemble(bytes: &[u8]) -> u32 {
    let lead_mask = match bytes.len() {
        2 => 0x1F,
        3 => 0x0F,
        _ => 0x07,
    };

    bytes[1..]
        .iter()
        .fold(u32::from(bytes[0] & lead_mask), |cp, b| {
            (cp << 6) | u32::from(b & 0x3F)
        })
}
