//! ECMA-48 terminal layer.
//!
//! Decodes keys with [`KeyDecoder`] and maps them onto [`UiEvent`]s. On the
//! way out it renders the editing operations with the peer's terminal
//! capabilities. Terminals without save/restore get a simulation: after
//! `Save` this layer counts the characters written and `Restore` rubs out
//! that many.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use log::{trace, warn};

use super::{Decoded, Layer, Output, Sent};
use crate::error::Error;
use crate::shell::decoder::{Character, KeyDecoder, Modifiers, SpecialKey};
use crate::shell::event::UiEvent;
use crate::term::TermCaps;

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;
const BS: u8 = 0x08;
const TAB: u8 = 0x09;

/// ECMA-48 layer.
#[derive(Debug, Default)]
pub struct Ecma48Layer {
    decoder: KeyDecoder,

    /// Previous character was CR, so a following LF or NUL is dropped
    last_cr: bool,

    /// Characters written since a simulated `Save`
    saved: Option<usize>,
}

impl Ecma48Layer {
    /// Create the layer.
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&mut self, c: Character, up: &mut Decoded) -> Result<(), Error> {
        let after_cr = core::mem::replace(&mut self.last_cr, false);

        let event = match c {
            Character::Literal { codepoint, glyph, mode } => match (codepoint, mode) {
                ('\x7f', m) if m.is_empty() => Some(UiEvent::Backspace),
                ('\x7f', m) if m.contains(Modifiers::CMD) => Some(UiEvent::DeleteWord),
                ('\0', _) => None,
                (_, m) if m.is_empty() => Some(UiEvent::Codepoint(glyph)),
                _ => None,
            },

            Character::Special { key: SpecialKey::Control(code), mode } if mode.is_empty() => {
                match code {
                    CR => {
                        self.last_cr = true;
                        Some(UiEvent::byte(b'\n'))
                    }
                    LF if after_cr => None,
                    LF => Some(UiEvent::byte(b'\n')),
                    BS => Some(UiEvent::Backspace),
                    TAB => Some(UiEvent::byte(b'\t')),
                    0x01 => Some(UiEvent::CursorSol),
                    0x02 => Some(UiEvent::CursorLeft),
                    0x03 => Some(UiEvent::Cancel),
                    0x04 => Some(UiEvent::Delete),
                    0x05 => Some(UiEvent::CursorEol),
                    0x06 => Some(UiEvent::CursorRight),
                    0x0b => Some(UiEvent::DeleteToEol),
                    0x0e => Some(UiEvent::HistNext),
                    0x10 => Some(UiEvent::HistPrev),
                    0x15 => Some(UiEvent::DeleteLine),
                    0x17 => Some(UiEvent::DeleteWord),
                    _ => None,
                }
            }

            Character::Special { key, mode } => {
                let word = mode.intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::CMD);
                match key {
                    SpecialKey::Up => Some(UiEvent::HistPrev),
                    SpecialKey::Down => Some(UiEvent::HistNext),
                    SpecialKey::Left if word => Some(UiEvent::CursorLeftWord),
                    SpecialKey::Left => Some(UiEvent::CursorLeft),
                    SpecialKey::Right if word => Some(UiEvent::CursorRightWord),
                    SpecialKey::Right => Some(UiEvent::CursorRight),
                    SpecialKey::Home => Some(UiEvent::CursorSol),
                    SpecialKey::End => Some(UiEvent::CursorEol),
                    SpecialKey::Function(1) => Some(UiEvent::Help),
                    SpecialKey::Tilde(1 | 7) => Some(UiEvent::CursorSol),
                    SpecialKey::Tilde(4 | 8) => Some(UiEvent::CursorEol),
                    SpecialKey::Tilde(3) => Some(UiEvent::Delete),
                    SpecialKey::Tilde(11) => Some(UiEvent::Help),
                    _ => None,
                }
            }

            Character::Error(e) if e.is_sequence_error() => {
                warn!("ecma48: skipping sequence: {}", e);
                None
            }
            Character::Error(e) => return Err(e.into()),

            Character::Eof | Character::Signal(_) => None,
        };

        match event {
            Some(event) => up.event(event),
            None => trace!("ecma48: no event"),
        }
        Ok(())
    }
}

impl Layer for Ecma48Layer {
    fn name(&self) -> &'static str {
        "ecma48"
    }

    fn read(&mut self, data: &[u8], up: &mut Decoded) -> Result<usize, Error> {
        for &b in data {
            if let Some(c) = self.decoder.decode(b) {
                self.map(c, up)?;
            }
        }
        Ok(data.len())
    }

    fn encode<'b>(&mut self, bytes: &'b [u8]) -> Cow<'b, [u8]> {
        if let Some(n) = &mut self.saved {
            *n += bytes.iter().filter(|&&b| b & 0xc0 != 0x80).count();
        }
        Cow::Borrowed(bytes)
    }

    fn send(&mut self, op: Output, caps: &TermCaps) -> Result<Sent, Error> {
        let mut s = String::new();

        match op {
            Output::BackspaceAndDelete => {
                if let Some(n) = &mut self.saved {
                    *n = n.saturating_sub(1);
                }
                rub_out(&mut s, caps);
            }

            Output::Save => match caps.sc {
                Some(sc) if caps.can_save() => s.push_str(sc),
                _ => {
                    self.saved = Some(0);
                    return Ok(Sent::Nothing);
                }
            },

            Output::RestoreAndDeleteToEol => match (caps.rc, self.saved.take()) {
                (Some(rc), _) if caps.can_save() => {
                    s.push_str(rc);
                    s.push_str(caps.el.unwrap_or(""));
                }
                (_, Some(n)) => {
                    for _ in 0..n {
                        rub_out(&mut s, caps);
                    }
                }
                (_, None) => return Ok(Sent::Pass),
            },
        }

        Ok(Sent::Bytes(Vec::from(s)))
    }
}

fn rub_out(s: &mut String, caps: &TermCaps) {
    s.push_str(caps.cub1);
    match caps.dch1 {
        Some(dch1) => s.push_str(dch1),
        None => {
            s.push(' ');
            s.push_str(caps.cub1);
        }
    }
}
