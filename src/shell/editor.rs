//! Line editor.
//!
//! [`Editor`] is the buffer alone; it knows nothing about terminals.
//! [`Peer::edit_push`] applies one [`UiEvent`] to it, echoing and erasing
//! through the peer's layer chain as the [`EditFlags`] allow.

use alloc::vec::Vec;

use bitflags::bitflags;
use log::{trace, warn};

use super::event::{Glyph, UiEvent};
use super::lexer::{is_space, Lexer, TokenKind};
use super::Peer;
use crate::config::Limits;
use crate::error::Error;
use crate::io::{Output, Transport};
use crate::tree::Node;

bitflags! {
    /// What the editor may do for the current input.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct EditFlags: u8 {
        /// Echo typed characters and erasures
        const ECHO = 1 << 0;
        /// `?` shows context help from the command tree
        const TRIE = 1 << 1;
        /// History keys apply
        const HIST = 1 << 2;
    }
}

/// Outcome of one edit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Edited {
    /// The line is still being typed
    Pending,

    /// Enter was pressed; the line is ready for release
    Line,
}

/// Edit buffer.
#[derive(Debug, Clone)]
pub struct Editor {
    buf: Vec<u8>,
    block: usize,
    limit: usize,
}

impl Editor {
    /// Create an empty editor sized by `limits`.
    pub fn new(limits: &Limits) -> Self {
        Self {
            buf: Vec::new(),
            block: limits.line_block,
            limit: limits.max_line,
        }
    }

    /// Append encoded bytes. Returns false, leaving the buffer untouched,
    /// if they would not fit.
    pub fn push(&mut self, bytes: &[u8]) -> bool {
        if self.buf.len() + bytes.len() > self.limit {
            return false;
        }
        if self.buf.capacity() == 0 {
            self.buf.reserve(self.block);
        }
        self.buf.extend_from_slice(bytes);
        true
    }

    /// Remove the last codepoint. Returns false on an empty buffer.
    pub fn backspace(&mut self) -> bool {
        let len = self.buf.len();
        if len == 0 {
            return false;
        }

        let mut start = len - 1;
        while start > 0 && len - start < 4 && is_continuation(self.buf[start]) {
            start -= 1;
        }
        if start != len - 1 && self.buf[start] < 0xc0 {
            start = len - 1;
        }

        self.buf.truncate(start);
        true
    }

    /// Remove the last word, returning how many codepoints went.
    ///
    /// Text up to the end of the next-to-last token stays, plus the
    /// single separator after it. With fewer than two tokens the whole
    /// line goes.
    pub fn delete_word(&mut self) -> usize {
        let mut ends = [0usize; 2];
        let mut count = 0;
        for tok in Lexer::new(&self.buf) {
            ends = [ends[1], tok.span.end];
            count += 1;
        }

        let keep = if count < 2 {
            0
        } else if self.buf.get(ends[0]).is_some_and(|&b| is_space(b)) {
            ends[0] + 1
        } else {
            ends[0]
        };

        let removed = glyphs(&self.buf[keep..]);
        self.buf.truncate(keep);
        removed
    }

    /// Empty the buffer, returning how many codepoints went.
    pub fn clear(&mut self) -> usize {
        let removed = glyphs(&self.buf);
        self.buf.clear();
        removed
    }

    /// Take the line, leaving the editor empty. `None` if nothing was typed.
    pub fn release(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            return None;
        }
        Some(core::mem::take(&mut self.buf))
    }

    /// Current contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

fn is_continuation(b: u8) -> bool {
    b & 0xc0 == 0x80
}

fn glyphs(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| !is_continuation(b)).count()
}

/// Descend `root` over the complete words of `line`, taking the space edge
/// after each. Stops at the first token that is not a word or does not
/// match.
pub(crate) fn walk_words<'n, T>(root: &'n Node<T>, line: &[u8]) -> &'n Node<T> {
    let mut node = root;
    for tok in Lexer::new(line) {
        if tok.kind != TokenKind::Word {
            break;
        }
        let Some(next) = node.walk(tok.source) else {
            break;
        };
        node = next;
        let Some(next) = node.walk(b" ") else {
            break;
        };
        node = next;
    }
    node
}

// ============================================================================
// Peer integration
// ============================================================================

impl<T: Transport> Peer<'_, T> {
    /// Apply one event to the edit buffer.
    pub(crate) fn edit_push(&mut self, event: UiEvent, flags: EditFlags) -> Result<Edited, Error> {
        match event {
            UiEvent::Codepoint(glyph) => return self.edit_codepoint(glyph, flags),

            UiEvent::Help if flags.contains(EditFlags::TRIE) => self.context_help()?,

            UiEvent::Backspace => {
                if self.editor.backspace() {
                    self.rub_out(1, flags)?;
                }
            }

            UiEvent::DeleteWord => {
                let n = self.editor.delete_word();
                self.rub_out(n, flags)?;
            }

            UiEvent::DeleteLine => {
                let n = self.editor.clear();
                self.rub_out(n, flags)?;
            }

            other => trace!("edit: {:?} ignored", other),
        }

        Ok(Edited::Pending)
    }

    fn edit_codepoint(&mut self, glyph: Glyph, flags: EditFlags) -> Result<Edited, Error> {
        match glyph.as_bytes() {
            b"\n" => return Ok(Edited::Line),
            b"\0" | b"\r" | b"\x1b" | b"\t" => {}
            b"?" if flags.contains(EditFlags::TRIE) => self.context_help()?,
            bytes => {
                if !self.editor.push(bytes) {
                    warn!("edit: line full at {} bytes", self.editor.len());
                    self.write_bytes(b"\x07")?;
                } else if flags.contains(EditFlags::ECHO) {
                    self.write_bytes(bytes)?;
                }
            }
        }
        Ok(Edited::Pending)
    }

    fn rub_out(&mut self, n: usize, flags: EditFlags) -> Result<(), Error> {
        if !flags.contains(EditFlags::ECHO) {
            return Ok(());
        }
        for _ in 0..n {
            self.send(Output::BackspaceAndDelete)?;
        }
        Ok(())
    }

    /// Print `?`, the commands reachable from what has been typed, then
    /// the prompt and the line again.
    fn context_help(&mut self) -> Result<(), Error> {
        self.print("?\n")?;

        let tree = self.tree;
        let node = walk_words(tree.root(), self.editor.as_bytes());
        self.help_from(node, self.mode)?;

        let mode = self.mode;
        (tree.callbacks().print_prompt)(self, mode)?;
        if !self.editor.is_empty() {
            let line = self.editor.as_bytes().to_vec();
            self.write_bytes(&line)?;
        }
        Ok(())
    }
}
