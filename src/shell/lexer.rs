//! Command line tokenizer.
//!
//! Splits a line into words, quoted strings and pipe tokens. Whitespace
//! separates tokens and is otherwise dropped. Single quotes are literal;
//! double quotes understand the escapes `\\ \" \n \r \t \v \f \e`.
//!
//! Every token keeps both its source span (for error reports and editing)
//! and its decoded text (for dispatch).

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::ops::Range;

/// Token classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word
    Word,

    /// Single- or double-quoted string
    String,

    /// The `|` character
    Pipe,

    /// Unterminated quote or unknown escape; always the last token.
    ///
    /// For an unknown escape the span ends after the backslash, so the
    /// offending character itself is not part of the source text.
    Error,
}

/// One lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Classification
    pub kind: TokenKind,

    /// Byte range of the token in the source line, quotes included
    pub span: Range<usize>,

    /// Source bytes covered by `span`
    pub source: &'a [u8],

    /// Decoded bytes: quotes removed and escapes expanded
    pub text: Cow<'a, [u8]>,
}

impl Token<'_> {
    /// True for tokens that carry a value (words and strings).
    pub fn is_value(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::String)
    }
}

/// Lazy tokenizer over one line.
///
/// The lexer is an iterator; cloning it or calling [`Lexer::resume`] with a
/// saved [`position`](Lexer::position) restarts tokenizing mid-line. After an
/// [`TokenKind::Error`] token the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    line: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Tokenize `line` from the start.
    pub fn new(line: &'a [u8]) -> Self {
        Self::resume(line, 0)
    }

    /// Tokenize `line` starting at byte `pos`.
    pub fn resume(line: &'a [u8], pos: usize) -> Self {
        Self {
            line,
            pos: pos.min(line.len()),
            done: false,
        }
    }

    /// Byte offset of the next unread input.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn token(&self, kind: TokenKind, span: Range<usize>, text: Cow<'a, [u8]>) -> Token<'a> {
        Token {
            kind,
            source: &self.line[span.clone()],
            span,
            text,
        }
    }

    fn error(&mut self, span: Range<usize>) -> Token<'a> {
        self.done = true;
        self.pos = span.end;
        let source = &self.line[span.clone()];
        self.token(TokenKind::Error, span, Cow::Borrowed(source))
    }

    fn word(&mut self, start: usize) -> Token<'a> {
        let len = self.line[start..]
            .iter()
            .position(|&b| is_space(b) || matches!(b, b'\'' | b'"' | b'|'))
            .unwrap_or(self.line.len() - start);
        self.pos = start + len;
        let text = &self.line[start..self.pos];
        self.token(TokenKind::Word, start..self.pos, Cow::Borrowed(text))
    }

    fn single_quoted(&mut self, start: usize) -> Token<'a> {
        match self.line[start + 1..].iter().position(|&b| b == b'\'') {
            Some(len) => {
                let end = start + 1 + len;
                self.pos = end + 1;
                let text = &self.line[start + 1..end];
                self.token(TokenKind::String, start..self.pos, Cow::Borrowed(text))
            }
            None => self.error(start..self.line.len()),
        }
    }

    fn double_quoted(&mut self, start: usize) -> Token<'a> {
        let mut decoded: Option<Vec<u8>> = None;
        let mut i = start + 1;

        while i < self.line.len() {
            match self.line[i] {
                b'"' => {
                    self.pos = i + 1;
                    let text = match decoded {
                        Some(v) => Cow::Owned(v),
                        None => Cow::Borrowed(&self.line[start + 1..i]),
                    };
                    return self.token(TokenKind::String, start..self.pos, text);
                }
                b'\\' => {
                    // The error span ends with the backslash.
                    let Some(byte) = self.line.get(i + 1).copied().and_then(unescape) else {
                        return self.error(start..i + 1);
                    };
                    decoded
                        .get_or_insert_with(|| self.line[start + 1..i].to_vec())
                        .push(byte);
                    i += 2;
                }
                b => {
                    if let Some(v) = decoded.as_mut() {
                        v.push(b);
                    }
                    i += 1;
                }
            }
        }

        self.error(start..self.line.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.done {
            return None;
        }

        while self.pos < self.line.len() && is_space(self.line[self.pos]) {
            self.pos += 1;
        }

        let start = self.pos;
        let Some(&first) = self.line.get(start) else {
            self.done = true;
            return None;
        };

        Some(match first {
            b'|' => {
                self.pos = start + 1;
                let text = &self.line[start..self.pos];
                self.token(TokenKind::Pipe, start..self.pos, Cow::Borrowed(text))
            }
            b'\'' => self.single_quoted(start),
            b'"' => self.double_quoted(start),
            _ => self.word(start),
        })
    }
}

/// Whitespace as the C locale sees it.
pub fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

fn unescape(b: u8) -> Option<u8> {
    Some(match b {
        b'\\' => b'\\',
        b'"' => b'"',
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0b,
        b'f' => 0x0c,
        b'e' => 0x1b,
        _ => return None,
    })
}
