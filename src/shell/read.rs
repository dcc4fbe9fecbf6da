//! Session read state machine.
//!
//! ```text
//!   New ──(first event)──> Command ──(line)──> dispatch
//!    ^                                            │
//!    │                      ┌─────────────────────┤ fields pending
//!    │                      v                     │
//!    │                    Field ──(line)──> next field ... callback
//!    └────────────────────────────────────────────┘
//! ```
//!
//! A completed command line is lexed and walked through the trie one word
//! at a time. If the command declares fields they are prompted for, lowest
//! bit first, before the callback runs with the remaining words as
//! arguments. Anything wrong with what the user typed is reported to the
//! peer and the machine returns to `New`.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, trace};

use super::editor::{EditFlags, Edited};
use super::event::UiEvent;
use super::lexer::{Lexer, TokenKind};
use super::Peer;
use crate::error::Error;
use crate::io::Transport;
use crate::tree::{CommandEntry, Node};

/// Where a session is in reading a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadState {
    /// Nothing typed since the last prompt
    New,

    /// Typing a command line
    Command,

    /// Typing the value of a field
    Field,
}

/// Per-command transient state.
pub(crate) struct ReadCtx<'t, T> {
    pub(crate) state: ReadState,

    /// Command being collected
    entry: Option<&'t CommandEntry<T>>,

    /// Fields still to prompt for
    fields: u32,

    values: Vec<(u32, String)>,
    argv: Vec<String>,

    /// Set by `Peer::again` during a callback
    pub(crate) again: bool,
}

impl<T> ReadCtx<'_, T> {
    pub(crate) fn new() -> Self {
        Self {
            state: ReadState::New,
            entry: None,
            fields: 0,
            values: Vec::new(),
            argv: Vec::new(),
            again: false,
        }
    }

    pub(crate) fn value(&self, id: u32) -> Option<&str> {
        self.values
            .iter()
            .find(|(field, _)| *field == id)
            .map(|(_, value)| value.as_str())
    }

    fn reset(&mut self) {
        self.entry = None;
        self.fields = 0;
        self.values.clear();
        self.argv.clear();
        self.again = false;
    }

    /// Field currently being prompted for.
    fn current(&self) -> u32 {
        self.fields & self.fields.wrapping_neg()
    }
}

/// Why a command line was not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reject {
    /// Unknown, ambiguous or invisible command
    NotFound,

    /// Lexer error or pipe, with the offending source text
    Syntax(String),

    /// More arguments than the tree's limit
    TooManyArguments,
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reject::NotFound => f.write_str("command not found"),
            Reject::Syntax(at) => write!(f, "syntax error at: {}", at),
            Reject::TooManyArguments => f.write_str("too many arguments"),
        }
    }
}

/// A command line resolved to its command and arguments.
pub(crate) type Parsed<'n, T> = (&'n CommandEntry<T>, Vec<String>);

/// Resolve `line` against the trie rooted at `root`.
///
/// `Ok(None)` means the line held no tokens at all.
pub(crate) fn parse_line<'n, T>(
    root: &'n Node<T>,
    line: &[u8],
    visible: &dyn Fn(u32) -> bool,
    max_args: usize,
) -> Result<Option<Parsed<'n, T>>, Reject> {
    let syntax = |source: &[u8]| Reject::Syntax(String::from_utf8_lossy(source).into_owned());

    let mut lexer = Lexer::new(line);
    let mut node = root;

    for tok in lexer.by_ref() {
        match tok.kind {
            TokenKind::Word => {}
            TokenKind::Error | TokenKind::Pipe => return Err(syntax(tok.source)),
            TokenKind::String => return Err(Reject::NotFound),
        }

        node = node.walk(&tok.text).ok_or(Reject::NotFound)?;
        node = node.run(visible).ok_or(Reject::NotFound)?;

        if node.command().is_some() {
            break;
        }
    }

    if core::ptr::eq(node, root) {
        return Ok(None);
    }

    let entry = node.command().ok_or(Reject::NotFound)?;
    if !visible(entry.modes) {
        return Err(Reject::NotFound);
    }

    let mut argv = Vec::new();
    for tok in lexer {
        match tok.kind {
            TokenKind::Word | TokenKind::String => {
                argv.push(String::from_utf8_lossy(&tok.text).into_owned());
            }
            TokenKind::Error | TokenKind::Pipe => return Err(syntax(tok.source)),
        }
    }

    if argv.len() > max_args {
        return Err(Reject::TooManyArguments);
    }

    Ok(Some((entry, argv)))
}

impl<T: Transport> Peer<'_, T> {
    /// Editing permitted in the current state.
    fn edit_flags(&self) -> EditFlags {
        match self.read.state {
            ReadState::New | ReadState::Command => EditFlags::all(),
            ReadState::Field => match self.tree.field(self.read.current()) {
                Some(field) if !field.echo => EditFlags::empty(),
                _ => EditFlags::ECHO,
            },
        }
    }

    /// Handle one user action.
    pub(crate) fn getc(&mut self, event: UiEvent) -> Result<(), Error> {
        trace!("{:?}: {:?}", self.read.state, event);

        if event == UiEvent::Cancel {
            return self.cancel();
        }

        if self.read.state == ReadState::New {
            self.read.reset();
            self.read.state = ReadState::Command;
        }

        let flags = self.edit_flags();
        if self.edit_push(event, flags)? == Edited::Pending {
            return Ok(());
        }

        self.print("\n")?;
        match self.read.state {
            ReadState::Field => self.field_line(),
            _ => self.command_line(),
        }
    }

    fn cancel(&mut self) -> Result<(), Error> {
        self.editor.clear();
        self.read.reset();
        self.print("^C\n")?;
        self.prompt_new()
    }

    /// Return to `New` and print the prompt.
    pub(crate) fn prompt_new(&mut self) -> Result<(), Error> {
        self.read.state = ReadState::New;
        let tree = self.tree;
        let mode = self.mode;
        (tree.callbacks().print_prompt)(self, mode)
    }

    fn command_line(&mut self) -> Result<(), Error> {
        let Some(line) = self.editor.release() else {
            return self.prompt_new();
        };

        let tree = self.tree;
        let parsed = {
            let rule = tree.callbacks().visible;
            let mode = self.mode;
            let peer: &Self = self;
            let visible = |mask| rule(peer, mode, mask);
            parse_line(tree.root(), &line, &visible, tree.limits().max_args)
        };

        match parsed {
            Ok(Some((entry, argv))) => {
                debug!("command {:?}, {} args", entry.path, argv.len());
                self.read.entry = Some(entry);
                self.read.argv = argv;
                self.read.values.clear();
                self.read.fields = entry.fields;
                self.next_field()
            }
            Ok(None) => self.prompt_new(),
            Err(reject) => {
                trace!("rejected: {}", reject);
                self.printf(format_args!("{}\n", reject))?;
                self.prompt_new()
            }
        }
    }

    /// Prompt for the lowest pending field, or run the command when none
    /// remain.
    fn next_field(&mut self) -> Result<(), Error> {
        if self.read.fields == 0 {
            return self.invoke();
        }

        let id = self.read.current();
        let tree = self.tree;
        let field = tree.field(id).ok_or(Error::UnknownField(id))?;

        self.read.state = ReadState::Field;
        self.printf(format_args!("{}: ", field.name))?;
        Ok(())
    }

    fn field_line(&mut self) -> Result<(), Error> {
        let id = self.read.current();
        let value = self
            .editor
            .release()
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .unwrap_or_default();

        let tree = self.tree;
        let field = tree.field(id).ok_or(Error::UnknownField(id))?;

        if let Some(validate) = field.validate {
            if !validate(self, id, &value) {
                debug!("field {:?} rejected", field.name);
                if self.closing {
                    self.read.reset();
                    self.read.state = ReadState::New;
                    return Ok(());
                }
                self.printf(format_args!("{}: ", field.name))?;
                return Ok(());
            }
        }

        self.read.values.retain(|(field, _)| *field != id);
        self.read.values.push((id, value));
        self.read.fields &= self.read.fields - 1;
        self.next_field()
    }

    fn invoke(&mut self) -> Result<(), Error> {
        let Some(entry) = self.read.entry else {
            return self.prompt_new();
        };

        let argv = core::mem::take(&mut self.read.argv);
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        let mode = self.mode;
        self.read.again = false;

        trace!("invoking {:?}", entry.path);
        (entry.callback)(self, entry.path, mode, &args);
        drop(args);

        let again = core::mem::take(&mut self.read.again);
        if again && entry.fields != 0 && !self.closing {
            debug!("command {:?} again", entry.path);
            self.read.argv = argv;
            self.read.fields = entry.fields;
            return self.next_field();
        }

        self.read.reset();
        if self.closing {
            self.read.state = ReadState::New;
            return Ok(());
        }
        self.prompt_new()
    }
}
