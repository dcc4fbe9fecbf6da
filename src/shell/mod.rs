//! Sessions.
//!
//! A [`Peer`] is one client of a [`Tree`]: its layer chain, edit buffer,
//! read state and the application's per-peer value. The application feeds
//! it raw bytes with [`Peer::read`]; everything else (echo, prompts, help,
//! field prompts, command callbacks) happens from there.
//!
//! ```rust,ignore
//! let mut peer = Peer::accept(&tree, IoMode::Telnet, conn)?;
//! loop {
//!     let n = socket.read(&mut buf)?;
//!     peer.read(&buf[..n])?;
//!     if peer.is_closing() {
//!         break;
//!     }
//! }
//! let conn = peer.close();
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use log::{debug, trace};

use crate::error::Error;
use crate::io::{Chain, Input, IoMode, Output, Transport};
use crate::term::TermCaps;
use crate::tree::{Flag, Node, Tree};

// Sub-modules
pub mod decoder;
pub mod editor;
pub mod event;
pub mod lexer;
pub mod read;

// Re-export key types
pub use decoder::{Character, KeyDecoder};
pub use editor::{EditFlags, Edited, Editor};
pub use event::{Glyph, UiEvent};
pub use read::ReadState;

use read::ReadCtx;

/// One session.
///
/// `'t` borrows the shared [`Tree`]; `T` is the application's per-peer
/// value, which must be a [`Transport`] for anything that produces output.
pub struct Peer<'t, T> {
    tree: &'t Tree<T>,
    io: IoMode,

    /// Current mode bit set
    mode: u32,

    /// Terminal type the session started with
    ttype: Option<String>,

    /// Capabilities resolved at start
    term: Option<TermCaps>,

    chain: Chain,
    read: ReadCtx<'t, T>,
    editor: Editor,
    opaque: T,

    /// Start-up has run; events are accepted
    started: bool,

    /// A callback asked for the session to end
    closing: bool,
}

// ============================================================================
// Debug implementation
// ============================================================================

impl<T> fmt::Debug for Peer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("io", &self.io)
            .field("mode", &format_args!("{:#x}", self.mode))
            .field("ttype", &self.ttype)
            .field("state", &self.read.state)
            .field("started", &self.started)
            .field("closing", &self.closing)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl<'t, T> Peer<'t, T> {
    /// Shared command tree.
    pub fn tree(&self) -> &'t Tree<T> {
        self.tree
    }

    /// Layer chain this peer runs.
    pub fn io_mode(&self) -> IoMode {
        self.io
    }

    /// Current mode.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Current mode as a flag enum; `None` unless exactly one known bit is set.
    pub fn mode_flag<M: Flag>(&self) -> Option<M> {
        M::from_bit(self.mode)
    }

    /// Change mode. Takes effect from the next prompt.
    pub fn set_mode(&mut self, mode: u32) {
        trace!("mode {:#x} -> {:#x}", self.mode, mode);
        self.mode = mode;
    }

    /// Value collected for field `id` in the current command round.
    pub fn field(&self, id: u32) -> Option<&str> {
        self.read.value(id)
    }

    /// Application value.
    pub fn opaque(&self) -> &T {
        &self.opaque
    }

    /// Application value, mutably.
    pub fn opaque_mut(&mut self) -> &mut T {
        &mut self.opaque
    }

    /// Replace the application value, returning the old one.
    pub fn set_opaque(&mut self, opaque: T) -> T {
        core::mem::replace(&mut self.opaque, opaque)
    }

    /// Terminal type the session started with, if any was learned.
    pub fn ttype(&self) -> Option<&str> {
        self.ttype.as_deref()
    }

    /// Terminal capabilities, once started.
    pub fn caps(&self) -> Option<&TermCaps> {
        self.term.as_ref()
    }

    /// Read state.
    pub fn state(&self) -> ReadState {
        self.read.state
    }

    /// True once start-up has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Called from a command callback: run the same command again,
    /// collecting its fields anew, once the callback returns.
    pub fn again(&mut self) {
        self.read.again = true;
    }

    /// Ask for the session to end. Input still buffered is discarded and
    /// no further prompt is printed; the application should then
    /// [`close`](Peer::close) the peer.
    pub fn request_close(&mut self) {
        debug!("close requested");
        self.closing = true;
    }

    /// True after [`request_close`](Peer::request_close).
    pub fn is_closing(&self) -> bool {
        self.closing
    }
}

// ============================================================================
// Session lifecycle and I/O
// ============================================================================

impl<'t, T: Transport> Peer<'t, T> {
    /// Create a peer without creating its layers.
    ///
    /// Nothing is written until [`ready`](Peer::ready), so the application
    /// can [`set_mode`](Peer::set_mode) first.
    pub fn new(tree: &'t Tree<T>, io: IoMode, opaque: T) -> Self {
        let limits = tree.limits();
        Self {
            tree,
            io,
            mode: 0,
            ttype: None,
            term: None,
            chain: Chain::new(io, limits),
            read: ReadCtx::new(),
            editor: Editor::new(limits),
            opaque,
            started: false,
            closing: false,
        }
    }

    /// Create the layer chain.
    ///
    /// For an immediate chain this runs start-up: terminal type,
    /// capabilities, message of the day and the first prompt. A Telnet
    /// chain only begins negotiating; start-up follows from a later
    /// [`read`](Peer::read).
    pub fn ready(&mut self) -> Result<(), Error> {
        let mut inputs = Vec::new();
        self.chain.create(&mut inputs)?;
        self.process(inputs)
    }

    /// [`new`](Peer::new) followed by [`ready`](Peer::ready).
    pub fn accept(tree: &'t Tree<T>, io: IoMode, opaque: T) -> Result<Self, Error> {
        debug!("accept: {:?}", io);
        let mut peer = Self::new(tree, io, opaque);
        if let Err(e) = peer.ready() {
            peer.chain.destroy();
            return Err(e);
        }
        Ok(peer)
    }

    /// End the session, returning the application value.
    pub fn close(mut self) -> T {
        self.chain.destroy();
        debug!("closed");
        self.opaque
    }

    /// Feed bytes received from the client.
    ///
    /// Returns the number of bytes consumed, which is all of them. An
    /// error is fatal to this session; the application should close it.
    /// Input decoded ahead of a decoding error is still acted on first, so
    /// a complete line before a bad byte runs its command.
    pub fn read(&mut self, data: &[u8]) -> Result<usize, Error> {
        let mut inputs = Vec::new();
        let read = self.chain.read(data, &mut inputs);
        self.process(inputs)?;
        read
    }

    fn process(&mut self, inputs: Vec<Input>) -> Result<(), Error> {
        for input in inputs {
            if self.closing {
                trace!("closing, discarding input");
                break;
            }
            match input {
                Input::Start => self.start()?,
                Input::Event(event) if self.started => self.getc(event)?,
                Input::Event(event) => trace!("not started, dropping {:?}", event),
                Input::Reply { below, bytes } => {
                    self.chain.reply(below, &bytes, &mut self.opaque)?
                }
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), Error> {
        let tree = self.tree;
        let callbacks = tree.callbacks();

        let ttype = match self.chain.ttype() {
            Some(name) => Some(String::from(name)),
            None => callbacks.ttype.and_then(|f| f(&*self)),
        };
        let name = ttype.as_deref().unwrap_or("unknown");
        let caps = (callbacks.capabilities)(name)
            .ok_or_else(|| Error::UnknownTerminal(String::from(name)))?;
        debug!("start: terminal {:?}, caps {:?}", name, caps);

        self.ttype = ttype;
        self.term = Some(caps);
        self.started = true;

        if let Some(motd) = callbacks.motd {
            motd(self)?;
        }
        self.prompt_new()
    }

    /// Print formatted output, returning the unencoded length.
    ///
    /// ```rust,ignore
    /// peer.printf(format_args!("{} users\n", count))?;
    /// ```
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<usize, Error> {
        match args.as_str() {
            Some(s) => self.print(s),
            None => self.print(&alloc::fmt::format(args)),
        }
    }

    /// Print a string, returning its length.
    pub fn print(&mut self, s: &str) -> Result<usize, Error> {
        self.write_bytes(s.as_bytes())?;
        Ok(s.len())
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.chain.write(bytes, &mut self.opaque)
    }

    /// Perform an editing operation with this terminal's capabilities.
    pub fn send(&mut self, op: Output) -> Result<(), Error> {
        let caps = self.term.unwrap_or(TermCaps::DUMB);
        self.chain.send(op, &caps, &mut self.opaque)
    }

    /// List every command visible in `mode` with its usage text.
    pub fn show_help(&mut self, mode: u32) -> Result<(), Error> {
        let tree = self.tree;
        self.help_from(tree.root(), mode)
    }

    pub(crate) fn help_from(&mut self, node: &Node<T>, mode: u32) -> Result<(), Error> {
        let rule = self.tree.callbacks().visible;

        let mut lines = Vec::new();
        {
            let peer: &Self = self;
            let visible = |mask| rule(peer, mode, mask);
            node.enumerate_visible(&visible, &mut |entry, usage| {
                lines.push((entry.path, usage.text));
            });
        }

        for (path, usage) in lines {
            match usage {
                Some(text) => self.printf(format_args!("  {:<18} - {}\n", path, text))?,
                None => self.printf(format_args!("  {:<18}\n", path))?,
            };
        }
        Ok(())
    }
}
