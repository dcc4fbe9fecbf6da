//! Command tree: descriptors, callbacks and the shared trie.
//!
//! Applications describe their commands and fields as tables of
//! [`CommandSpec`] and [`FieldSpec`], usually `static`. [`Tree::new`] checks
//! the tables and builds the trie once; the tree is then shared read-only by
//! every [`Peer`](crate::shell::Peer).
//!
//! `T` is the per-peer application value handed to
//! [`Peer::accept`](crate::shell::Peer::accept); every callback receives the
//! peer and reaches it through [`Peer::opaque`](crate::shell::Peer::opaque).

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use log::debug;

use crate::config::{DefaultConfig, Limits, ShellConfig};
use crate::error::Error;
use crate::shell::Peer;
use crate::term::{self, Resolver};

// Sub-modules
pub mod trie;

pub use trie::{CommandEntry, Node, Usage};

/// Command callback: `(peer, path, mode, argv)`.
pub type CommandFn<T> = fn(&mut Peer<'_, T>, &str, u32, &[&str]);

/// Field validator: `(peer, field id, value)`. Returning false re-prompts.
pub type ValidateFn<T> = fn(&mut Peer<'_, T>, u32, &str) -> bool;

/// Prompt printer: `(peer, mode)`.
pub type PromptFn<T> = fn(&mut Peer<'_, T>, u32) -> Result<(), Error>;

/// Visibility predicate: `(peer, mode, command modes)`.
pub type VisibleFn<T> = fn(&Peer<'_, T>, u32, u32) -> bool;

/// Message of the day printer, run once when a session starts.
pub type MotdFn<T> = fn(&mut Peer<'_, T>) -> Result<(), Error>;

/// Terminal type of last resort for a peer (e.g. from `$TERM`).
pub type TtypeFn<T> = fn(&Peer<'_, T>) -> Option<String>;

/// Default visibility rule.
///
/// Mode 0 sees only commands with an empty mask; any other mode sees
/// commands whose mask shares a bit with it.
pub fn visible(mode: u32, mask: u32) -> bool {
    if mode == 0 {
        return mask == 0;
    }
    mask & mode != 0
}

fn default_visible<T>(_peer: &Peer<'_, T>, mode: u32, mask: u32) -> bool {
    visible(mode, mask)
}

/// Enum of single-bit flags, usually derived with `#[derive(Flag)]`.
///
/// Modes and field ids are plain `u32` masks throughout the crate; this
/// trait converts between them and an application enum.
pub trait Flag: Copy + Sized + 'static {
    /// Bit of this variant
    fn bit(self) -> u32;

    /// Variant owning exactly `bit`
    fn from_bit(bit: u32) -> Option<Self>;

    /// Variant name
    fn as_str(&self) -> &'static str;

    /// Variant by name
    fn from_str(s: &str) -> Option<Self>;
}

/// Static description of one command.
///
/// Several specs may share a `path` to give different usage text per mode;
/// they must then have disjoint `modes` and identical `fields` and
/// `callback`.
pub struct CommandSpec<T> {
    /// Space-separated command words
    pub path: &'static str,

    /// Modes in which the command is visible
    pub modes: u32,

    /// Fields prompted for, lowest bit first, before the callback runs
    pub fields: u32,

    /// Callback invoked with the remaining words as arguments
    pub callback: CommandFn<T>,

    /// Text shown by help
    pub usage: Option<&'static str>,
}

impl<T> CommandSpec<T> {
    /// Create a spec without usage text.
    pub const fn new(path: &'static str, modes: u32, fields: u32, callback: CommandFn<T>) -> Self {
        Self {
            path,
            modes,
            fields,
            callback,
            usage: None,
        }
    }

    /// Attach usage text.
    pub const fn with_usage(mut self, usage: &'static str) -> Self {
        self.usage = Some(usage);
        self
    }
}

impl<T> fmt::Debug for CommandSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("path", &self.path)
            .field("modes", &format_args!("{:#x}", self.modes))
            .field("fields", &format_args!("{:#x}", self.fields))
            .field("usage", &self.usage)
            .finish()
    }
}

/// Static description of a prompted field.
pub struct FieldSpec<T> {
    /// Single-bit identifier
    pub id: u32,

    /// Prompt text, printed as `"<name>: "`
    pub name: &'static str,

    /// Echo typed characters (false for passwords)
    pub echo: bool,

    /// Validator run on the collected value
    pub validate: Option<ValidateFn<T>>,
}

impl<T> FieldSpec<T> {
    /// Create an echoing field without validation.
    pub const fn new(id: u32, name: &'static str) -> Self {
        Self {
            id,
            name,
            echo: true,
            validate: None,
        }
    }

    /// Suppress echo.
    pub const fn hidden(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Attach a validator.
    pub const fn with_validate(mut self, validate: ValidateFn<T>) -> Self {
        self.validate = Some(validate);
        self
    }
}

impl<T> Clone for FieldSpec<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            echo: self.echo,
            validate: self.validate,
        }
    }
}

impl<T> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("id", &format_args!("{:#x}", self.id))
            .field("name", &self.name)
            .field("echo", &self.echo)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Application hooks shared by all peers of a tree.
pub struct Callbacks<T> {
    pub(crate) print_prompt: PromptFn<T>,
    pub(crate) visible: VisibleFn<T>,
    pub(crate) motd: Option<MotdFn<T>>,
    pub(crate) ttype: Option<TtypeFn<T>>,
    pub(crate) capabilities: Resolver,
}

impl<T> Callbacks<T> {
    /// Callbacks with the default visibility rule and built-in terminal
    /// capability table.
    pub const fn new(print_prompt: PromptFn<T>) -> Self {
        Self {
            print_prompt,
            visible: default_visible::<T>,
            motd: None,
            ttype: None,
            capabilities: term::resolve,
        }
    }

    /// Replace the visibility rule.
    pub const fn with_visible(mut self, visible: VisibleFn<T>) -> Self {
        self.visible = visible;
        self
    }

    /// Print a message of the day when a session starts.
    pub const fn with_motd(mut self, motd: MotdFn<T>) -> Self {
        self.motd = Some(motd);
        self
    }

    /// Supply a terminal type when no layer negotiated one.
    pub const fn with_ttype(mut self, ttype: TtypeFn<T>) -> Self {
        self.ttype = Some(ttype);
        self
    }

    /// Replace the capability resolver.
    pub const fn with_capabilities(mut self, capabilities: Resolver) -> Self {
        self.capabilities = capabilities;
        self
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("motd", &self.motd.is_some())
            .field("ttype", &self.ttype.is_some())
            .finish_non_exhaustive()
    }
}

/// Command tree shared by all peers.
pub struct Tree<T> {
    root: Node<T>,
    commands: usize,
    fields: Vec<FieldSpec<T>>,
    callbacks: Callbacks<T>,
    limits: Limits,
}

impl<T> Tree<T> {
    /// Build a tree with [`DefaultConfig`] limits.
    pub fn new(
        commands: &[CommandSpec<T>],
        fields: &[FieldSpec<T>],
        callbacks: Callbacks<T>,
    ) -> Result<Self, Error> {
        Self::with_config::<DefaultConfig>(commands, fields, callbacks)
    }

    /// Build a tree with the limits of `C`.
    ///
    /// Fails if a field id is not a single bit, a command names an
    /// undefined field, or the command table breaks the trie's invariants.
    pub fn with_config<C: ShellConfig>(
        commands: &[CommandSpec<T>],
        fields: &[FieldSpec<T>],
        callbacks: Callbacks<T>,
    ) -> Result<Self, Error> {
        if let Some(field) = fields.iter().find(|f| f.id.count_ones() != 1) {
            return Err(Error::InvalidFieldId(field.id));
        }

        let mut root = Node::new();
        for spec in commands {
            let mut pending = spec.fields;
            while pending != 0 {
                let bit = pending & pending.wrapping_neg();
                if !fields.iter().any(|f| f.id == bit) {
                    return Err(Error::UnknownField(bit));
                }
                pending &= pending - 1;
            }

            root.insert(spec)?;
        }

        debug!(
            "tree built: {} commands, {} fields",
            commands.len(),
            fields.len()
        );

        Ok(Self {
            root,
            commands: commands.len(),
            fields: fields.to_vec(),
            callbacks,
            limits: Limits::of::<C>(),
        })
    }

    /// Trie root.
    pub fn root(&self) -> &Node<T> {
        &self.root
    }

    /// Field table as supplied.
    pub fn fields(&self) -> &[FieldSpec<T>] {
        &self.fields
    }

    /// Field spec by id.
    pub fn field(&self, id: u32) -> Option<&FieldSpec<T>> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Session limits.
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub(crate) fn callbacks(&self) -> &Callbacks<T> {
        &self.callbacks
    }
}

impl<T> fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("commands", &self.commands)
            .field("fields", &self.fields.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
