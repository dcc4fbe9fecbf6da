//! Byte-keyed prefix tree of command paths.
//!
//! Every byte of a command path is one edge, so `"show motd"` is nine
//! nodes deep and the space between words is an ordinary edge. Terminal
//! nodes carry a [`CommandEntry`] aggregating all specs sharing that path.
//!
//! Edges are kept in ascending byte order; all traversals visit children in
//! that order, which makes ambiguity resolution deterministic.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
use core::ptr;

use super::{CommandFn, CommandSpec};
use crate::error::Error;

/// One usage line of a command: the modes it applies to and its help text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Usage {
    /// Modes this usage was declared for
    pub modes: u32,
    /// Help text
    pub text: Option<&'static str>,
}

/// Aggregate of every [`CommandSpec`] inserted with the same path.
pub struct CommandEntry<T> {
    /// Space-joined command words
    pub path: &'static str,
    /// Union of the mode masks of all inserted specs
    pub modes: u32,
    /// Fields to collect before the callback runs
    pub fields: u32,
    /// Command callback
    pub callback: CommandFn<T>,
    usages: Vec<Usage>,
}

impl<T> CommandEntry<T> {
    fn new(spec: &CommandSpec<T>) -> Self {
        Self {
            path: spec.path,
            modes: 0,
            fields: spec.fields,
            callback: spec.callback,
            usages: Vec::new(),
        }
    }

    fn merge(&mut self, spec: &CommandSpec<T>) -> Result<(), Error> {
        let overlap = self.modes & spec.modes;
        let both_modeless =
            spec.modes == 0 && self.usages.iter().any(|usage| usage.modes == 0);
        if overlap != 0 || both_modeless {
            return Err(Error::OverlappingModes {
                path: spec.path,
                modes: overlap,
            });
        }

        if self.fields != spec.fields || !ptr::fn_addr_eq(self.callback, spec.callback) {
            return Err(Error::InconsistentCommand(spec.path));
        }

        self.modes |= spec.modes;
        self.usages.push(Usage {
            modes: spec.modes,
            text: spec.usage,
        });
        Ok(())
    }

    /// Usage lines in insertion order.
    pub fn usages(&self) -> &[Usage] {
        &self.usages
    }
}

impl<T> fmt::Debug for CommandEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("path", &self.path)
            .field("modes", &format_args!("{:#x}", self.modes))
            .field("fields", &format_args!("{:#x}", self.fields))
            .field("usages", &self.usages.len())
            .finish()
    }
}

/// Trie node.
pub struct Node<T> {
    edges: BTreeMap<u8, Node<T>>,
    command: Option<CommandEntry<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
            command: None,
        }
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("edges", &self.edges.len())
            .field("command", &self.command)
            .finish()
    }
}

impl<T> Node<T> {
    /// Empty root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Command terminating at this node, if any.
    pub fn command(&self) -> Option<&CommandEntry<T>> {
        self.command.as_ref()
    }

    /// Insert `spec` one edge per path byte.
    ///
    /// Specs sharing a path must have disjoint modes and identical fields
    /// and callback.
    pub fn insert(&mut self, spec: &CommandSpec<T>) -> Result<(), Error> {
        validate_path(spec.path)?;

        let mut node = self;
        for &b in spec.path.as_bytes() {
            node = node.edges.entry(b).or_default();
        }

        node.command
            .get_or_insert_with(|| CommandEntry::new(spec))
            .merge(spec)
    }

    /// Byte-exact descent. An empty `bytes` stays at `self`.
    pub fn walk(&self, bytes: &[u8]) -> Option<&Node<T>> {
        bytes
            .iter()
            .try_fold(self, |node, b| node.edges.get(b))
    }

    /// Depth-first search for the first visible command or `c` edge.
    ///
    /// While `prev` is set, visible commands are skipped until `prev` itself
    /// is passed, which clears it.
    fn next<'n>(
        &'n self,
        c: u8,
        visible: &dyn Fn(u32) -> bool,
        prev: &mut Option<&'n Node<T>>,
    ) -> Option<&'n Node<T>> {
        if let Some(entry) = &self.command {
            if visible(entry.modes) {
                match *prev {
                    None => return Some(self),
                    Some(p) if ptr::eq(p, self) => *prev = None,
                    Some(_) => {}
                }
            }
        }

        for (&b, child) in &self.edges {
            if b == c {
                return Some(child);
            }

            if let Some(found) = child.next(c, visible, prev) {
                return Some(found);
            }
        }

        None
    }

    /// Search below `self` treating the candidates as a ring: start just
    /// after `prev` and wrap around to the first candidate.
    pub fn cycle<'n>(
        &'n self,
        c: u8,
        prev: Option<&'n Node<T>>,
        visible: &dyn Fn(u32) -> bool,
    ) -> Option<&'n Node<T>> {
        let mut prev = prev;
        if let Some(found) = self.next(c, visible, &mut prev) {
            return Some(found);
        }

        let mut from_start = None;
        self.next(c, visible, &mut from_start)
    }

    /// Resolve the node reached by walking a typed word.
    ///
    /// Returns the first visible command (or word boundary) below `self`.
    /// A command is rejected as ambiguous when cycling past it finds any
    /// other candidate, e.g. `"show"` while `"show motd"` is also visible.
    pub fn run(&self, visible: &dyn Fn(u32) -> bool) -> Option<&Node<T>> {
        let found = self.cycle(b' ', None, visible)?;

        if found.command.is_some() {
            match found.cycle(b' ', Some(found), visible) {
                Some(again) if ptr::eq(again, found) => {}
                _ => return None,
            }
        }

        Some(found)
    }

    /// Depth-first, byte-ordered traversal calling `f` for every usage line
    /// whose own modes pass `visible`.
    pub fn enumerate_visible(
        &self,
        visible: &dyn Fn(u32) -> bool,
        f: &mut dyn FnMut(&CommandEntry<T>, &Usage),
    ) {
        if let Some(entry) = &self.command {
            for usage in entry.usages.iter().filter(|u| visible(u.modes)) {
                f(entry, usage);
            }
        }

        for child in self.edges.values() {
            child.enumerate_visible(visible, f);
        }
    }
}

fn validate_path(path: &'static str) -> Result<(), Error> {
    let bytes = path.as_bytes();
    let bad_space = bytes.first() == Some(&b' ')
        || bytes.last() == Some(&b' ')
        || bytes.windows(2).any(|w| w == b"  ");
    let bad_char = bytes
        .iter()
        .any(|b| matches!(b, b'\t' | b'\n' | 0x0b | 0x0c | b'\r'));

    if bytes.is_empty() || bad_space || bad_char {
        return Err(Error::InvalidPath(path));
    }
    Ok(())
}
