//! # clink
//!
//! Interactive command lines for network and terminal sessions.
//!
//! **Key features:**
//! - **Trie dispatch** - Commands are byte paths in a shared trie; unique
//!   abbreviations resolve, ambiguous ones are refused
//! - **Modes** - Every command is visible in a set of modes; the peer's
//!   mode decides what it can run and what help shows
//! - **Fields** - Commands may prompt for values (hidden or echoed) before
//!   their callback runs
//! - **Layered I/O** - Plain, ECMA-48 terminal and Telnet transports, fed
//!   arbitrarily fragmented input
//!
//! ```rust,ignore
//! static COMMANDS: &[CommandSpec<Conn>] = &[
//!     CommandSpec::new("show motd", Mode::User.mask(), 0, show_motd).with_usage("Message of the day"),
//!     CommandSpec::new("login", Mode::User.mask(), Field::Username.mask() | Field::Password.mask(), login),
//! ];
//!
//! let tree = Tree::new(COMMANDS, FIELDS, Callbacks::new(prompt))?;
//! let mut peer = Peer::new(&tree, IoMode::Telnet, conn);
//! peer.set_mode(Mode::User.mask());
//! peer.ready()?;
//! peer.read(&bytes)?;
//! ```
//!
//! ## Optional Features
//!
//! - `authentication` - Credential tables and SHA-256 password hashing
//! - `std` - [`StdTransport`] over any `std::io::Write`
//! - `demos` - The demo programs under `demos/`
//!
//! The library provides a `#[derive(Flag)]` macro that's always available.
//!
//! This library is `no_std` compatible; it needs `alloc`.

#![no_std]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::result_large_err)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// Lets the derive's `::clink::Flag` path resolve inside this crate's own tests.
extern crate self as clink;

// Re-export derive macro (always available)
pub use clink_macros::Flag;

// ============================================================================
// Module Declarations
// ============================================================================

pub mod config;
pub mod error;
pub mod io;
pub mod shell;
pub mod term;
pub mod tree;

#[cfg(feature = "authentication")]
pub mod auth;

// ============================================================================
// Re-exports - Public API
// ============================================================================

// Configuration
pub use config::{DefaultConfig, Limits, MinimalConfig, ShellConfig};

// Error types
pub use error::{DecodeError, Error};

// I/O
pub use io::{IoMode, Output, Transport};

#[cfg(feature = "std")]
pub use io::StdTransport;

// Terminal capabilities
pub use term::TermCaps;

// Command tree
pub use tree::{visible, Callbacks, CommandSpec, FieldSpec, Flag, Tree};

// Sessions
pub use shell::{Peer, ReadState, UiEvent};

#[cfg(feature = "authentication")]
pub use auth::{Credential, CredentialTable, PasswordHasher, Sha256Hasher};

// ============================================================================
// Library Metadata
// ============================================================================

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
