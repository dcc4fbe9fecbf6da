//! Configuration traits and implementations for session limits.
//!
//! The `ShellConfig` trait fixes the per-session limits at compile time.
//! A [`Tree`](crate::tree::Tree) copies them into [`Limits`] when it is
//! built, so sessions consult plain fields at runtime.

/// Session configuration trait defining buffer sizes and capacity limits.
///
/// All values are const. Pick one with
/// [`Tree::with_config`](crate::tree::Tree::with_config).
pub trait ShellConfig {
    /// Maximum bytes held by the line editor (default: 1024)
    const MAX_LINE: usize;

    /// Initial capacity of a fresh edit buffer (default: 64)
    const LINE_BLOCK: usize;

    /// Maximum number of positional command arguments (default: 64)
    const MAX_ARGS: usize;

    /// Application bytes the Telnet layer buffers while awaiting TTYPE (default: 256)
    const MAX_PENDING: usize;
}

/// Default configuration for network and desktop terminals.
///
/// - MAX_LINE: 1024 bytes
/// - LINE_BLOCK: 64 bytes
/// - MAX_ARGS: 64 arguments
/// - MAX_PENDING: 256 bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DefaultConfig;

impl ShellConfig for DefaultConfig {
    const MAX_LINE: usize = 1024;
    const LINE_BLOCK: usize = 64;
    const MAX_ARGS: usize = 64;
    const MAX_PENDING: usize = 256;
}

/// Minimal configuration for memory-limited hosts.
///
/// - MAX_LINE: 128 bytes
/// - LINE_BLOCK: 16 bytes
/// - MAX_ARGS: 8 arguments
/// - MAX_PENDING: 32 bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MinimalConfig;

impl ShellConfig for MinimalConfig {
    const MAX_LINE: usize = 128;
    const LINE_BLOCK: usize = 16;
    const MAX_ARGS: usize = 8;
    const MAX_PENDING: usize = 32;
}

/// Runtime copy of a [`ShellConfig`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    /// See [`ShellConfig::MAX_LINE`]
    pub max_line: usize,
    /// See [`ShellConfig::LINE_BLOCK`]
    pub line_block: usize,
    /// See [`ShellConfig::MAX_ARGS`]
    pub max_args: usize,
    /// See [`ShellConfig::MAX_PENDING`]
    pub max_pending: usize,
}

impl Limits {
    /// Capture the constants of `C`.
    pub const fn of<C: ShellConfig>() -> Self {
        Self {
            max_line: C::MAX_LINE,
            line_block: C::LINE_BLOCK,
            max_args: C::MAX_ARGS,
            max_pending: C::MAX_PENDING,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::of::<DefaultConfig>()
    }
}
