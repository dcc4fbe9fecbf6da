//! Shared terminal handling for the local demos.

use std::io;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

// =============================================================================
// Terminal Raw Mode Guard
// =============================================================================

/// RAII guard that puts the terminal into raw mode and restores it on drop.
///
/// Raw mode switches off echo, line buffering, signal keys and output
/// post-processing. Every key reaches the program as typed (^C arrives as
/// byte 0x03), and a bare `\n` no longer returns the carriage, so the
/// demos write `\r\n` themselves.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}
