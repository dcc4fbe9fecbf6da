//! Test fixtures and utilities for clink testing.
//!
//! Provides:
//! - `MockTransport`: capturing per-peer value that records callbacks
//! - `Mode` / `Field`: flag enums for the test tables
//! - `COMMANDS` / `FIELDS`: command tree used by most tests
//! - `AMBIGUOUS`: a table where one command is a prefix of another

#![allow(dead_code)]

use clink::{CommandSpec, Error, FieldSpec, Flag, Peer, Transport};

// ============================================================================
// MockTransport - Test Per-Peer Value
// ============================================================================

/// One command callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub path: String,
    pub mode: u32,
    pub argv: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Mock transport for testing.
///
/// Captures all output and records every command callback so tests can
/// assert on what ran, with which arguments and field values.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Output capture
    pub output: Vec<u8>,

    /// Callback log
    pub calls: Vec<Call>,

    /// Runs of `retry` that asked for another round
    pub retries: u32,

    /// Refuse all writes
    pub broken: bool,
}

impl MockTransport {
    /// Create a transport with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured output, lossily decoded.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Captured output as raw bytes (for Telnet and escape sequences).
    pub fn output_bytes(&self) -> &[u8] {
        &self.output
    }

    /// Clear output buffer.
    pub fn clear_output(&mut self) {
        self.output.clear();
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        if self.broken {
            return Err(());
        }
        self.output.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

// ============================================================================
// Modes and Fields
// ============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, clink::Flag)]
pub enum Mode {
    User,
    Enabled,
    Config,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, clink::Flag)]
pub enum Field {
    Username,
    Password,
    Confirm,
}

pub const USER: u32 = Mode::User.mask();
pub const ENABLED: u32 = Mode::Enabled.mask();
pub const CONFIG: u32 = Mode::Config.mask();

pub const USERNAME: u32 = Field::Username.mask();
pub const PASSWORD: u32 = Field::Password.mask();
pub const CONFIRM: u32 = Field::Confirm.mask();

// ============================================================================
// Callbacks
// ============================================================================

pub type TestPeer<'t> = Peer<'t, MockTransport>;

/// Record the invocation.
pub fn record(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    let call = Call {
        path: path.to_string(),
        mode,
        argv: argv.iter().map(|s| s.to_string()).collect(),
        username: peer.field(USERNAME).map(str::to_string),
        password: peer.field(PASSWORD).map(str::to_string),
    };
    peer.opaque_mut().calls.push(call);
}

pub fn echo(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    record(peer, path, mode, argv);
    let _ = peer.printf(format_args!("{}\n", argv.join(" ")));
}

pub fn enable(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    record(peer, path, mode, argv);
    peer.set_mode(ENABLED);
}

pub fn configure(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    record(peer, path, mode, argv);
    peer.set_mode(CONFIG);
}

pub fn disable(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    record(peer, path, mode, argv);
    peer.set_mode(USER);
}

pub fn help(peer: &mut TestPeer<'_>, _path: &str, mode: u32, _argv: &[&str]) {
    let _ = peer.show_help(mode);
}

pub fn quit(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    record(peer, path, mode, argv);
    peer.request_close();
}

/// Asks for another round until it has been retried twice.
pub fn retry(peer: &mut TestPeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    record(peer, path, mode, argv);
    if peer.opaque().retries < 2 {
        peer.opaque_mut().retries += 1;
        peer.again();
    }
}

/// Refuses empty passwords.
pub fn nonempty(_peer: &mut TestPeer<'_>, _id: u32, value: &str) -> bool {
    !value.is_empty()
}

/// Accepts "yes"; "abort" ends the session.
pub fn confirm(peer: &mut TestPeer<'_>, _id: u32, value: &str) -> bool {
    if value == "abort" {
        peer.request_close();
        return false;
    }
    value == "yes"
}

/// Prompt showing the mode name.
pub fn prompt(peer: &mut TestPeer<'_>, mode: u32) -> Result<(), Error> {
    let name = Mode::from_bit(mode).map(|m| m.as_str()).unwrap_or("none");
    peer.printf(format_args!("{}> ", name))?;
    Ok(())
}

pub fn motd(peer: &mut TestPeer<'_>) -> Result<(), Error> {
    peer.print("Welcome\n")?;
    Ok(())
}

// ============================================================================
// Tables
// ============================================================================

pub static COMMANDS: &[CommandSpec<MockTransport>] = &[
    CommandSpec::new("show motd", USER | ENABLED, 0, record).with_usage("Message of the day"),
    CommandSpec::new("show users", USER, 0, record).with_usage("Who is logged in"),
    CommandSpec::new("echo", USER | ENABLED, 0, echo).with_usage("Print arguments"),
    CommandSpec::new("enable", USER, 0, enable).with_usage("Privileged mode"),
    CommandSpec::new("disable", ENABLED, 0, disable).with_usage("Leave privileged mode"),
    CommandSpec::new("configure terminal", ENABLED, 0, configure),
    CommandSpec::new("exit", CONFIG, 0, enable).with_usage("Leave configuration"),
    CommandSpec::new("exit", ENABLED, 0, enable).with_usage("Stay privileged"),
    CommandSpec::new("login", USER, USERNAME | PASSWORD, record).with_usage("Log in"),
    CommandSpec::new("passwd", USER, PASSWORD | CONFIRM, record),
    CommandSpec::new("retry", USER, USERNAME, retry),
    CommandSpec::new("help", USER | ENABLED | CONFIG, 0, help),
    CommandSpec::new("quit", USER | ENABLED, 0, quit),
    CommandSpec::new("hello", 0, 0, record).with_usage("Before any mode"),
];

pub static FIELDS: &[FieldSpec<MockTransport>] = &[
    FieldSpec::new(USERNAME, "username"),
    FieldSpec::new(PASSWORD, "password").hidden().with_validate(nonempty),
    FieldSpec::new(CONFIRM, "confirm").with_validate(confirm),
];

pub static AMBIGUOUS: &[CommandSpec<MockTransport>] = &[
    CommandSpec::new("show", USER, 0, record),
    CommandSpec::new("show motd", USER, 0, record),
    CommandSpec::new("status", USER, 0, record),
];
