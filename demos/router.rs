//! Router-style Telnet server.
//!
//! Serves a modal command line to every Telnet client that connects. A
//! client starts logged out, logs in with a username and password, then
//! moves between the usual modes with `enable`, `configure terminal` and
//! `interface <name>`.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example router --features demos -- 127.0.0.1:2323
//! telnet 127.0.0.1 2323
//! ```
//!
//! Credentials:
//! - admin:admin123
//! - guest:guest123
//! - enable secret: cisco

use std::collections::BTreeMap;
use std::sync::OnceLock;

use clink::{
    Callbacks, CommandSpec, Credential, CredentialTable, Error, FieldSpec, Flag, IoMode, Peer,
    Sha256Hasher, Transport, Tree,
};
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::LocalSet;

const MAX_ATTEMPTS: u32 = 3;

// =============================================================================
// Modes and Fields
// =============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, clink::Flag)]
enum Mode {
    Connected,
    Enabled,
    Configure,
    Interface,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, clink::Flag)]
enum Field {
    Username,
    Password,
    Secret,
}

const CONNECTED: u32 = Mode::Connected.mask();
const ENABLED: u32 = Mode::Enabled.mask();
const CONFIGURE: u32 = Mode::Configure.mask();
const INTERFACE: u32 = Mode::Interface.mask();
const LOGGED_IN: u32 = CONNECTED | ENABLED | CONFIGURE | INTERFACE;
const PRIVILEGED: u32 = ENABLED | CONFIGURE | INTERFACE;

const USERNAME: u32 = Field::Username.mask();
const PASSWORD: u32 = Field::Password.mask();
const SECRET: u32 = Field::Secret.mask();

// =============================================================================
// Connection State
// =============================================================================

#[derive(Debug, Default)]
struct Interface {
    address: Option<String>,
    shutdown: bool,
}

/// Per-connection value: pending output plus the session's router state.
#[derive(Debug, Default)]
struct Conn {
    out: Vec<u8>,
    user: Option<&'static str>,
    attempts: u32,
    interface: Option<String>,
    interfaces: BTreeMap<String, Interface>,
}

impl Transport for Conn {
    type Error = core::convert::Infallible;

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.out.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

type RouterPeer<'t> = Peer<'t, Conn>;

// =============================================================================
// Credentials
// =============================================================================

static USERS: OnceLock<CredentialTable<Sha256Hasher, 3>> = OnceLock::new();

fn users() -> &'static CredentialTable<Sha256Hasher, 3> {
    USERS.get_or_init(|| {
        let hasher = Sha256Hasher::new();
        CredentialTable::new(
            [
                Credential::hashed(&hasher, "admin", CONNECTED, *b"admin-salt-00001", "admin123"),
                Credential::hashed(&hasher, "guest", CONNECTED, *b"guest-salt-00002", "guest123"),
                Credential::hashed(&hasher, "enable", ENABLED, *b"enable-salt-0003", "cisco"),
            ],
            hasher,
        )
    })
}

/// Count a failed attempt and hang up after the last one.
fn failed(peer: &mut RouterPeer<'_>) -> bool {
    let conn = peer.opaque_mut();
    conn.attempts += 1;
    warn!("authentication failure {} of {}", conn.attempts, MAX_ATTEMPTS);
    if conn.attempts >= MAX_ATTEMPTS {
        let _ = peer.print("% Too many failures\n");
        peer.request_close();
    } else {
        let _ = peer.print("% Authentication failed\n");
    }
    false
}

fn check_password(peer: &mut RouterPeer<'_>, _id: u32, password: &str) -> bool {
    let username = peer.field(USERNAME).unwrap_or("").to_string();
    // The enable secret is not a login.
    let cred = users()
        .verify(&username, password)
        .filter(|c| c.modes == CONNECTED);

    match cred {
        Some(cred) => {
            let conn = peer.opaque_mut();
            conn.user = Some(cred.username);
            conn.attempts = 0;
            true
        }
        None => failed(peer),
    }
}

fn check_secret(peer: &mut RouterPeer<'_>, _id: u32, secret: &str) -> bool {
    if users().verify("enable", secret).is_some() {
        peer.opaque_mut().attempts = 0;
        true
    } else {
        failed(peer)
    }
}

// =============================================================================
// Command Callbacks
// =============================================================================

fn login(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let user = peer.opaque().user.unwrap_or("?");
    info!("{} logged in", user);
    let _ = peer.printf(format_args!("Logged in as {}\n", user));
    peer.set_mode(CONNECTED);
}

fn enable(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    peer.set_mode(ENABLED);
}

fn disable(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    peer.opaque_mut().interface = None;
    peer.set_mode(CONNECTED);
}

fn configure(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let _ = peer.print("Enter configuration commands, one per line.  End with 'end'.\n");
    peer.set_mode(CONFIGURE);
}

fn interface(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, argv: &[&str]) {
    let [name] = argv else {
        let _ = peer.print("% Usage: interface <name>\n");
        return;
    };
    let conn = peer.opaque_mut();
    conn.interfaces.entry(name.to_string()).or_default();
    conn.interface = Some(name.to_string());
    peer.set_mode(INTERFACE);
}

fn selected<'a>(peer: &'a mut RouterPeer<'_>) -> Option<&'a mut Interface> {
    let conn = peer.opaque_mut();
    let name = conn.interface.as_ref()?;
    conn.interfaces.get_mut(name)
}

fn ip_address(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, argv: &[&str]) {
    let [addr, mask] = argv else {
        let _ = peer.print("% Usage: ip address <address> <mask>\n");
        return;
    };
    let address = format!("{}/{}", addr, mask);
    if let Some(iface) = selected(peer) {
        iface.address = Some(address);
    }
}

fn shutdown(peer: &mut RouterPeer<'_>, path: &str, _mode: u32, _argv: &[&str]) {
    let down = !path.starts_with("no ");
    if let Some(iface) = selected(peer) {
        iface.shutdown = down;
    }
}

fn exit(peer: &mut RouterPeer<'_>, _path: &str, mode: u32, _argv: &[&str]) {
    if mode == INTERFACE {
        peer.opaque_mut().interface = None;
        peer.set_mode(CONFIGURE);
    } else {
        peer.set_mode(ENABLED);
    }
}

fn end(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    peer.opaque_mut().interface = None;
    peer.set_mode(ENABLED);
}

fn show_motd(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let _ = motd(peer);
}

fn show_interfaces(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let mut text = String::new();
    for (name, iface) in &peer.opaque().interfaces {
        let state = if iface.shutdown { "administratively down" } else { "up" };
        let addr = iface.address.as_deref().unwrap_or("unassigned");
        text.push_str(&format!("{:<16} {:<20} {}\n", name, addr, state));
    }
    if text.is_empty() {
        text.push_str("No interfaces configured\n");
    }
    let _ = peer.print(&text);
}

fn help(peer: &mut RouterPeer<'_>, _path: &str, mode: u32, _argv: &[&str]) {
    let _ = peer.show_help(mode);
}

fn logout(peer: &mut RouterPeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    info!("{} logged out", peer.opaque().user.unwrap_or("?"));
    let _ = peer.print("Bye\n");
    peer.request_close();
}

// =============================================================================
// Session Callbacks
// =============================================================================

fn prompt(peer: &mut RouterPeer<'_>, mode: u32) -> Result<(), Error> {
    let text = match Mode::from_bit(mode) {
        None => "login> ",
        Some(Mode::Connected) => "router> ",
        Some(Mode::Enabled) => "router# ",
        Some(Mode::Configure) => "router(config)# ",
        Some(Mode::Interface) => "router(config-if)# ",
    };
    peer.print(text)?;
    Ok(())
}

fn motd(peer: &mut RouterPeer<'_>) -> Result<(), Error> {
    peer.print("\nclink demo router\nAuthorized access only. Type 'login' to begin.\n\n")?;
    Ok(())
}

// =============================================================================
// Tables
// =============================================================================

static FIELDS: &[FieldSpec<Conn>] = &[
    FieldSpec::new(USERNAME, "Username"),
    FieldSpec::new(PASSWORD, "Password").hidden().with_validate(check_password),
    FieldSpec::new(SECRET, "Password").hidden().with_validate(check_secret),
];

static COMMANDS: &[CommandSpec<Conn>] = &[
    CommandSpec::new("login", 0, USERNAME | PASSWORD, login).with_usage("Log in"),
    CommandSpec::new("logout", LOGGED_IN, 0, logout).with_usage("End the session"),
    CommandSpec::new("help", LOGGED_IN, 0, help).with_usage("List commands"),
    CommandSpec::new("show motd", LOGGED_IN, 0, show_motd).with_usage("Message of the day"),
    CommandSpec::new("show interfaces", PRIVILEGED, 0, show_interfaces)
        .with_usage("Interface status"),
    CommandSpec::new("enable", CONNECTED, SECRET, enable).with_usage("Privileged mode"),
    CommandSpec::new("disable", PRIVILEGED, 0, disable).with_usage("Leave privileged mode"),
    CommandSpec::new("configure terminal", ENABLED, 0, configure)
        .with_usage("Configure from the terminal"),
    CommandSpec::new("interface", CONFIGURE | INTERFACE, 0, interface)
        .with_usage("Select an interface"),
    CommandSpec::new("ip address", INTERFACE, 0, ip_address).with_usage("Set the address"),
    CommandSpec::new("shutdown", INTERFACE, 0, shutdown).with_usage("Disable the interface"),
    CommandSpec::new("no shutdown", INTERFACE, 0, shutdown).with_usage("Enable the interface"),
    CommandSpec::new("exit", CONFIGURE, 0, exit).with_usage("Leave configuration mode"),
    CommandSpec::new("exit", INTERFACE, 0, exit).with_usage("Leave interface mode"),
    CommandSpec::new("end", CONFIGURE | INTERFACE, 0, end).with_usage("Back to privileged mode"),
];

// =============================================================================
// Server
// =============================================================================

async fn serve(tree: &'static Tree<Conn>, mut stream: TcpStream) -> Result<(), Error> {
    let mut peer = Peer::accept(tree, IoMode::Telnet, Conn::default())?;
    let mut buf = [0u8; 512];

    loop {
        let out = std::mem::take(&mut peer.opaque_mut().out);
        if stream.write_all(&out).await.is_err() || peer.is_closing() {
            break;
        }

        let n = match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        debug!("read {} bytes", n);
        if let Err(e) = peer.read(&buf[..n]) {
            warn!("session error: {}", e);
            break;
        }
    }

    peer.close();
    Ok(())
}

async fn accept_loop(listener: TcpListener, tree: &'static Tree<Conn>) -> std::io::Result<()> {
    loop {
        let (stream, remote) = listener.accept().await?;
        info!("connection from {}", remote);
        tokio::task::spawn_local(async move {
            if let Err(e) = serve(tree, stream).await {
                warn!("{}: {}", remote, e);
            }
            info!("{} disconnected", remote);
        });
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:2323".to_string());
    let tree: &'static Tree<Conn> =
        match Tree::new(COMMANDS, FIELDS, Callbacks::new(prompt).with_motd(motd)) {
            Ok(tree) => Box::leak(Box::new(tree)),
            Err(e) => {
                eprintln!("bad command table: {}", e);
                std::process::exit(1);
            }
        };

    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    LocalSet::new().run_until(accept_loop(listener, tree)).await
}
