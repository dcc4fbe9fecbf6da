//! A very small adventure game on the local terminal.
//!
//! Runs one ECMA-48 session on stdin/stdout with the terminal in raw mode,
//! so line editing, ^C and `?` help all come from the library.
//! Raw mode also turns off output processing, so [`Game`] expands `\n`
//! to `\r\n` on the way out.
//!
//! ```bash
//! cargo run --example advent --features demos
//! ```

#[path = "common/raw.rs"]
mod raw;

use std::io::{self, Read, Stdout};

use clink::{Callbacks, CommandSpec, Error, IoMode, Peer, StdTransport, Transport, Tree};
use raw::RawModeGuard;

// =============================================================================
// World
// =============================================================================

#[derive(Debug, Copy, Clone, PartialEq, Eq, clink::Flag)]
enum Phase {
    Playing,
    Finished,
}

const PLAYING: u32 = Phase::Playing.mask();
const FINISHED: u32 = Phase::Finished.mask();

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Room {
    Hall,
    Library,
    Cellar,
    Vault,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Dir {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Room {
    fn describe(self) -> &'static str {
        match self {
            Room::Hall => "You are in a dusty hall. A doorway leads north and stairs go down.",
            Room::Library => "Shelves of rotting books surround you. The hall is to the south.",
            Room::Cellar => "A damp cellar. Stairs lead up; a heavy door stands to the east.",
            Room::Vault => "A tiny vault, its walls lined with empty shelves but one.",
        }
    }

    fn exit(self, dir: Dir) -> Option<Room> {
        match (self, dir) {
            (Room::Hall, Dir::North) => Some(Room::Library),
            (Room::Hall, Dir::Down) => Some(Room::Cellar),
            (Room::Library, Dir::South) => Some(Room::Hall),
            (Room::Cellar, Dir::Up) => Some(Room::Hall),
            (Room::Cellar, Dir::East) => Some(Room::Vault),
            (Room::Vault, Dir::West) => Some(Room::Cellar),
            _ => None,
        }
    }

    fn is_dark(self) -> bool {
        matches!(self, Room::Cellar | Room::Vault)
    }
}

/// Game state, also the session's transport.
#[derive(Debug)]
struct Game {
    out: StdTransport<Stdout>,
    room: Room,
    items: Vec<(&'static str, Room)>,
    carried: Vec<&'static str>,
    door_open: bool,
}

impl Game {
    fn new() -> Self {
        Self {
            out: StdTransport(io::stdout()),
            room: Room::Hall,
            items: vec![("lamp", Room::Library), ("key", Room::Cellar), ("crown", Room::Vault)],
            carried: Vec::new(),
            door_open: false,
        }
    }

    fn can_see(&self) -> bool {
        !self.room.is_dark() || self.carried.contains(&"lamp")
    }
}

impl Transport for Game {
    type Error = io::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        if !bytes.contains(&b'\n') {
            return self.out.write(bytes);
        }

        let mut crlf = Vec::with_capacity(bytes.len() + 8);
        for &b in bytes {
            if b == b'\n' {
                crlf.push(b'\r');
            }
            crlf.push(b);
        }
        self.out.write(&crlf)?;
        Ok(bytes.len())
    }
}

type GamePeer<'t> = Peer<'t, Game>;

// =============================================================================
// Commands
// =============================================================================

fn look(peer: &mut GamePeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let game = peer.opaque();
    if !game.can_see() {
        let _ = peer.print("It is pitch dark.\n");
        return;
    }

    let mut text = format!("{}\n", game.room.describe());
    for (item, _) in game.items.iter().filter(|(_, room)| *room == game.room) {
        text.push_str(&format!("There is a {} here.\n", item));
    }
    let _ = peer.print(&text);
}

fn go(peer: &mut GamePeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    let dir = match path {
        "go north" => Dir::North,
        "go south" => Dir::South,
        "go east" => Dir::East,
        "go west" => Dir::West,
        "go up" => Dir::Up,
        _ => Dir::Down,
    };

    let game = peer.opaque_mut();
    let Some(next) = game.room.exit(dir) else {
        let _ = peer.print("You can't go that way.\n");
        return;
    };
    if next == Room::Vault && !game.door_open {
        let _ = peer.print("The door is locked.\n");
        return;
    }
    game.room = next;
    look(peer, path, mode, argv);
}

fn take(peer: &mut GamePeer<'_>, _path: &str, _mode: u32, argv: &[&str]) {
    let [name] = argv else {
        let _ = peer.print("Take what?\n");
        return;
    };

    let game = peer.opaque_mut();
    let here = game.room;
    let pos = match game.can_see() {
        true => game.items.iter().position(|&(item, room)| item == *name && room == here),
        false => None,
    };
    let Some(pos) = pos else {
        let _ = peer.printf(format_args!("There is no {} here.\n", name));
        return;
    };

    let (item, _) = game.items.remove(pos);
    game.carried.push(item);
    let _ = peer.print("Taken.\n");

    if item == "crown" {
        let _ = peer.print("The crown is yours. You win!\nType 'restart' to play again.\n");
        peer.set_mode(FINISHED);
    }
}

fn drop_item(peer: &mut GamePeer<'_>, _path: &str, _mode: u32, argv: &[&str]) {
    let [name] = argv else {
        let _ = peer.print("Drop what?\n");
        return;
    };

    let game = peer.opaque_mut();
    let Some(pos) = game.carried.iter().position(|item| item == name) else {
        let _ = peer.printf(format_args!("You have no {}.\n", name));
        return;
    };
    let item = game.carried.remove(pos);
    let room = game.room;
    game.items.push((item, room));
    let _ = peer.print("Dropped.\n");
}

fn inventory(peer: &mut GamePeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let carried = &peer.opaque().carried;
    let text = if carried.is_empty() {
        "You are empty-handed.\n".to_string()
    } else {
        format!("You carry: {}\n", carried.join(", "))
    };
    let _ = peer.print(&text);
}

fn open_door(peer: &mut GamePeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let game = peer.opaque_mut();
    let text = if game.room != Room::Cellar || !game.can_see() {
        "You see no door you can open.\n"
    } else if game.door_open {
        "It is already open.\n"
    } else if game.carried.contains(&"key") {
        game.door_open = true;
        "The key turns and the door swings open.\n"
    } else {
        "It is locked.\n"
    };
    let _ = peer.print(text);
}

fn restart(peer: &mut GamePeer<'_>, path: &str, mode: u32, argv: &[&str]) {
    let fresh = Game::new();
    let game = peer.opaque_mut();
    game.room = fresh.room;
    game.items = fresh.items;
    game.carried.clear();
    game.door_open = false;
    peer.set_mode(PLAYING);
    look(peer, path, mode, argv);
}

fn help(peer: &mut GamePeer<'_>, _path: &str, mode: u32, _argv: &[&str]) {
    let _ = peer.show_help(mode);
}

fn quit(peer: &mut GamePeer<'_>, _path: &str, _mode: u32, _argv: &[&str]) {
    let _ = peer.print("Farewell.\n");
    peer.request_close();
}

fn prompt(peer: &mut GamePeer<'_>, _mode: u32) -> Result<(), Error> {
    peer.print("> ")?;
    Ok(())
}

fn motd(peer: &mut GamePeer<'_>) -> Result<(), Error> {
    peer.print("ADVENT\nFind the crown. Type 'help' or press '?' for commands.\n\n")?;
    look(peer, "look", PLAYING, &[]);
    Ok(())
}

static COMMANDS: &[CommandSpec<Game>] = &[
    CommandSpec::new("look", PLAYING, 0, look).with_usage("Describe the room"),
    CommandSpec::new("go north", PLAYING, 0, go),
    CommandSpec::new("go south", PLAYING, 0, go),
    CommandSpec::new("go east", PLAYING, 0, go),
    CommandSpec::new("go west", PLAYING, 0, go),
    CommandSpec::new("go up", PLAYING, 0, go),
    CommandSpec::new("go down", PLAYING, 0, go),
    CommandSpec::new("take", PLAYING, 0, take).with_usage("Pick something up"),
    CommandSpec::new("drop", PLAYING, 0, drop_item).with_usage("Put something down"),
    CommandSpec::new("inventory", PLAYING, 0, inventory).with_usage("What you carry"),
    CommandSpec::new("open door", PLAYING, 0, open_door),
    CommandSpec::new("restart", FINISHED, 0, restart).with_usage("Play again"),
    CommandSpec::new("help", PLAYING | FINISHED, 0, help).with_usage("List commands"),
    CommandSpec::new("quit", PLAYING | FINISHED, 0, quit).with_usage("Leave the game"),
];

// =============================================================================
// Main
// =============================================================================

fn run(tree: &Tree<Game>) -> Result<(), Error> {
    let mut peer = Peer::new(tree, IoMode::Ecma48, Game::new());
    peer.set_mode(PLAYING);
    peer.ready()?;

    let mut stdin = io::stdin();
    let mut buf = [0u8; 64];
    while !peer.is_closing() {
        let n = match stdin.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        peer.read(&buf[..n])?;
    }

    peer.close();
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();

    let callbacks = Callbacks::new(prompt)
        .with_motd(motd)
        .with_ttype(|_| std::env::var("TERM").ok());
    let tree = Tree::new(COMMANDS, &[], callbacks).map_err(io::Error::other)?;

    let guard = RawModeGuard::new()?;
    let result = run(&tree);
    drop(guard);

    result.map_err(io::Error::other)
}
