//! Terminal key decoder test bench.
//!
//! Puts the terminal in raw mode and prints one record per decoded key, so
//! the sequences a terminal emulator sends can be inspected. ^C is an
//! ordinary key in raw mode; signals delivered to the process (SIGINT from
//! `kill`, window resizes) are reported as `<SIGNAL n>`. Press `q` to quit.
//!
//! ```bash
//! cargo run --example keytest --features demos
//! ```

#[path = "common/raw.rs"]
mod raw;

use std::io::{self, Write};
use std::time::Duration;

use clink::shell::decoder::{Character, KeyDecoder};
use log::debug;
use raw::RawModeGuard;
use tokio::io::AsyncReadExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::timeout;

/// How long a lone ESC waits for the rest of a sequence.
const ESC_TIMEOUT: Duration = Duration::from_millis(50);

fn show(c: &Character) -> io::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "{}\r\n", c)?;
    out.flush()?;

    let done = match c {
        Character::Eof | Character::Error(_) => true,
        Character::Literal { codepoint, .. } => *codepoint == 'q',
        _ => false,
    };
    Ok(done)
}

async fn run() -> io::Result<()> {
    let mut stdin = tokio::io::stdin();
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut winch = signal(SignalKind::window_change())?;

    let mut decoder = KeyDecoder::new();
    let mut buf = [0u8; 64];

    loop {
        let wait = if decoder.is_idle() { Duration::MAX } else { ESC_TIMEOUT };

        let n = tokio::select! {
            read = timeout(wait, stdin.read(&mut buf)) => match read {
                Ok(read) => read?,
                Err(_) => {
                    debug!("escape timeout in {:?}", decoder.state());
                    if let Some(c) = decoder.flush() {
                        if show(&c)? {
                            return Ok(());
                        }
                    }
                    continue;
                }
            },
            _ = interrupt.recv() => {
                show(&Character::Signal(SignalKind::interrupt().as_raw_value()))?;
                continue;
            }
            _ = winch.recv() => {
                show(&Character::Signal(SignalKind::window_change().as_raw_value()))?;
                continue;
            }
        };

        if n == 0 {
            show(&Character::Eof)?;
            return Ok(());
        }

        for &byte in &buf[..n] {
            if let Some(c) = decoder.decode(byte) {
                if show(&c)? {
                    return Ok(());
                }
            }
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> io::Result<()> {
    env_logger::init();

    println!("Press keys to see how they decode; 'q' quits.");
    let guard = RawModeGuard::new()?;
    let result = run().await;
    drop(guard);
    result
}
