//! Transports and the protocol layer chain.
//!
//! A session talks to its client through a short chain of [`Layer`]s picked
//! by [`IoMode`]. Bytes read from the wire enter at the tail of the chain
//! and travel towards `start`, turning into [`UiEvent`]s on the way; output
//! leaves `start` and travels towards the tail, where the [`Transport`]
//! finally receives it.
//!
//! ```text
//! Plain:   start ............................ end -> Transport
//! Ecma48:  start <- ecma48 .................. end -> Transport
//! Telnet:  start <- ecma48 <- telnet ........ end -> Transport
//! ```

use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::fmt;

use log::warn;

use crate::error::Error;
use crate::shell::event::UiEvent;
use crate::term::TermCaps;

// Sub-modules
pub mod chain;
pub mod ecma48;
pub mod end;
pub mod start;
pub mod telnet;

pub use chain::{Chain, Input};

/// Byte sink for a session's output.
///
/// Usually implemented by the per-peer application value, which owns the
/// socket or terminal. Implementations should buffer rather than block.
pub trait Transport {
    /// Transport-specific error
    type Error: fmt::Debug;

    /// Write `bytes`, returning how many were accepted.
    ///
    /// Accepting fewer than `bytes.len()` is treated as a failure.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error>;
}

/// Capturing transport, used by tests and for buffered output.
impl Transport for Vec<u8> {
    type Error = core::convert::Infallible;

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}

/// Adapter from any [`std::io::Write`].
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StdTransport<W>(pub W);

#[cfg(feature = "std")]
impl<W: std::io::Write> Transport for StdTransport<W> {
    type Error = std::io::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<usize, Self::Error> {
        self.0.write_all(bytes)?;
        self.0.flush()?;
        Ok(bytes.len())
    }
}

/// Write all of `bytes` to `out`, mapping failures to [`Error::Io`].
pub(crate) fn write_all<W: Transport>(out: &mut W, bytes: &[u8]) -> Result<(), Error> {
    if bytes.is_empty() {
        return Ok(());
    }

    match out.write(bytes) {
        Ok(n) if n == bytes.len() => Ok(()),
        Ok(n) => {
            warn!("short write: {} of {} bytes", n, bytes.len());
            Err(Error::Io)
        }
        Err(e) => {
            warn!("transport write failed: {:?}", e);
            Err(Error::Io)
        }
    }
}

/// Which layer chain a session runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IoMode {
    /// Raw bytes; every byte is a typed character
    Plain,

    /// ECMA-48 terminal: key decoding and cursor control
    Ecma48,

    /// ECMA-48 terminal behind a Telnet connection
    Telnet,
}

/// Line-editing output operations.
///
/// Each layer may implement an operation itself or pass it on; `end`
/// implements all of them in their simplest form.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Output {
    /// Move one column left and erase the character there
    BackspaceAndDelete,

    /// Remember the cursor position
    Save,

    /// Return to the remembered position and erase to end of line
    RestoreAndDeleteToEol,
}

/// Result of [`Layer::create`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Create the layers above now
    Ready,

    /// Hold the layers above until [`Upward::Resolved`] is sent
    Deferred,
}

/// What a layer passes towards `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upward {
    /// Bytes for the previous layer's `read`
    Bytes(Vec<u8>),

    /// Decoded user action
    Event(UiEvent),

    /// A deferred layer has finished its setup
    Resolved,

    /// Protocol reply for the wire, written below the reading layer
    Reply(Vec<u8>),
}

/// Output of one [`Layer::read`] call.
///
/// Replies are queued among the other items so they reach the wire in the
/// order their input arrived, after any output the earlier items cause.
#[derive(Debug, Default)]
pub struct Decoded {
    /// Items for the layers above, in order
    pub items: Vec<Upward>,
}

impl Decoded {
    /// Queue bytes for the previous layer, merging with queued bytes.
    pub fn bytes(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Some(Upward::Bytes(last)) = self.items.last_mut() {
            last.extend_from_slice(data);
        } else {
            self.items.push(Upward::Bytes(data.to_vec()));
        }
    }

    /// Queue an event.
    pub fn event(&mut self, event: UiEvent) {
        self.items.push(Upward::Event(event));
    }

    /// Queue a reply for the wire, merging with a queued reply.
    pub fn reply(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(Upward::Reply(last)) = self.items.last_mut() {
            last.extend_from_slice(bytes);
        } else {
            self.items.push(Upward::Reply(bytes.to_vec()));
        }
    }

    /// Every queued reply, concatenated.
    #[cfg(test)]
    pub(crate) fn replies(&self) -> Vec<u8> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Upward::Reply(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }
}

/// Result of [`Layer::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// Not handled here; ask the next layer
    Pass,

    /// Handled by emitting these bytes below this layer
    Bytes(Vec<u8>),

    /// Handled with no output
    Nothing,
}

/// One protocol layer.
///
/// Layers never call each other; the [`Chain`] moves data between them by
/// position. Every method must accept arbitrarily fragmented input and
/// keep enough state to resume on the next call.
pub trait Layer: fmt::Debug + Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Prepare the layer. Bytes pushed to `replies` go to the wire.
    fn create(&mut self, replies: &mut Vec<u8>) -> Result<Readiness, Error> {
        let _ = replies;
        Ok(Readiness::Ready)
    }

    /// Release the layer. Called in reverse creation order.
    fn destroy(&mut self) {}

    /// Consume input bytes, returning how many were used.
    ///
    /// On error, items already queued in `up` are still delivered; the
    /// error is reported after them.
    fn read(&mut self, data: &[u8], up: &mut Decoded) -> Result<usize, Error>;

    /// Transform outgoing bytes.
    fn encode<'b>(&mut self, bytes: &'b [u8]) -> Cow<'b, [u8]> {
        Cow::Borrowed(bytes)
    }

    /// Perform or pass on an editing operation.
    fn send(&mut self, op: Output, caps: &TermCaps) -> Result<Sent, Error> {
        let _ = (op, caps);
        Ok(Sent::Pass)
    }

    /// Terminal type learned by this layer, if any.
    fn ttype(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_vec_transport_captures() {
        let mut out = Vec::new();
        write_all(&mut out, b"abc").unwrap();
        write_all(&mut out, b"").unwrap();
        assert_eq!(out, b"abc");
    }

    struct Short;

    impl Transport for Short {
        type Error = ();

        fn write(&mut self, bytes: &[u8]) -> Result<usize, ()> {
            Ok(bytes.len() / 2)
        }
    }

    struct Broken;

    impl Transport for Broken {
        type Error = &'static str;

        fn write(&mut self, _: &[u8]) -> Result<usize, &'static str> {
            Err("closed")
        }
    }

    #[test]
    fn test_write_failures_become_io() {
        assert_eq!(write_all(&mut Short, b"abcd"), Err(Error::Io));
        assert_eq!(write_all(&mut Broken, b"a"), Err(Error::Io));
    }

    #[test]
    fn test_decoded_merges_bytes() {
        let mut up = Decoded::default();
        up.bytes(b"ab");
        up.bytes(b"");
        up.bytes(b"c");
        up.event(UiEvent::Help);
        up.bytes(b"d");
        assert_eq!(
            up.items,
            [
                Upward::Bytes(b"abc".to_vec()),
                Upward::Event(UiEvent::Help),
                Upward::Bytes(b"d".to_vec()),
            ]
        );
    }

    #[test]
    fn test_decoded_keeps_replies_in_order() {
        let mut up = Decoded::default();
        up.bytes(b"a");
        up.reply(&[1, 2]);
        up.reply(&[3]);
        up.bytes(b"b");
        up.reply(&[4]);
        assert_eq!(
            up.items,
            [
                Upward::Bytes(b"a".to_vec()),
                Upward::Reply(vec![1, 2, 3]),
                Upward::Bytes(b"b".to_vec()),
                Upward::Reply(vec![4]),
            ]
        );
        assert_eq!(up.replies(), [1, 2, 3, 4]);
    }
}
