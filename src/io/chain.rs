//! Ordered layer list and the data movement between layers.
//!
//! Index 0 is always `start` and the last index is always `end`. Reads
//! enter at the last index and move towards 0; writes and editing
//! operations enter at 0 and move towards the last index. Layers are
//! created from the tail inwards and destroyed in the reverse order.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use log::{debug, trace, warn};

use super::ecma48::Ecma48Layer;
use super::end::EndLayer;
use super::start::StartLayer;
use super::telnet::TelnetLayer;
use super::{write_all, IoMode, Layer, Output, Readiness, Sent, Transport, Upward};
use crate::config::Limits;
use crate::error::Error;
use crate::shell::event::UiEvent;
use crate::term::TermCaps;

/// What the chain hands to the session after a read or create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Every layer is created; run session start-up
    Start,

    /// User action
    Event(UiEvent),

    /// Protocol bytes to write below layer `below`
    Reply { below: usize, bytes: Vec<u8> },
}

/// Layer chain of one session.
#[derive(Debug)]
pub struct Chain {
    layers: Vec<Box<dyn Layer>>,

    /// Lowest created index; `layers.len()` while nothing is created
    lowest: usize,
}

impl Chain {
    /// Build the uncreated chain for `mode`.
    pub fn new(mode: IoMode, limits: &Limits) -> Self {
        let layers: Vec<Box<dyn Layer>> = match mode {
            IoMode::Plain => vec![Box::new(StartLayer), Box::new(EndLayer)],
            IoMode::Ecma48 => vec![
                Box::new(StartLayer),
                Box::new(Ecma48Layer::new()),
                Box::new(EndLayer),
            ],
            IoMode::Telnet => vec![
                Box::new(StartLayer),
                Box::new(Ecma48Layer::new()),
                Box::new(TelnetLayer::new(limits.max_pending)),
                Box::new(EndLayer),
            ],
        };
        let lowest = layers.len();

        Self { layers, lowest }
    }

    /// Layer names from `start` to `end`.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.layers.iter().map(|l| l.name())
    }

    /// True once `start` has been created.
    pub fn is_created(&self) -> bool {
        self.lowest == 0
    }

    /// Create every layer, tail first, stopping at a deferring layer.
    ///
    /// Handshake bytes a layer emits are queued as [`Input::Reply`] ahead
    /// of `Start`.
    pub fn create(&mut self, inputs: &mut Vec<Input>) -> Result<(), Error> {
        let tail = self.layers.len() - 1;
        self.create_from(tail, inputs)
    }

    fn create_from(&mut self, from: usize, inputs: &mut Vec<Input>) -> Result<(), Error> {
        for i in (0..=from).rev() {
            let mut replies = Vec::new();
            let readiness = match self.layers[i].create(&mut replies) {
                Ok(readiness) => readiness,
                Err(e) => {
                    warn!("layer {} create failed: {}", self.layers[i].name(), e);
                    self.destroy();
                    return Err(e);
                }
            };

            self.lowest = i;
            debug!("layer {} created", self.layers[i].name());

            if !replies.is_empty() {
                inputs.push(Input::Reply { below: i + 1, bytes: replies });
            }

            if readiness == Readiness::Deferred {
                debug!("layer {} deferred", self.layers[i].name());
                return Ok(());
            }
        }

        inputs.push(Input::Start);
        Ok(())
    }

    /// Destroy created layers in reverse creation order.
    pub fn destroy(&mut self) {
        for layer in &mut self.layers[self.lowest..] {
            layer.destroy();
            debug!("layer {} destroyed", layer.name());
        }
        self.lowest = self.layers.len();
    }

    /// Feed wire bytes into the tail of the chain.
    ///
    /// Decoded events, protocol replies and `Start` if a deferred layer
    /// resolved are appended to `inputs` in wire order. When a layer
    /// fails, whatever it decoded before the failure is still appended.
    pub fn read(&mut self, data: &[u8], inputs: &mut Vec<Input>) -> Result<usize, Error> {
        let tail = self.layers.len() - 1;
        self.read_at(tail, data, inputs)
    }

    fn read_at(
        &mut self,
        i: usize,
        data: &[u8],
        inputs: &mut Vec<Input>,
    ) -> Result<usize, Error> {
        let mut up = super::Decoded::default();
        let read = self.layers[i].read(data, &mut up);
        let name = self.layers[i].name();
        match &read {
            Ok(n) => trace!("layer {} read {}/{} bytes", name, n, data.len()),
            Err(e) => debug!("layer {} failed after {} items: {}", name, up.items.len(), e),
        }

        for item in up.items {
            match (item, i.checked_sub(1)) {
                (Upward::Event(event), _) => inputs.push(Input::Event(event)),
                (Upward::Reply(bytes), _) => inputs.push(Input::Reply { below: i + 1, bytes }),
                (Upward::Bytes(bytes), Some(prev)) => {
                    self.read_at(prev, &bytes, inputs)?;
                }
                (Upward::Resolved, Some(prev)) => self.create_from(prev, inputs)?,
                (item, None) => warn!("dropping {:?} from first layer", item),
            }
        }

        read
    }

    /// Write protocol bytes below layer `below`, as queued by
    /// [`Input::Reply`].
    pub fn reply<W: Transport>(
        &mut self,
        below: usize,
        bytes: &[u8],
        out: &mut W,
    ) -> Result<(), Error> {
        self.write_from(below, bytes, out)
    }

    /// Write application output through every layer.
    pub fn write<W: Transport>(&mut self, bytes: &[u8], out: &mut W) -> Result<(), Error> {
        self.write_from(0, bytes, out)
    }

    fn write_from<W: Transport>(
        &mut self,
        from: usize,
        bytes: &[u8],
        out: &mut W,
    ) -> Result<(), Error> {
        if bytes.is_empty() {
            return Ok(());
        }

        let mut buf: Cow<'_, [u8]> = Cow::Borrowed(bytes);
        for layer in self.layers.iter_mut().skip(from) {
            let encoded = match layer.encode(&buf) {
                Cow::Borrowed(_) => None,
                Cow::Owned(v) => Some(v),
            };
            if let Some(v) = encoded {
                buf = Cow::Owned(v);
            }
        }

        write_all(out, &buf)
    }

    /// Run an editing operation at the first layer that handles it.
    pub fn send<W: Transport>(
        &mut self,
        op: Output,
        caps: &TermCaps,
        out: &mut W,
    ) -> Result<(), Error> {
        for i in 0..self.layers.len() {
            match self.layers[i].send(op, caps)? {
                Sent::Pass => continue,
                Sent::Nothing => return Ok(()),
                Sent::Bytes(bytes) => return self.write_from(i + 1, &bytes, out),
            }
        }
        Ok(())
    }

    /// First terminal type any layer learned.
    pub fn ttype(&self) -> Option<&str> {
        self.layers.iter().find_map(|l| l.ttype())
    }
}
