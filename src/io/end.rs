//! Last layer of every chain, closest to the wire.
//!
//! Incoming bytes pass through untouched. The editing operations get
//! their plainest rendition, good for any terminal: `"\b \b"` to rub out
//! a character and a line break in place of restoring the cursor.

use super::{Decoded, Layer, Output, Sent};
use crate::error::Error;
use crate::term::TermCaps;

/// End layer.
#[derive(Debug, Default)]
pub struct EndLayer;

impl Layer for EndLayer {
    fn name(&self) -> &'static str {
        "end"
    }

    fn read(&mut self, data: &[u8], up: &mut Decoded) -> Result<usize, Error> {
        up.bytes(data);
        Ok(data.len())
    }

    fn send(&mut self, op: Output, _caps: &TermCaps) -> Result<Sent, Error> {
        Ok(match op {
            Output::BackspaceAndDelete => Sent::Bytes(b"\x08 \x08".to_vec()),
            Output::Save => Sent::Nothing,
            Output::RestoreAndDeleteToEol => Sent::Bytes(b"\r\n".to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Upward;

    #[test]
    fn test_read_passes_bytes() {
        let mut layer = EndLayer;
        let mut up = Decoded::default();
        assert_eq!(layer.read(b"abc", &mut up).unwrap(), 3);
        assert_eq!(up.items, [Upward::Bytes(b"abc".to_vec())]);
        assert!(up.replies().is_empty());
    }

    #[test]
    fn test_simple_output_ops() {
        let mut layer = EndLayer;
        let caps = TermCaps::DUMB;
        assert_eq!(
            layer.send(Output::BackspaceAndDelete, &caps),
            Ok(Sent::Bytes(b"\x08 \x08".to_vec()))
        );
        assert_eq!(layer.send(Output::Save, &caps), Ok(Sent::Nothing));
        assert_eq!(
            layer.send(Output::RestoreAndDeleteToEol, &caps),
            Ok(Sent::Bytes(b"\r\n".to_vec()))
        );
    }
}
