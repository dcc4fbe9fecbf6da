//! First layer of every chain.
//!
//! By the time `start` is created every layer below it is ready, so the
//! chain reports [`Input::Start`](super::Input::Start) and the session
//! resolves the terminal type, prints the message of the day and shows
//! the first prompt. In plain mode `start` is also the decoder: each raw
//! byte is one typed character.

use super::{Decoded, Layer};
use crate::error::Error;
use crate::shell::event::UiEvent;

/// Start layer.
#[derive(Debug, Default)]
pub struct StartLayer;

impl Layer for StartLayer {
    fn name(&self) -> &'static str {
        "start"
    }

    fn read(&mut self, data: &[u8], up: &mut Decoded) -> Result<usize, Error> {
        for &b in data {
            up.event(UiEvent::byte(b));
        }
        Ok(data.len())
    }
}
