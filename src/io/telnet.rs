//! Telnet layer.
//!
//! Negotiates ECHO and SUPPRESS-GO-AHEAD on our side, SUPPRESS-GO-AHEAD
//! and TERMINAL-TYPE on the client's, and strips the protocol from the
//! data stream. Creation is deferred until the terminal type is known, or
//! until it is clear the client will not say.
//!
//! Option state follows a reduced form of RFC 1143: we never ask to turn
//! an option off, so each side of an option is `No`, `WantYes` or `Yes`.

use alloc::borrow::Cow;
use alloc::vec::Vec;

use log::{debug, trace, warn};

use super::{Decoded, Layer, Readiness, Upward};
use crate::error::Error;
use crate::shell::event::UiEvent;

const SE: u8 = 240;
const NOP: u8 = 241;
const DM: u8 = 242;
const BRK: u8 = 243;
const IP: u8 = 244;
const AO: u8 = 245;
const AYT: u8 = 246;
const EC: u8 = 247;
const EL: u8 = 248;
const GA: u8 = 249;
const SB: u8 = 250;
const WILL: u8 = 251;
const WONT: u8 = 252;
const DO: u8 = 253;
const DONT: u8 = 254;
const IAC: u8 = 255;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;
const OPT_TTYPE: u8 = 24;

const TTYPE_IS: u8 = 0;
const TTYPE_SEND: u8 = 1;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Longest subnegotiation accepted
const SB_MAX: usize = 64;

/// Longest terminal type kept (RFC 1091)
const TTYPE_MAX: usize = 40;

/// One side of one option.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Q {
    No,
    WantYes,
    Yes,
}

/// Options we track, each with our side and the client's side.
#[derive(Debug)]
struct Options {
    us: [Q; 3],
    him: [Q; 3],
}

impl Options {
    fn slot(opt: u8) -> Option<usize> {
        match opt {
            OPT_ECHO => Some(0),
            OPT_SGA => Some(1),
            OPT_TTYPE => Some(2),
            _ => None,
        }
    }

    fn we_support(opt: u8) -> bool {
        matches!(opt, OPT_ECHO | OPT_SGA)
    }

    fn he_may(opt: u8) -> bool {
        matches!(opt, OPT_SGA | OPT_TTYPE)
    }
}

/// Parser position in the incoming stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Data,
    Cr,
    Iac,
    Verb(u8),
    Sb,
    SbData,
    SbIac,
}

/// Progress of terminal type discovery.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Discovery {
    /// Client has not answered `DO TTYPE`
    Unknown,
    /// `SB TTYPE SEND` sent, awaiting `IS`
    Requested,
    /// Resolved, with or without a name
    Done,
}

/// Telnet layer.
#[derive(Debug)]
pub struct TelnetLayer {
    state: State,
    options: Options,
    discovery: Discovery,
    sb_opt: u8,
    sb: heapless::Vec<u8, SB_MAX>,
    ttype: heapless::String<TTYPE_MAX>,
    pending: Vec<u8>,
    max_pending: usize,
}

impl TelnetLayer {
    /// Create the layer, buffering at most `max_pending` bytes of
    /// application data while the terminal type is outstanding.
    pub fn new(max_pending: usize) -> Self {
        Self {
            state: State::Data,
            options: Options {
                us: [Q::No; 3],
                him: [Q::No; 3],
            },
            discovery: Discovery::Unknown,
            sb_opt: 0,
            sb: heapless::Vec::new(),
            ttype: heapless::String::new(),
            pending: Vec::new(),
            max_pending,
        }
    }

    fn resolve(&mut self, up: &mut Decoded) {
        if self.discovery == Discovery::Done {
            return;
        }
        self.discovery = Discovery::Done;

        debug!(
            "telnet: terminal type {:?}",
            if self.ttype.is_empty() { "(none)" } else { self.ttype.as_str() }
        );
        up.items.push(Upward::Resolved);
        let pending = core::mem::take(&mut self.pending);
        up.bytes(&pending);
    }

    fn data(&mut self, b: u8, up: &mut Decoded) {
        match self.discovery {
            Discovery::Done => up.bytes(&[b]),
            Discovery::Unknown => {
                trace!("telnet: data before TTYPE answer, falling back");
                self.resolve(up);
                up.bytes(&[b]);
            }
            Discovery::Requested => {
                if self.pending.len() < self.max_pending {
                    self.pending.push(b);
                } else {
                    warn!("telnet: {} bytes pending, giving up on TTYPE", self.max_pending);
                    self.resolve(up);
                    up.bytes(&[b]);
                }
            }
        }
    }

    fn command(&mut self, b: u8, up: &mut Decoded) -> Result<State, Error> {
        Ok(match b {
            IAC => {
                self.data(IAC, up);
                State::Data
            }
            WILL | WONT | DO | DONT => State::Verb(b),
            SB => State::Sb,
            EC => {
                up.event(UiEvent::Backspace);
                State::Data
            }
            EL => {
                up.event(UiEvent::DeleteLine);
                State::Data
            }
            IP => {
                up.event(UiEvent::Cancel);
                State::Data
            }
            NOP | DM | BRK | AO | AYT | GA | SE => {
                trace!("telnet: ignoring command {}", b);
                State::Data
            }
            _ => return Err(Error::Telnet("unknown command")),
        })
    }

    fn negotiate(&mut self, verb: u8, opt: u8, up: &mut Decoded) {
        trace!("telnet: received {} {}", verb_name(verb), opt);
        let slot = Options::slot(opt);

        match verb {
            WILL => match slot.map(|i| (i, self.options.him[i])) {
                Some((_, Q::Yes)) => {}
                Some((i, q)) if Options::he_may(opt) => {
                    self.options.him[i] = Q::Yes;
                    if q == Q::No {
                        reply(up, DO, opt);
                    }
                    if opt == OPT_TTYPE && self.discovery == Discovery::Unknown {
                        up.reply(&[IAC, SB, OPT_TTYPE, TTYPE_SEND, IAC, SE]);
                        self.discovery = Discovery::Requested;
                    }
                }
                _ => reply(up, DONT, opt),
            },

            WONT => {
                if let Some(i) = slot {
                    if self.options.him[i] == Q::Yes {
                        reply(up, DONT, opt);
                    }
                    self.options.him[i] = Q::No;
                }
                if opt == OPT_TTYPE {
                    self.resolve(up);
                }
            }

            DO => match slot.map(|i| (i, self.options.us[i])) {
                Some((_, Q::Yes)) => {}
                Some((i, q)) if Options::we_support(opt) => {
                    self.options.us[i] = Q::Yes;
                    if q == Q::No {
                        reply(up, WILL, opt);
                    }
                }
                _ => reply(up, WONT, opt),
            },

            _ => {
                if let Some(i) = slot {
                    if self.options.us[i] == Q::Yes {
                        reply(up, WONT, opt);
                    }
                    self.options.us[i] = Q::No;
                }
            }
        }
    }

    fn subnegotiation(&mut self, up: &mut Decoded) {
        if self.sb_opt != OPT_TTYPE || self.sb.first() != Some(&TTYPE_IS) {
            trace!("telnet: ignoring subnegotiation for option {}", self.sb_opt);
            return;
        }

        self.ttype.clear();
        for &b in self.sb[1..].iter().filter(|b| b.is_ascii_graphic()) {
            if self.ttype.push(char::from(b.to_ascii_lowercase())).is_err() {
                break;
            }
        }

        if self.discovery == Discovery::Requested {
            self.resolve(up);
        }
    }

    fn step(&mut self, b: u8, up: &mut Decoded) -> Result<(), Error> {
        self.state = match self.state {
            State::Data | State::Cr if b == IAC => State::Iac,
            State::Cr if b == 0 => State::Data,
            State::Data | State::Cr => {
                self.data(b, up);
                if b == CR { State::Cr } else { State::Data }
            }

            State::Iac => self.command(b, up)?,

            State::Verb(verb) => {
                self.negotiate(verb, b, up);
                State::Data
            }

            State::Sb => {
                self.sb_opt = b;
                self.sb.clear();
                State::SbData
            }
            State::SbData if b == IAC => State::SbIac,
            State::SbData => {
                self.sb
                    .push(b)
                    .map_err(|_| Error::Telnet("subnegotiation too long"))?;
                State::SbData
            }
            State::SbIac if b == SE => {
                self.subnegotiation(up);
                State::Data
            }
            State::SbIac if b == IAC => {
                self.sb
                    .push(IAC)
                    .map_err(|_| Error::Telnet("subnegotiation too long"))?;
                State::SbData
            }
            State::SbIac => return Err(Error::Telnet("unterminated subnegotiation")),
        };
        Ok(())
    }
}

fn reply(up: &mut Decoded, verb: u8, opt: u8) {
    trace!("telnet: sending {} {}", verb_name(verb), opt);
    up.reply(&[IAC, verb, opt]);
}

fn verb_name(verb: u8) -> &'static str {
    match verb {
        WILL => "WILL",
        WONT => "WONT",
        DO => "DO",
        _ => "DONT",
    }
}

impl Layer for TelnetLayer {
    fn name(&self) -> &'static str {
        "telnet"
    }

    fn create(&mut self, replies: &mut Vec<u8>) -> Result<Readiness, Error> {
        replies.extend_from_slice(&[
            IAC, WILL, OPT_ECHO,
            IAC, WILL, OPT_SGA,
            IAC, DO, OPT_SGA,
            IAC, DO, OPT_TTYPE,
        ]);
        self.options.us = [Q::WantYes, Q::WantYes, Q::No];
        self.options.him = [Q::No, Q::WantYes, Q::WantYes];
        debug!("telnet: negotiating");

        Ok(Readiness::Deferred)
    }

    fn read(&mut self, data: &[u8], up: &mut Decoded) -> Result<usize, Error> {
        for &b in data {
            self.step(b, up)?;
        }
        Ok(data.len())
    }

    fn encode<'b>(&mut self, bytes: &'b [u8]) -> Cow<'b, [u8]> {
        if !bytes.iter().any(|&b| matches!(b, IAC | CR | LF)) {
            return Cow::Borrowed(bytes);
        }

        let mut out = Vec::with_capacity(bytes.len() + 8);
        let mut prev = 0;
        for (i, &b) in bytes.iter().enumerate() {
            match b {
                IAC => out.extend_from_slice(&[IAC, IAC]),
                LF if prev != CR => out.extend_from_slice(b"\r\n"),
                CR if bytes.get(i + 1) != Some(&LF) => out.extend_from_slice(b"\r\0"),
                _ => out.push(b),
            }
            prev = b;
        }
        Cow::Owned(out)
    }

    fn ttype(&self) -> Option<&str> {
        if self.discovery == Discovery::Done && !self.ttype.is_empty() {
            Some(self.ttype.as_str())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn created() -> TelnetLayer {
        let mut layer = TelnetLayer::new(8);
        let mut replies = Vec::new();
        assert_eq!(layer.create(&mut replies).unwrap(), Readiness::Deferred);
        assert_eq!(
            replies,
            [IAC, WILL, OPT_ECHO, IAC, WILL, OPT_SGA, IAC, DO, OPT_SGA, IAC, DO, OPT_TTYPE]
        );
        layer
    }

    fn read(layer: &mut TelnetLayer, data: &[u8]) -> Decoded {
        let mut up = Decoded::default();
        assert_eq!(layer.read(data, &mut up).unwrap(), data.len());
        up
    }

    fn resolved(layer: &mut TelnetLayer, name: &[u8]) {
        read(layer, &[IAC, WILL, OPT_TTYPE]);
        let mut sb = vec![IAC, SB, OPT_TTYPE, TTYPE_IS];
        sb.extend_from_slice(name);
        sb.extend_from_slice(&[IAC, SE]);
        read(layer, &sb);
    }

    // ========================================
    // Negotiation
    // ========================================

    #[test]
    fn test_ttype_negotiation() {
        let mut layer = created();

        let up = read(&mut layer, &[IAC, WILL, OPT_TTYPE]);
        assert_eq!(up.items, [Upward::Reply(vec![IAC, SB, OPT_TTYPE, TTYPE_SEND, IAC, SE])]);

        let mut sb = vec![IAC, SB, OPT_TTYPE, TTYPE_IS];
        sb.extend_from_slice(b"XTERM-256color");
        sb.extend_from_slice(&[IAC, SE]);
        let up = read(&mut layer, &sb);
        assert_eq!(up.items, [Upward::Resolved]);
        assert_eq!(layer.ttype(), Some("xterm-256color"));
    }

    #[test]
    fn test_acknowledgements_are_not_answered() {
        let mut layer = created();
        let up = read(&mut layer, &[IAC, DO, OPT_ECHO, IAC, DO, OPT_SGA, IAC, WILL, OPT_SGA]);
        assert!(up.replies().is_empty());
    }

    #[test]
    fn test_unsupported_options_refused() {
        let mut layer = created();
        let up = read(&mut layer, &[IAC, DO, 31, IAC, WILL, 32]);
        assert_eq!(up.replies(), [IAC, WONT, 31, IAC, DONT, 32]);
    }

    #[test]
    fn test_no_negotiation_loop() {
        let mut layer = created();
        read(&mut layer, &[IAC, DO, OPT_ECHO]);
        let up = read(&mut layer, &[IAC, DO, OPT_ECHO]);
        assert!(up.replies().is_empty());

        let up = read(&mut layer, &[IAC, DONT, OPT_ECHO]);
        assert_eq!(up.replies(), [IAC, WONT, OPT_ECHO]);
        let up = read(&mut layer, &[IAC, DONT, OPT_ECHO]);
        assert!(up.replies().is_empty());
    }

    #[test]
    fn test_wont_ttype_falls_back() {
        let mut layer = created();
        let up = read(&mut layer, &[IAC, WONT, OPT_TTYPE]);
        assert_eq!(up.items, [Upward::Resolved]);
        assert_eq!(layer.ttype(), None);
    }

    // ========================================
    // Data
    // ========================================

    #[test]
    fn test_data_before_will_ttype_falls_back() {
        let mut layer = created();
        let up = read(&mut layer, b"ab");
        assert_eq!(up.items, [Upward::Resolved, Upward::Bytes(b"ab".to_vec())]);
    }

    #[test]
    fn test_data_buffered_while_ttype_outstanding() {
        let mut layer = created();
        read(&mut layer, &[IAC, WILL, OPT_TTYPE]);
        let up = read(&mut layer, b"show");
        assert!(up.items.is_empty());

        let mut sb = vec![IAC, SB, OPT_TTYPE, TTYPE_IS];
        sb.extend_from_slice(b"vt100");
        sb.extend_from_slice(&[IAC, SE]);
        let up = read(&mut layer, &sb);
        assert_eq!(up.items, [Upward::Resolved, Upward::Bytes(b"show".to_vec())]);
    }

    #[test]
    fn test_pending_overflow_forces_fallback() {
        let mut layer = created();
        read(&mut layer, &[IAC, WILL, OPT_TTYPE]);
        let up = read(&mut layer, b"123456789");
        assert_eq!(
            up.items,
            [Upward::Resolved, Upward::Bytes(b"123456789".to_vec())]
        );
        assert_eq!(layer.ttype(), None);
    }

    #[test]
    fn test_iac_iac_split_across_reads() {
        let mut layer = created();
        resolved(&mut layer, b"xterm");

        let first = read(&mut layer, &[b'a', IAC]);
        let second = read(&mut layer, &[IAC, b'b']);
        assert_eq!(first.items, [Upward::Bytes(b"a".to_vec())]);
        assert_eq!(second.items, [Upward::Bytes(vec![IAC, b'b'])]);
    }

    #[test]
    fn test_replies_interleave_with_data() {
        let mut layer = created();
        resolved(&mut layer, b"xterm");
        let up = read(&mut layer, &[b'a', IAC, DO, 31, b'b']);
        assert_eq!(
            up.items,
            [
                Upward::Bytes(b"a".to_vec()),
                Upward::Reply(vec![IAC, WONT, 31]),
                Upward::Bytes(b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn test_cr_nul_is_cr() {
        let mut layer = created();
        resolved(&mut layer, b"xterm");
        let up = read(&mut layer, b"a\r\0b\r\n");
        assert_eq!(up.items, [Upward::Bytes(b"a\rb\r\n".to_vec())]);
    }

    #[test]
    fn test_editing_commands_become_events() {
        let mut layer = created();
        resolved(&mut layer, b"xterm");
        let up = read(&mut layer, &[IAC, EC, IAC, EL, IAC, IP, IAC, NOP]);
        assert_eq!(
            up.items,
            [
                Upward::Event(UiEvent::Backspace),
                Upward::Event(UiEvent::DeleteLine),
                Upward::Event(UiEvent::Cancel),
            ]
        );
    }

    #[test]
    fn test_subnegotiation_split_across_reads() {
        let mut layer = created();
        read(&mut layer, &[IAC, WILL, OPT_TTYPE]);
        read(&mut layer, &[IAC, SB, OPT_TTYPE, TTYPE_IS, b'a', b'n']);
        let up = read(&mut layer, &[b's', b'i', IAC, SE]);
        assert_eq!(up.items, [Upward::Resolved]);
        assert_eq!(layer.ttype(), Some("ansi"));
    }

    // ========================================
    // Protocol errors
    // ========================================

    #[test]
    fn test_unknown_command_is_error() {
        let mut layer = created();
        resolved(&mut layer, b"xterm");
        let mut up = Decoded::default();
        assert_eq!(
            layer.read(&[b'x', IAC, 17, b'y'], &mut up),
            Err(Error::Telnet("unknown command"))
        );
        assert_eq!(up.items, [Upward::Bytes(b"x".to_vec())]);
    }

    #[test]
    fn test_oversized_subnegotiation_is_error() {
        let mut layer = created();
        let mut data = vec![IAC, SB, OPT_TTYPE];
        data.extend(core::iter::repeat_n(b'x', SB_MAX + 1));
        let mut up = Decoded::default();
        assert!(matches!(layer.read(&data, &mut up), Err(Error::Telnet(_))));
    }

    // ========================================
    // Output
    // ========================================

    #[test]
    fn test_encode() {
        let mut layer = TelnetLayer::new(8);
        assert!(matches!(layer.encode(b"plain"), Cow::Borrowed(_)));
        assert_eq!(&*layer.encode(b"a\nb"), b"a\r\nb");
        assert_eq!(&*layer.encode(b"a\r\nb"), b"a\r\nb");
        assert_eq!(&*layer.encode(b"a\rb"), b"a\r\0b");
        assert_eq!(&*layer.encode(&[IAC]), &[IAC, IAC]);
    }
}
