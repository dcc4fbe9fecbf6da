//! Error types for tree construction and session I/O.
//!
//! Problems caused by what a user types (unknown commands, lexer failures,
//! rejected field values) are reported to the peer and never become an
//! [`Error`]. Everything here is either a construction-time contract
//! violation or fatal to the session that raised it.

use alloc::string::String;

/// Crate error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Command path is empty, has leading/trailing/repeated spaces, or
    /// contains whitespace other than a single space between words
    #[error("invalid command path {0:?}")]
    InvalidPath(&'static str),

    /// Two command specs share a path and a mode bit
    #[error("command {path:?} has overlapping modes {modes:#x}")]
    OverlappingModes {
        /// Command path
        path: &'static str,
        /// Bits present in both specs
        modes: u32,
    },

    /// Two command specs share a path but differ in fields or callback
    #[error("command {0:?} redefined with different fields or callback")]
    InconsistentCommand(&'static str),

    /// Field id is zero or has more than one bit set
    #[error("field id {0:#x} is not a single bit")]
    InvalidFieldId(u32),

    /// A command requests a field bit with no matching field spec
    #[error("field {0:#x} is not defined")]
    UnknownField(u32),

    /// The capability resolver knows nothing about this terminal type
    #[error("no capabilities for terminal type {0:?}")]
    UnknownTerminal(String),

    /// Terminal key decoding failed
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Telnet stream violated the protocol
    #[error("telnet: {0}")]
    Telnet(&'static str),

    /// The transport refused output
    #[error("I/O error")]
    Io,
}

/// Terminal-literal decoding failure.
///
/// The decoder does not resynchronise on its own; it returns to its
/// initial state and the caller decides whether to keep the connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// UTF-8 continuation byte where a lead byte was expected
    #[error("stray follow byte")]
    StrayFollowByte,

    /// Byte that can never start a UTF-8 sequence
    #[error("invalid first byte")]
    InvalidFirstByte,

    /// Non-continuation byte inside a multi-byte sequence
    #[error("invalid follow byte")]
    InvalidFollowByte,

    /// Well-formed sequence naming a surrogate or out-of-range value
    #[error("invalid codepoint")]
    InvalidCodepoint,

    /// More numeric parameters than the decoder holds
    #[error("CSI: too many parameters")]
    CsiTooManyParameters,

    /// Function key sequence with more than a key and a modifier
    #[error("CSI ~: too many arguments")]
    TildeTooManyArguments,

    /// CSI final byte the decoder does not know
    #[error("unrecognised CSI")]
    UnrecognisedCsi,
}

impl DecodeError {
    /// True for malformed control sequences, after which the byte stream is
    /// still well-formed text. UTF-8 failures are not recoverable.
    pub fn is_sequence_error(&self) -> bool {
        matches!(
            self,
            DecodeError::CsiTooManyParameters
                | DecodeError::TildeTooManyArguments
                | DecodeError::UnrecognisedCsi
        )
    }
}
