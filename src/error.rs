//! Error types for the DDC/CI engine

use thiserror::Error;

use crate::vcp::FeatureCode;

/// Errors reported by the injected bus transport.
///
/// The transport is an external collaborator; everything it reports is
/// treated as retryable by the command protocol, up to the configured
/// attempt bound.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("Communication timeout")]
    Timeout,
}

/// Errors from validating or decoding a reply frame.
///
/// The codec is pure and never retries; the command protocol decides
/// which of these are worth another attempt on a noisy link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Reply truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{got:02X}")]
    ChecksumMismatch { expected: u8, got: u8 },

    #[error("Unexpected reply: expected 0x{expected:02X}, got 0x{got:02X}")]
    UnexpectedReply { expected: u8, got: u8 },

    #[error("Fragment offset mismatch: expected {expected}, got {got}")]
    OffsetMismatch { expected: u16, got: u16 },

    #[error("Monitor reports feature 0x{code:02X} as unsupported")]
    UnsupportedFeature { code: u8 },
}

/// Outcome of a single write/sleep/read/decode cycle.
///
/// Kept as a distinct type so the retry loop can match on the failure
/// class instead of nesting conditionals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Final, user-visible errors from the command protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The retry budget was exhausted without a valid reply.
    #[error("monitor unresponsive after {attempts} attempts")]
    Unresponsive {
        attempts: u32,
        #[source]
        last: AttemptError,
    },

    /// The monitor kept producing full capability fragments past the
    /// configured bound; fail fast instead of looping forever.
    #[error("capability string exceeded {max_fragments} fragments")]
    CapabilityStringTooLong { max_fragments: u32 },

    /// The monitor answered, firmly, that it does not implement this
    /// feature. Not retried.
    #[error("feature {0} not supported by this monitor")]
    UnsupportedFeature(FeatureCode),
}
