//! DDC/CI protocol engine for external monitor control
//!
//! This crate speaks the byte-level DDC/CI (Display Data Channel /
//! Command Interface) protocol to query and change display settings —
//! brightness, contrast, input source, power mode and friends — and
//! parses the capability string a monitor uses to describe which
//! settings it supports.
//!
//! The pieces:
//!
//! - [`packet`] — pure frame codec: request encoding, reply validation,
//!   XOR checksums.
//! - [`monitor`] — [`DdcMonitor`], the blocking command protocol with a
//!   bounded retry policy over an injected [`Transport`].
//! - [`caps`] — capability string parser producing a
//!   [`CapabilityDocument`], recording malformed fragments as errata
//!   instead of failing.
//! - [`vcp`] — feature code and value-name tables.
//!
//! Bus access is not part of this crate: callers supply anything that
//! can move bytes to an already-addressed monitor channel (i2c-dev,
//! IOAVService, a test double) by implementing [`Transport`].

pub mod caps;
pub mod error;
pub mod monitor;
pub mod packet;
pub mod protocol;
pub mod vcp;

pub use caps::{parse_capabilities, CapabilityDocument, ParseErratum, VcpAccess};
pub use error::{AttemptError, CodecError, ProtocolError, TransportError};
pub use monitor::{DdcMonitor, FeatureReading};
pub use protocol::DdcTimings;
pub use vcp::{value_name, FeatureCode};

/// The injected bus capability: move bytes to and from one
/// already-addressed monitor channel.
///
/// DDC/CI is a half-duplex, stateful protocol per device, so a channel
/// must never be driven by two callers at once; [`DdcMonitor`] takes the
/// transport by value and `&mut self` on every operation to keep that
/// true in the type system. Channel acquisition and release stay with
/// the caller.
pub trait Transport {
    /// Push one frame to the monitor.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Pull up to `max_len` bytes of reply. Returning fewer bytes than a
    /// full frame is fine; the codec reports it as truncation and the
    /// command protocol retries.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>, TransportError>;
}
