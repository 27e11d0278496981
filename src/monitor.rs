//! Command protocol: logical operations over one monitor channel
//!
//! Turns `get_feature` / `set_feature` / `get_capability_string` into
//! framed round-trips over the injected [`Transport`], applying the
//! injected timing and retry policy. Each operation blocks the calling
//! thread for its full write/sleep/read/retry sequence; exclusive access
//! to the channel is enforced by `&mut self`.

use std::thread;

use tracing::{debug, trace};

use crate::caps::{parse_capabilities, CapabilityDocument};
use crate::error::{AttemptError, CodecError, ProtocolError, TransportError};
use crate::packet::{self, VcpReply};
use crate::protocol::{
    DdcTimings, CAPS_FRAGMENT_SIZE, CAPS_REPLY_SIZE, DEVICE_ADDRESS, VCP_REPLY_SIZE,
};
use crate::vcp::FeatureCode;
use crate::Transport;

/// Current and maximum value of a feature, taken from a single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureReading {
    /// Current value. The raw integer is authoritative; see
    /// [`crate::vcp::value_name`] for display aliases.
    pub current: u16,
    /// Maximum value reported in the same reply.
    pub maximum: u16,
}

/// One monitor channel speaking DDC/CI.
///
/// Owns the transport for that channel; distinct monitors are fully
/// independent and may live on distinct threads.
pub struct DdcMonitor<T: Transport> {
    transport: T,
    timings: DdcTimings,
    device_address: u8,
}

impl<T: Transport> DdcMonitor<T> {
    /// Wrap a transport with default timings.
    pub fn new(transport: T) -> Self {
        Self::with_timings(transport, DdcTimings::default())
    }

    /// Wrap a transport with caller-tuned timings.
    pub fn with_timings(transport: T, timings: DdcTimings) -> Self {
        Self {
            transport,
            timings,
            device_address: DEVICE_ADDRESS,
        }
    }

    /// The timing and retry policy in effect.
    pub fn timings(&self) -> &DdcTimings {
        &self.timings
    }

    /// Give the transport back, consuming the channel.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Read a feature's current and maximum value.
    pub fn get_feature(&mut self, code: FeatureCode) -> Result<FeatureReading, ProtocolError> {
        let request = packet::get_vcp_request(code.raw());
        let frame = packet::encode_request(&request, self.device_address);
        self.with_retries(|m| {
            let payload = m.exchange(&frame, VCP_REPLY_SIZE)?;
            let reply = VcpReply::parse(&payload)?;
            if reply.feature != code.raw() {
                return Err(CodecError::UnexpectedReply {
                    expected: code.raw(),
                    got: reply.feature,
                }
                .into());
            }
            Ok(FeatureReading {
                current: reply.current,
                maximum: reply.maximum,
            })
        })
    }

    /// Write a feature value. No reply is defined for a set, so only
    /// transport failures are retryable.
    pub fn set_feature(&mut self, code: FeatureCode, value: u16) -> Result<(), ProtocolError> {
        let request = packet::set_vcp_request(code.raw(), value);
        let frame = packet::encode_request(&request, self.device_address);
        self.with_retries(|m| m.write_frame(&frame).map_err(AttemptError::from))
    }

    /// Flip a feature between two values: if the current value is
    /// `first`, set `second`, otherwise set `first`. Returns the value
    /// read and the value written.
    pub fn toggle_feature(
        &mut self,
        code: FeatureCode,
        first: u16,
        second: u16,
    ) -> Result<(u16, u16), ProtocolError> {
        let current = self.get_feature(code)?.current;
        let target = if current == first { second } else { first };
        self.set_feature(code, target)?;
        Ok((current, target))
    }

    /// Fetch the monitor's raw capability string.
    ///
    /// Capability strings exceed one reply frame, so this walks the
    /// string in fragments: each request names a byte offset and the
    /// monitor echoes it back with up to [`CAPS_FRAGMENT_SIZE`] bytes of
    /// data. A short fragment ends the string; exceeding the configured
    /// fragment cap fails fast against a misbehaving monitor.
    pub fn get_capability_string(&mut self) -> Result<String, ProtocolError> {
        let mut assembled: Vec<u8> = Vec::new();
        let mut offset: u16 = 0;
        let mut fragments: u32 = 0;
        loop {
            if fragments >= self.timings.max_caps_fragments {
                return Err(ProtocolError::CapabilityStringTooLong {
                    max_fragments: self.timings.max_caps_fragments,
                });
            }
            let request = packet::caps_request(offset);
            let frame = packet::encode_request(&request, self.device_address);
            let data = self.with_retries(|m| {
                let payload = m.exchange(&frame, CAPS_REPLY_SIZE)?;
                Ok(packet::parse_caps_fragment(&payload, offset)?.to_vec())
            })?;
            fragments += 1;
            trace!(offset, len = data.len(), "caps fragment");
            let done = data.len() < CAPS_FRAGMENT_SIZE;
            offset = offset.wrapping_add(data.len() as u16);
            assembled.extend_from_slice(&data);
            if done {
                break;
            }
        }
        while assembled.last() == Some(&0) {
            assembled.pop();
        }
        Ok(String::from_utf8_lossy(&assembled).into_owned())
    }

    /// Fetch and parse the capability string in one call.
    pub fn get_capabilities(&mut self) -> Result<CapabilityDocument, ProtocolError> {
        let raw = self.get_capability_string()?;
        Ok(parse_capabilities(&raw))
    }

    /// Pause, then push one frame to the bus.
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        thread::sleep(self.timings.write_delay);
        debug!("write {:02X?}", frame);
        self.transport.write(frame)
    }

    /// One full write/sleep/read/decode cycle.
    fn exchange(&mut self, frame: &[u8], reply_len: usize) -> Result<Vec<u8>, AttemptError> {
        self.write_frame(frame)?;
        thread::sleep(self.timings.read_delay);
        let raw = self.transport.read(reply_len)?;
        trace!("read {:02X?}", raw);
        Ok(packet::decode_reply(&raw)?.to_vec())
    }

    /// Run one attempt closure under the bounded retry policy.
    ///
    /// Transport and codec failures are line noise and retried up to the
    /// attempt bound; an unsupported-feature result code is a firm answer
    /// from the monitor and returned immediately.
    fn with_retries<R>(
        &mut self,
        mut attempt: impl FnMut(&mut Self) -> Result<R, AttemptError>,
    ) -> Result<R, ProtocolError> {
        let max = self.timings.max_attempts.max(1);
        let mut n = 0;
        loop {
            n += 1;
            match attempt(&mut *self) {
                Ok(value) => return Ok(value),
                Err(AttemptError::Codec(CodecError::UnsupportedFeature { code })) => {
                    return Err(ProtocolError::UnsupportedFeature(FeatureCode::from_raw(code)));
                }
                Err(e) => {
                    debug!("attempt {n}/{max} failed: {e}");
                    if n >= max {
                        return Err(ProtocolError::Unresponsive {
                            attempts: max,
                            last: e,
                        });
                    }
                }
            }
            thread::sleep(self.timings.retry_delay);
        }
    }
}
