//! DDC/CI frame codec
//!
//! Pure functions over byte sequences: build outbound request frames and
//! validate/decode inbound reply frames. No I/O, no retries — the command
//! protocol in [`crate::monitor`] owns those.
//!
//! Request frames (as written to the bus, the addressing byte itself is
//! carried by the transport):
//!
//! ```text
//! [ 0x80 | (n + 1), n, payload[0..n], checksum ]
//! ```
//!
//! Reply frames (as read back, the monitor prepends its source address):
//!
//! ```text
//! [ source, 0x80 | n, payload[0..n], checksum ]
//! ```
//!
//! The checksum byte is the XOR of a seed and every preceding byte of the
//! frame. Requests seed with the device write address for a single-byte
//! payload and with `address ^ HOST_ADDRESS` otherwise; replies always
//! seed with [`REPLY_SEED`].

use crate::error::CodecError;
use crate::protocol::{op, HOST_ADDRESS, REPLY_SEED};

/// Running XOR of `seed` and every byte in `bytes`.
pub fn checksum(seed: u8, bytes: &[u8]) -> u8 {
    bytes.iter().fold(seed, |acc, &b| acc ^ b)
}

/// Checksum seed for a request frame.
///
/// Single-byte payloads (simple gets) seed with the bare device address;
/// anything longer folds in the host data address. The split is inherited
/// from the reference implementations and must not be re-derived.
pub fn request_seed(device_address: u8, payload_len: usize) -> u8 {
    if payload_len == 1 {
        device_address
    } else {
        device_address ^ HOST_ADDRESS
    }
}

/// Build a request frame around `payload` for the monitor at
/// `device_address` (8-bit write address).
///
/// Payloads of 1 to 126 bytes produce distinct length prefixes; the codec
/// never inspects payload contents.
pub fn encode_request(payload: &[u8], device_address: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(0x80 | (payload.len() as u8 + 1));
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum(request_seed(device_address, payload.len()), &frame));
    frame
}

/// Validate a reply frame and return its payload slice.
///
/// Trailing bytes past the declared frame length are ignored so callers
/// can hand in fixed-size read buffers unmodified.
pub fn decode_reply(raw: &[u8]) -> Result<&[u8], CodecError> {
    if raw.len() < 3 {
        return Err(CodecError::Truncated {
            expected: 3,
            got: raw.len(),
        });
    }
    let n = (raw[1] & 0x7F) as usize;
    let total = n + 3;
    if raw.len() < total {
        return Err(CodecError::Truncated {
            expected: total,
            got: raw.len(),
        });
    }
    let frame = &raw[..total];
    let expected = checksum(REPLY_SEED, &frame[..total - 1]);
    let got = frame[total - 1];
    if expected != got {
        return Err(CodecError::ChecksumMismatch { expected, got });
    }
    Ok(&frame[2..2 + n])
}

/// Request payload for a feature read: the bare feature code.
pub fn get_vcp_request(feature: u8) -> [u8; 1] {
    [feature]
}

/// Request payload for a feature write.
pub fn set_vcp_request(feature: u8, value: u16) -> [u8; 4] {
    let [hi, lo] = value.to_be_bytes();
    [op::SET_VCP, feature, hi, lo]
}

/// Request payload for a capability string fragment at `offset`.
pub fn caps_request(offset: u16) -> [u8; 3] {
    let [hi, lo] = offset.to_be_bytes();
    [op::CAPS_REQUEST, hi, lo]
}

/// Decoded payload of a feature-read reply.
///
/// Payload layout (after [`decode_reply`] strips the framing):
/// opcode echo, result code, feature echo, VCP type, then big-endian
/// maximum and current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpReply {
    /// Feature code echoed by the monitor.
    pub feature: u8,
    /// Current value.
    pub current: u16,
    /// Maximum value from the same reply.
    pub maximum: u16,
}

impl VcpReply {
    /// Minimum payload length for a feature-read reply.
    pub const MIN_LEN: usize = 8;

    /// Parse a decoded reply payload.
    pub fn parse(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < Self::MIN_LEN {
            return Err(CodecError::Truncated {
                expected: Self::MIN_LEN,
                got: payload.len(),
            });
        }
        if payload[0] != op::GET_VCP_REPLY {
            return Err(CodecError::UnexpectedReply {
                expected: op::GET_VCP_REPLY,
                got: payload[0],
            });
        }
        match payload[1] {
            0x00 => {}
            0x01 => return Err(CodecError::UnsupportedFeature { code: payload[2] }),
            rc => {
                return Err(CodecError::UnexpectedReply {
                    expected: 0x00,
                    got: rc,
                })
            }
        }
        Ok(Self {
            feature: payload[2],
            maximum: u16::from_be_bytes([payload[4], payload[5]]),
            current: u16::from_be_bytes([payload[6], payload[7]]),
        })
    }
}

/// Parse a capability fragment payload, checking the opcode and offset
/// echo, and return the fragment data.
pub fn parse_caps_fragment(payload: &[u8], expected_offset: u16) -> Result<&[u8], CodecError> {
    if payload.len() < 3 {
        return Err(CodecError::Truncated {
            expected: 3,
            got: payload.len(),
        });
    }
    if payload[0] != op::CAPS_REPLY {
        return Err(CodecError::UnexpectedReply {
            expected: op::CAPS_REPLY,
            got: payload[0],
        });
    }
    let offset = u16::from_be_bytes([payload[1], payload[2]]);
    if offset != expected_offset {
        return Err(CodecError::OffsetMismatch {
            expected: expected_offset,
            got: offset,
        });
    }
    Ok(&payload[3..])
}
