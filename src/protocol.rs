//! DDC/CI protocol constants and timing configuration
//!
//! Wire-level constants for the VESA DDC/CI command/reply structure.
//! The checksum seeds are fixed protocol parameters inherited from the
//! reference implementations that validated them against real hardware;
//! they are not derivable from the published documents alone.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 7-bit I2C address monitors listen on for DDC/CI.
pub const DDC_7BIT_ADDRESS: u8 = 0x37;

/// 8-bit write address (`DDC_7BIT_ADDRESS << 1`); the checksum seed for
/// single-byte command frames.
pub const DEVICE_ADDRESS: u8 = DDC_7BIT_ADDRESS << 1;

/// Host "data address" byte; XORed into the seed for multi-byte command
/// frames.
pub const HOST_ADDRESS: u8 = 0x51;

/// Checksum seed for reply frames, regardless of command.
pub const REPLY_SEED: u8 = 0x50;

/// VCP command opcodes
pub mod op {
    /// Reply opcode echoed by the monitor for a feature read.
    pub const GET_VCP_REPLY: u8 = 0x02;
    /// Set VCP feature: `[SET_VCP, feature, value_hi, value_lo]`.
    pub const SET_VCP: u8 = 0x03;
    /// Request a capability string fragment:
    /// `[CAPS_REQUEST, offset_hi, offset_lo]`.
    pub const CAPS_REQUEST: u8 = 0xF3;
    /// Reply opcode for a capability fragment.
    pub const CAPS_REPLY: u8 = 0xE3;

    /// Get human-readable name for an opcode
    pub fn name(op: u8) -> &'static str {
        match op {
            GET_VCP_REPLY => "GET_VCP_REPLY",
            SET_VCP => "SET_VCP",
            CAPS_REQUEST => "CAPS_REQUEST",
            CAPS_REPLY => "CAPS_REPLY",
            _ => "UNKNOWN",
        }
    }
}

/// Total size of a feature-read reply frame:
/// source + length + 8 payload bytes + checksum.
pub const VCP_REPLY_SIZE: usize = 11;

/// Maximum capability-string data bytes per fragment reply.
pub const CAPS_FRAGMENT_SIZE: usize = 32;

/// Total size of a full capability fragment reply frame:
/// source + length + (opcode + 2 offset bytes + data) + checksum.
pub const CAPS_REPLY_SIZE: usize = 3 + 3 + CAPS_FRAGMENT_SIZE;

/// Default timing parameters
pub mod timing {
    /// Pause before each write, ms.
    pub const WRITE_DELAY_MS: u64 = 10;
    /// Pause between write and read, ms.
    pub const READ_DELAY_MS: u64 = 50;
    /// Pause between failed attempts, ms.
    pub const RETRY_DELAY_MS: u64 = 0;
    /// Attempts per logical operation.
    pub const MAX_ATTEMPTS: u32 = 4;
    /// Fragment cap while assembling a capability string.
    pub const MAX_CAPS_FRAGMENTS: u32 = 64;
}

/// Injected timing and retry policy for one monitor channel.
///
/// DDC/CI links are noisy and monitors vary wildly in how fast they
/// answer, so none of this is hard-coded; callers tune it per device.
/// Serde-derived so an out-of-scope configuration layer can load it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdcTimings {
    /// Pause before each write.
    pub write_delay: Duration,
    /// Pause between write and read.
    pub read_delay: Duration,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
    /// Attempts per logical operation (minimum 1).
    pub max_attempts: u32,
    /// Fragment cap while assembling a capability string.
    pub max_caps_fragments: u32,
}

impl Default for DdcTimings {
    fn default() -> Self {
        Self {
            write_delay: Duration::from_millis(timing::WRITE_DELAY_MS),
            read_delay: Duration::from_millis(timing::READ_DELAY_MS),
            retry_delay: Duration::from_millis(timing::RETRY_DELAY_MS),
            max_attempts: timing::MAX_ATTEMPTS,
            max_caps_fragments: timing::MAX_CAPS_FRAGMENTS,
        }
    }
}

impl DdcTimings {
    /// Timing profile with no sleeps, for tests and simulated transports.
    pub fn immediate() -> Self {
        Self {
            write_delay: Duration::ZERO,
            read_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}
