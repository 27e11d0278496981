//! VCP feature codes and well-known value names
//!
//! Read-only lookup data shared by the command protocol and the
//! capability parser. The raw integers stay authoritative everywhere;
//! these tables only exist so display layers can render them.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An 8-bit VCP feature code.
///
/// Well-known codes get a variant; 0xE0-0xFF is the manufacturer range
/// and everything else unassigned-but-legal, both passed through
/// opaquely. Equality, ordering and hashing all go by the raw byte so a
/// code survives a round trip through [`FeatureCode::from_raw`] intact.
#[derive(Debug, Clone, Copy)]
pub enum FeatureCode {
    /// New control value present (0x02).
    NewControlValue,
    /// Restore factory defaults (0x04).
    RestoreFactoryDefaults,
    /// Luminance / brightness (0x10).
    Luminance,
    /// Contrast (0x12).
    Contrast,
    /// Select color preset (0x14).
    ColorPreset,
    /// Active control (0x52).
    ActiveControl,
    /// Input source select (0x60).
    InputSource,
    /// Audio speaker volume (0x62).
    AudioVolume,
    /// OSD language (0xCC).
    OsdLanguage,
    /// Display power mode / DPM state (0xD6).
    PowerMode,
    /// MCCS version reported by the monitor (0xDF).
    VcpVersion,
    /// Manufacturer-specific range 0xE0-0xFF.
    Vendor(u8),
    /// Any other code, passed through opaquely.
    Unknown(u8),
}

impl FeatureCode {
    /// Map a raw byte to a feature code. Total; never fails.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x02 => Self::NewControlValue,
            0x04 => Self::RestoreFactoryDefaults,
            0x10 => Self::Luminance,
            0x12 => Self::Contrast,
            0x14 => Self::ColorPreset,
            0x52 => Self::ActiveControl,
            0x60 => Self::InputSource,
            0x62 => Self::AudioVolume,
            0xCC => Self::OsdLanguage,
            0xD6 => Self::PowerMode,
            0xDF => Self::VcpVersion,
            0xE0..=0xFF => Self::Vendor(raw),
            _ => Self::Unknown(raw),
        }
    }

    /// The raw protocol byte.
    pub fn raw(self) -> u8 {
        match self {
            Self::NewControlValue => 0x02,
            Self::RestoreFactoryDefaults => 0x04,
            Self::Luminance => 0x10,
            Self::Contrast => 0x12,
            Self::ColorPreset => 0x14,
            Self::ActiveControl => 0x52,
            Self::InputSource => 0x60,
            Self::AudioVolume => 0x62,
            Self::OsdLanguage => 0xCC,
            Self::PowerMode => 0xD6,
            Self::VcpVersion => 0xDF,
            Self::Vendor(raw) | Self::Unknown(raw) => raw,
        }
    }

    /// Human-readable feature name.
    pub fn name(self) -> &'static str {
        match self {
            Self::NewControlValue => "new control value",
            Self::RestoreFactoryDefaults => "restore factory defaults",
            Self::Luminance => "luminance",
            Self::Contrast => "contrast",
            Self::ColorPreset => "color preset",
            Self::ActiveControl => "active control",
            Self::InputSource => "input source",
            Self::AudioVolume => "audio volume",
            Self::OsdLanguage => "osd language",
            Self::PowerMode => "power mode",
            Self::VcpVersion => "vcp version",
            Self::Vendor(_) => "vendor-specific",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for FeatureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.raw())
    }
}

impl PartialEq for FeatureCode {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for FeatureCode {}

impl PartialOrd for FeatureCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeatureCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw().cmp(&other.raw())
    }
}

impl Hash for FeatureCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw().hash(state);
    }
}

impl From<u8> for FeatureCode {
    fn from(raw: u8) -> Self {
        Self::from_raw(raw)
    }
}

impl Serialize for FeatureCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.raw())
    }
}

impl<'de> Deserialize<'de> for FeatureCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_raw)
    }
}

/// Well-known name for a value of the given feature, if any.
///
/// Only input source, color preset and power mode carry a value table;
/// everything else is numeric.
pub fn value_name(feature: FeatureCode, value: u16) -> Option<&'static str> {
    match feature {
        FeatureCode::InputSource => input_source_name(value),
        FeatureCode::ColorPreset => color_preset_name(value),
        FeatureCode::PowerMode => power_mode_name(value),
        _ => None,
    }
}

fn input_source_name(value: u16) -> Option<&'static str> {
    Some(match value {
        0x01 => "analog1",
        0x02 => "analog2",
        0x03 => "dvi1",
        0x04 => "dvi2",
        0x05 => "composite1",
        0x06 => "composite2",
        0x07 => "svideo1",
        0x08 => "svideo2",
        0x09 => "tuner1",
        0x0A => "tuner2",
        0x0B => "tuner3",
        0x0C => "component1",
        0x0D => "component2",
        0x0E => "component3",
        0x0F => "dp1",
        0x10 => "dp2",
        0x11 => "hdmi1",
        0x12 => "hdmi2",
        _ => return None,
    })
}

fn color_preset_name(value: u16) -> Option<&'static str> {
    Some(match value {
        0x01 => "srgb",
        0x02 => "native",
        0x03 => "4000k",
        0x04 => "5000k",
        0x05 => "6500k",
        0x06 => "7500k",
        0x07 => "8200k",
        0x08 => "9300k",
        0x09 => "10000k",
        0x0A => "11500k",
        0x0B => "user1",
        0x0C => "user2",
        0x0D => "user3",
        _ => return None,
    })
}

fn power_mode_name(value: u16) -> Option<&'static str> {
    Some(match value {
        0x01 => "on",
        0x02 => "standby",
        0x03 => "suspend",
        0x04 => "off_soft",
        0x05 => "off_hard",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip_is_total() {
        for raw in 0..=255u8 {
            assert_eq!(FeatureCode::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn equality_goes_by_raw_byte() {
        assert_eq!(FeatureCode::Luminance, FeatureCode::from_raw(0x10));
        assert_eq!(FeatureCode::from_raw(0xE5), FeatureCode::Vendor(0xE5));
        assert!(FeatureCode::Luminance < FeatureCode::Contrast);
    }

    #[test]
    fn vendor_range_is_recognized() {
        assert!(matches!(FeatureCode::from_raw(0xE0), FeatureCode::Vendor(0xE0)));
        assert!(matches!(FeatureCode::from_raw(0xFF), FeatureCode::Vendor(0xFF)));
        assert!(matches!(FeatureCode::from_raw(0x47), FeatureCode::Unknown(0x47)));
    }

    #[test]
    fn value_tables_cover_the_named_subset() {
        assert_eq!(value_name(FeatureCode::InputSource, 0x11), Some("hdmi1"));
        assert_eq!(value_name(FeatureCode::ColorPreset, 0x05), Some("6500k"));
        assert_eq!(value_name(FeatureCode::PowerMode, 0x01), Some("on"));
        assert_eq!(value_name(FeatureCode::Luminance, 0x11), None);
        assert_eq!(value_name(FeatureCode::InputSource, 0x7F), None);
    }

    #[test]
    fn display_includes_the_raw_code() {
        assert_eq!(FeatureCode::Luminance.to_string(), "luminance (0x10)");
        assert_eq!(
            FeatureCode::from_raw(0xE3).to_string(),
            "vendor-specific (0xE3)"
        );
    }
}
