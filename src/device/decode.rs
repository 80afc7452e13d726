//! Decoding of raw characteristic values into typed readings.
//!
//! All values are little-endian. Signed fields are the two's-complement
//! reinterpretation of the raw 16-bit pattern.

use crate::device::constants::{BATTERY_PAYLOAD_LEN, BUTTON_PAYLOAD_LEN, QUATERNIONS_PAYLOAD_LEN, TEMPERATURE_PAYLOAD_LEN};
use crate::device::types::{EventKind, Orientation, Reading};
use crate::error::DecodeError;

fn require(field: &'static str, data: &[u8], expected: usize) -> Result<(), DecodeError> {
    if data.len() < expected {
        return Err(DecodeError::Truncated { field, expected, actual: data.len() });
    }
    Ok(())
}

fn signed16(data: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([data[offset], data[offset + 1]])
}

/// ```text
/// [0-1] : y
/// [2-3] : x (negated)
/// [4-5] : roll (negated)
/// [6-7] : pitch
/// ```
pub fn decode_orientation(data: &[u8]) -> Result<Orientation, DecodeError> {
    require("quaternions", data, QUATERNIONS_PAYLOAD_LEN)?;

    // i16::MIN has no positive counterpart; it wraps back onto itself
    Ok(Orientation {
        y: signed16(data, 0),
        x: signed16(data, 2).wrapping_neg(),
        roll: signed16(data, 4).wrapping_neg(),
        pitch: signed16(data, 6),
    })
}

/// Any value other than 1 means "not pressed".
pub fn decode_button(data: &[u8]) -> Result<bool, DecodeError> {
    require("user button", data, BUTTON_PAYLOAD_LEN)?;
    Ok(data[0] == 1)
}

pub fn decode_temperature(data: &[u8]) -> Result<i16, DecodeError> {
    require("temperature", data, TEMPERATURE_PAYLOAD_LEN)?;
    Ok(signed16(data, 0))
}

/// The raw byte is the level reported by the wand; no scaling is applied.
pub fn decode_battery(data: &[u8]) -> Result<u8, DecodeError> {
    require("battery", data, BATTERY_PAYLOAD_LEN)?;
    Ok(data[0])
}

pub fn decode_reading(kind: EventKind, data: &[u8]) -> Result<Reading, DecodeError> {
    let reading = match kind {
        EventKind::Position => Reading::Orientation(decode_orientation(data)?),
        EventKind::Button => Reading::Button { pressed: decode_button(data)? },
        EventKind::Temperature => Reading::Temperature { raw: decode_temperature(data)? },
        EventKind::Battery => Reading::Battery { raw: decode_battery(data)? },
    };
    Ok(reading)
}
