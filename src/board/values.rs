//! Payload field decoding and typed readings
//!
//! Multi-byte fields in board frames are big-endian; sensor values are
//! fixed-point integers that must be divided by a documented scale to
//! recover physical units. Every reading type implements `Default` with the
//! documented zero value so callers can fall back to the legacy
//! degrade-to-default behavior via `unwrap_or_default`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{FieldlinkError, Result};

/// Unsigned 16-bit big-endian field at `offset`
pub fn u16_be(payload: &[u8], offset: usize) -> Result<u16> {
    let bytes: [u8; 2] = payload
        .get(offset..offset + 2)
        .and_then(|s| s.try_into().ok())
        .ok_or(FieldlinkError::Length {
            expected: offset + 2,
            actual: payload.len(),
        })?;
    Ok(u16::from_be_bytes(bytes))
}

/// Signed 16-bit big-endian field at `offset`
pub fn i16_be(payload: &[u8], offset: usize) -> Result<i16> {
    Ok(u16_be(payload, offset)? as i16)
}

/// Unsigned 32-bit big-endian field at `offset`
pub fn u32_be(payload: &[u8], offset: usize) -> Result<u32> {
    let bytes: [u8; 4] = payload
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(FieldlinkError::Length {
            expected: offset + 4,
            actual: payload.len(),
        })?;
    Ok(u32::from_be_bytes(bytes))
}

/// Signed 32-bit big-endian field at `offset`
pub fn i32_be(payload: &[u8], offset: usize) -> Result<i32> {
    Ok(u32_be(payload, offset)? as i32)
}

/// ASCII string of at most `max_len` bytes, terminated by the first NUL
pub fn ascii_str(payload: &[u8], max_len: usize) -> String {
    let window = &payload[..max_len.min(payload.len())];
    let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
    window[..end]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}

/// Firmware and hardware version pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Firmware version, "major.minor.patch"
    pub firmware: String,
    /// Hardware revision, "major.minor"
    pub hardware: String,
}

/// SHT40 temperature/humidity reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShtReading {
    /// Degrees Celsius (wire value is centidegrees, signed)
    pub temperature_c: f64,
    /// Relative humidity percent (wire value is centipercent)
    pub humidity_pct: f64,
}

/// BME280 environmental reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BmeReading {
    /// Degrees Celsius (wire value scaled by 100, signed)
    pub temperature_c: f64,
    /// Relative humidity percent (wire value scaled by 1024)
    pub humidity_pct: f64,
    /// Pressure in hPa (wire value scaled by 25600)
    pub pressure_hpa: f64,
}

/// Power monitor reading (all wire values in micro-units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    /// Bus voltage in volts
    pub bus_voltage_v: f64,
    /// Shunt voltage in volts, signed
    pub shunt_voltage_v: f64,
    /// Current in amperes, signed
    pub current_a: f64,
    /// Power in watts
    pub power_w: f64,
    /// Monitor chip identifier
    pub sensor_id: u16,
}

/// Board RTC value
///
/// `year` is the two-digit on-wire value (years since 2000); weekday is the
/// device's 1..=7 convention and does not participate in conversions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcTime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl RtcTime {
    /// Parse from the 7-byte RTC payload layout
    /// (yy, mo, dd, wd, hh, mi, ss)
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 7 {
            return Err(FieldlinkError::Length {
                expected: 7,
                actual: payload.len(),
            });
        }
        Ok(Self {
            year: payload[0],
            month: payload[1],
            day: payload[2],
            weekday: payload[3],
            hour: payload[4],
            minute: payload[5],
            second: payload[6],
        })
    }

    /// The 7-byte wire layout for RTC writes
    pub fn to_payload(self) -> [u8; 7] {
        [
            self.year,
            self.month,
            self.day,
            self.weekday,
            self.hour,
            self.minute,
            self.second,
        ]
    }

    /// Convert to a calendar timestamp; `None` when the device returned a
    /// field outside the calendar range
    pub fn to_naive_datetime(self) -> Option<NaiveDateTime> {
        chrono::NaiveDate::from_ymd_opt(
            2000 + i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }
}

impl std::fmt::Display for RtcTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "20{:02}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
