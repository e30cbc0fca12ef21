//! Board protocol frame codec
//!
//! Pure byte-level encode/decode, no I/O. Frames are fixed-width per
//! format; unused payload bytes are zero-filled and the final byte is a
//! CRC-8 over everything before it.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BOARD_CRC_LEN, BOARD_FRAME_LEN_APP, BOARD_FRAME_LEN_BOOT, BOARD_FRAME_LEN_COMPACT,
    BOARD_HEADER_LEN, BOARD_STATUS_ERR, BOARD_STATUS_OK,
};
use crate::crc::crc8_atm;
use crate::error::{FieldlinkError, Result};

/// Fixed frame width selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// 16-byte frames (early firmware)
    Compact16,
    /// 24-byte frames (current application firmware)
    App24,
    /// 64-byte frames (bootloader)
    Boot64,
}

impl FrameFormat {
    /// Total frame width in bytes
    pub fn len(self) -> usize {
        match self {
            FrameFormat::Compact16 => BOARD_FRAME_LEN_COMPACT,
            FrameFormat::App24 => BOARD_FRAME_LEN_APP,
            FrameFormat::Boot64 => BOARD_FRAME_LEN_BOOT,
        }
    }

    /// Bytes available for command payload
    pub fn payload_capacity(self) -> usize {
        self.len() - BOARD_HEADER_LEN - BOARD_CRC_LEN
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        FrameFormat::App24
    }
}

/// Decoded view of a board protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFrame {
    /// Device address (first byte on the wire)
    pub address: u8,
    /// 0x00 on requests; status code on responses
    pub status: u8,
    /// Command code
    pub command: u8,
    /// Sub-command / parameter address
    pub parameter: u8,
    /// Payload area, zero-padded to the format's capacity
    pub payload: Vec<u8>,
}

impl AppFrame {
    /// Whether the response status signals success
    pub fn status_ok(&self) -> bool {
        self.status == BOARD_STATUS_OK
    }

    /// Whether the response status signals a device-side error
    pub fn status_err(&self) -> bool {
        self.status == BOARD_STATUS_ERR
    }
}

/// Build a request frame of the given format
///
/// Fails with `InvalidPayload` when the payload does not fit the frame's
/// data area; payloads are never truncated.
pub fn encode_request(
    format: FrameFormat,
    address: u8,
    command: u8,
    parameter: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let capacity = format.payload_capacity();
    if payload.len() > capacity {
        return Err(FieldlinkError::InvalidPayload {
            len: payload.len(),
            max: capacity,
        });
    }

    let len = format.len();
    let mut frame = vec![0u8; len];
    frame[0] = address;
    frame[1] = 0x00;
    frame[2] = command;
    frame[3] = parameter;
    frame[BOARD_HEADER_LEN..BOARD_HEADER_LEN + payload.len()].copy_from_slice(payload);
    frame[len - 1] = crc8_atm(&frame[..len - 1]);

    Ok(frame)
}

/// Parse and validate a response frame
///
/// Checks width and CRC; a mismatch on either makes the frame unusable and
/// it must be discarded by the caller, never partially trusted.
pub fn decode_response(format: FrameFormat, raw: &[u8]) -> Result<AppFrame> {
    let len = format.len();
    if raw.len() != len {
        return Err(FieldlinkError::Length {
            expected: len,
            actual: raw.len(),
        });
    }

    let expected = crc8_atm(&raw[..len - 1]);
    let actual = raw[len - 1];
    if expected != actual {
        return Err(FieldlinkError::Checksum {
            expected: u16::from(expected),
            actual: u16::from(actual),
        });
    }

    Ok(AppFrame {
        address: raw[0],
        status: raw[1],
        command: raw[2],
        parameter: raw[3],
        payload: raw[BOARD_HEADER_LEN..len - 1].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BOARD_DEV_ADDR;

    #[test]
    fn test_encode_layout() {
        let frame =
            encode_request(FrameFormat::App24, BOARD_DEV_ADDR, 0x03, 0x01, &[0xAB, 0xCD]).unwrap();

        assert_eq!(frame.len(), 24);
        assert_eq!(frame[0], BOARD_DEV_ADDR);
        assert_eq!(frame[1], 0x00);
        assert_eq!(frame[2], 0x03);
        assert_eq!(frame[3], 0x01);
        assert_eq!(&frame[4..6], &[0xAB, 0xCD]);
        // Unused payload bytes are zero-filled
        assert!(frame[6..23].iter().all(|&b| b == 0));
        assert_eq!(frame[23], crc8_atm(&frame[..23]));
    }

    #[test]
    fn test_round_trip_all_formats() {
        for format in [FrameFormat::Compact16, FrameFormat::App24, FrameFormat::Boot64] {
            let payload = [0x01, 0x02, 0x03, 0x04, 0x05];
            let raw =
                encode_request(format, BOARD_DEV_ADDR, 0x05, 0x06, &payload).unwrap();
            let frame = decode_response(format, &raw).unwrap();

            assert_eq!(frame.address, BOARD_DEV_ADDR);
            assert_eq!(frame.command, 0x05);
            assert_eq!(frame.parameter, 0x06);
            assert_eq!(&frame.payload[..payload.len()], &payload);
            assert!(frame.payload[payload.len()..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_oversized_payload_rejected() {
        // App24 has 19 payload bytes; 20 must be rejected, not truncated
        let payload = [0u8; 20];
        let err = encode_request(FrameFormat::App24, BOARD_DEV_ADDR, 0x01, 0x00, &payload)
            .unwrap_err();
        assert_eq!(err, FieldlinkError::InvalidPayload { len: 20, max: 19 });

        // Exactly at capacity is fine
        assert!(
            encode_request(FrameFormat::App24, BOARD_DEV_ADDR, 0x01, 0x00, &payload[..19]).is_ok()
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        let raw = encode_request(FrameFormat::App24, BOARD_DEV_ADDR, 0x00, 0x00, &[]).unwrap();
        let err = decode_response(FrameFormat::App24, &raw[..23]).unwrap_err();
        assert_eq!(
            err,
            FieldlinkError::Length {
                expected: 24,
                actual: 23
            }
        );
    }

    #[test]
    fn test_single_bit_tamper_detected() {
        let raw = encode_request(FrameFormat::Compact16, BOARD_DEV_ADDR, 0x02, 0x00, &[0x7F])
            .unwrap();

        for byte_idx in 0..raw.len() - 1 {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte_idx] ^= 1 << bit;
                let result = decode_response(FrameFormat::Compact16, &tampered);
                assert!(
                    matches!(result, Err(FieldlinkError::Checksum { .. })),
                    "tamper at byte {byte_idx} bit {bit} was not detected"
                );
            }
        }
    }

    #[test]
    fn test_status_helpers() {
        let mut raw =
            encode_request(FrameFormat::App24, BOARD_DEV_ADDR, 0x00, 0x00, &[]).unwrap();
        raw[1] = 0x40;
        raw[23] = crc8_atm(&raw[..23]);
        assert!(decode_response(FrameFormat::App24, &raw).unwrap().status_ok());

        raw[1] = 0x7F;
        raw[23] = crc8_atm(&raw[..23]);
        let frame = decode_response(FrameFormat::App24, &raw).unwrap();
        assert!(frame.status_err());
        assert!(!frame.status_ok());
    }
}
