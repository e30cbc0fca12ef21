//! Modbus RTU frame handling
//!
//! ADU = slave address + PDU + CRC-16 (low byte first). Pure byte-level
//! build and parse; no I/O.

use crate::constants::{FC_EXCEPTION_FLAG, MODBUS_MIN_FRAME_LEN};
use crate::crc::crc16_modbus;
use crate::error::{FieldlinkError, Result};

/// Build a complete RTU frame around a PDU
pub fn build_adu(address: u8, pdu: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + pdu.len() + 2);
    frame.push(address);
    frame.extend_from_slice(pdu);

    let crc = crc16_modbus(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());

    frame
}

/// Validate an RTU frame and split it into address and PDU
///
/// A frame failing the length or CRC check is unusable and must be
/// discarded whole.
pub fn parse_adu(data: &[u8]) -> Result<(u8, &[u8])> {
    if data.len() < MODBUS_MIN_FRAME_LEN {
        return Err(FieldlinkError::Length {
            expected: MODBUS_MIN_FRAME_LEN,
            actual: data.len(),
        });
    }

    let frame_len = data.len();
    let received_crc = u16::from_le_bytes([data[frame_len - 2], data[frame_len - 1]]);
    let calculated_crc = crc16_modbus(&data[..frame_len - 2]);
    if received_crc != calculated_crc {
        return Err(FieldlinkError::Checksum {
            expected: calculated_crc,
            actual: received_crc,
        });
    }

    Ok((data[0], &data[1..frame_len - 2]))
}

/// Whether a function code byte marks an exception response
pub fn is_exception(function: u8) -> bool {
    function & FC_EXCEPTION_FLAG != 0
}

/// Human-readable exception code name for log lines
pub fn exception_description(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Slave Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Slave Device Busy",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parse_round_trip() {
        let pdu = [0x03, 0x00, 0x01, 0x00, 0x02];
        let frame = build_adu(1, &pdu);
        assert_eq!(frame.len(), 8);

        let (address, parsed_pdu) = parse_adu(&frame).unwrap();
        assert_eq!(address, 1);
        assert_eq!(parsed_pdu, &pdu);
    }

    #[test]
    fn test_crc_wire_order() {
        // CRC 0x0A84 goes out as 84 0A
        let frame = build_adu(0x01, &[0x03, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&frame[frame.len() - 2..], &[0x84, 0x0A]);
    }

    #[test]
    fn test_short_frame_rejected() {
        let err = parse_adu(&[0x01, 0x03, 0x84]).unwrap_err();
        assert_eq!(
            err,
            FieldlinkError::Length {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_corrupt_frame_rejected() {
        let mut frame = build_adu(1, &[0x03, 0x02, 0x12, 0x34]);
        frame[2] ^= 0x40;
        assert!(matches!(
            parse_adu(&frame),
            Err(FieldlinkError::Checksum { .. })
        ));
    }

    #[test]
    fn test_exception_helpers() {
        assert!(is_exception(0x83));
        assert!(!is_exception(0x03));
        assert_eq!(exception_description(0x02), "Illegal Data Address");
        assert_eq!(exception_description(0x7E), "Unknown Exception");
    }
}
