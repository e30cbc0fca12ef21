//! Modbus RTU slave
//!
//! Passive responder: it never initiates traffic and never raises on bad
//! input. `poll()` drains whatever bytes have arrived, treats them as one
//! candidate frame, and silently ignores anything short, foreign-addressed
//! or corrupt. Handled requests are answered through the same guarded
//! transmit path the master uses.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use super::frame::{build_adu, parse_adu};
use crate::constants::{
    EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_FUNCTION, FC_READ_HOLDING_REGISTERS,
    FC_WRITE_SINGLE_REGISTER, MODBUS_FRAME_BUFFER_SIZE, MODBUS_MAX_READ_REGISTERS,
    MODBUS_SLAVE_ADDR_MAX, MODBUS_SLAVE_ADDR_MIN, TX_DRAIN_MS, TX_SETTLE_US,
};
use crate::error::{FieldlinkError, Result};
use crate::transport::{Direction, SerialLink};

/// Fixed-size bank of 16-bit holding registers
///
/// Allocated once at slave construction; mutated only through validated
/// write requests or explicit accessor calls.
#[derive(Debug, Clone)]
pub struct RegisterBank {
    regs: Vec<u16>,
}

impl RegisterBank {
    /// Allocate `count` registers, all zero
    pub fn new(count: usize) -> Self {
        Self {
            regs: vec![0; count],
        }
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        self.regs.get(index).copied()
    }

    /// Set one register; fails when `index` is out of bounds
    pub fn set(&mut self, index: usize, value: u16) -> Result<()> {
        match self.regs.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FieldlinkError::invalid_request(format!(
                "register index {index} out of bounds ({})",
                self.regs.len()
            ))),
        }
    }

    /// A contiguous range, or `None` when it runs past the end
    pub fn range(&self, start: usize, count: usize) -> Option<&[u16]> {
        self.regs.get(start..start.checked_add(count)?)
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.regs
    }
}

/// Modbus RTU slave over one exclusively-owned link
#[derive(Debug)]
pub struct RtuSlave<L: SerialLink> {
    link: L,
    address: u8,
    bank: RegisterBank,
}

impl<L: SerialLink> RtuSlave<L> {
    /// Create a slave with `register_count` zeroed holding registers
    pub fn new(link: L, address: u8, register_count: usize) -> Result<Self> {
        if !(MODBUS_SLAVE_ADDR_MIN..=MODBUS_SLAVE_ADDR_MAX).contains(&address) {
            return Err(FieldlinkError::config(format!(
                "slave address {address} out of range {MODBUS_SLAVE_ADDR_MIN}..={MODBUS_SLAVE_ADDR_MAX}"
            )));
        }
        if register_count == 0 {
            return Err(FieldlinkError::config("register count must be non-zero"));
        }

        Ok(Self {
            link,
            address,
            bank: RegisterBank::new(register_count),
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn registers(&self) -> &RegisterBank {
        &self.bank
    }

    pub fn registers_mut(&mut self) -> &mut RegisterBank {
        &mut self.bank
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Service at most one inbound frame without blocking
    ///
    /// Returns the function code that was answered, or `None` when nothing
    /// actionable arrived. Malformed, corrupt or foreign-addressed frames
    /// are dropped with no observable effect; protocol-level errors are
    /// communicated only through exception responses on the wire.
    pub async fn poll(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; MODBUS_FRAME_BUFFER_SIZE];
        let n = self.link.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        let frame = &buf[..n];

        let (address, pdu) = match parse_adu(frame) {
            Ok(parts) => parts,
            Err(err) => {
                // One poll window did not line up with one clean frame;
                // the master's CRC/timeout discipline covers recovery
                trace!(link = %self.link.name(), %err, "dropping unusable frame");
                return Ok(None);
            }
        };

        if address != self.address {
            trace!(
                link = %self.link.name(),
                address = format_args!("{address:#04X}"),
                "ignoring frame for another slave"
            );
            return Ok(None);
        }

        let function = pdu[0];
        let response_pdu = match function {
            FC_READ_HOLDING_REGISTERS => self.handle_read_holding(pdu),
            FC_WRITE_SINGLE_REGISTER => self.handle_write_single(pdu),
            _ => {
                warn!(
                    link = %self.link.name(),
                    function = format_args!("{function:#04X}"),
                    "unsupported function code"
                );
                Some(exception(function, EXCEPTION_ILLEGAL_FUNCTION))
            }
        };

        match response_pdu {
            Some(pdu) => {
                self.send_pdu(&pdu).await?;
                Ok(Some(function))
            }
            None => Ok(None),
        }
    }

    /// FC 0x03: respond with byte count + register data, or exception 0x02
    /// when the range runs outside the bank
    fn handle_read_holding(&self, pdu: &[u8]) -> Option<Vec<u8>> {
        if pdu.len() < 5 {
            return None;
        }

        let start = u16::from_be_bytes([pdu[1], pdu[2]]) as usize;
        let count = u16::from_be_bytes([pdu[3], pdu[4]]) as usize;

        // Count must be in protocol range and the window inside the bank
        let in_range = count > 0 && count <= MODBUS_MAX_READ_REGISTERS as usize;
        let Some(registers) = in_range.then(|| self.bank.range(start, count)).flatten() else {
            return Some(exception(
                FC_READ_HOLDING_REGISTERS,
                EXCEPTION_ILLEGAL_DATA_ADDRESS,
            ));
        };

        let mut response = Vec::with_capacity(2 + registers.len() * 2);
        response.push(FC_READ_HOLDING_REGISTERS);
        response.push((registers.len() * 2) as u8);
        for &value in registers {
            response.extend_from_slice(&value.to_be_bytes());
        }
        Some(response)
    }

    /// FC 0x06: write one register and echo the request, or exception 0x02
    fn handle_write_single(&mut self, pdu: &[u8]) -> Option<Vec<u8>> {
        if pdu.len() < 5 {
            return None;
        }

        let address = u16::from_be_bytes([pdu[1], pdu[2]]) as usize;
        let value = u16::from_be_bytes([pdu[3], pdu[4]]);

        if self.bank.set(address, value).is_err() {
            return Some(exception(
                FC_WRITE_SINGLE_REGISTER,
                EXCEPTION_ILLEGAL_DATA_ADDRESS,
            ));
        }

        debug!(
            link = %self.link.name(),
            register = address,
            value,
            "register written"
        );
        Some(pdu[..5].to_vec())
    }

    /// Guarded transmit of a response ADU
    async fn send_pdu(&mut self, pdu: &[u8]) -> Result<()> {
        let frame = build_adu(self.address, pdu);
        trace!(link = %self.link.name(), tx = %hex::encode(&frame), "transmitting response");

        self.link.set_direction(Direction::Transmit).await?;
        sleep(Duration::from_micros(TX_SETTLE_US)).await;

        let write_result = self.link.write(&frame).await;

        sleep(Duration::from_millis(TX_DRAIN_MS)).await;
        let release_result = self.link.set_direction(Direction::Receive).await;

        write_result?;
        release_result
    }
}

/// Exception PDU for `function` with `code`
fn exception(function: u8, code: u8) -> Vec<u8> {
    vec![function | crate::constants::FC_EXCEPTION_FLAG, code]
}
