//! Modbus RTU master
//!
//! One request per call: validate arguments, flush the line, transmit the
//! ADU with direction guarding, then collect the response — scanning for
//! the slave address byte, sizing the remainder from the echoed function
//! code and verifying the CRC before anything is trusted.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use super::frame::{build_adu, exception_description, is_exception, parse_adu};
use crate::constants::{
    FC_READ_HOLDING_REGISTERS, FC_WRITE_SINGLE_REGISTER, MODBUS_DEFAULT_TIMEOUT_MS,
    MODBUS_MAX_READ_REGISTERS, MODBUS_SLAVE_ADDR_MAX, MODBUS_SLAVE_ADDR_MIN, RX_POLL_INTERVAL_MS,
    TX_DRAIN_MS, TX_SETTLE_US,
};
use crate::error::{FieldlinkError, Result};
use crate::transport::{Direction, SerialLink};

/// Master configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Deadline for a complete, valid response
    pub timeout: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(MODBUS_DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Modbus RTU master over one exclusively-owned link
#[derive(Debug)]
pub struct RtuMaster<L: SerialLink> {
    link: L,
    config: MasterConfig,
}

impl<L: SerialLink> RtuMaster<L> {
    pub fn new(link: L) -> Self {
        Self::with_config(link, MasterConfig::default())
    }

    pub fn with_config(link: L, config: MasterConfig) -> Self {
        Self { link, config }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Read holding registers (FC 0x03)
    pub async fn read_holding_registers(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        validate_slave(slave)?;
        if count == 0 || count > MODBUS_MAX_READ_REGISTERS {
            return Err(FieldlinkError::invalid_request(format!(
                "register count {count} out of range 1..={MODBUS_MAX_READ_REGISTERS}"
            )));
        }

        let mut pdu = Vec::with_capacity(5);
        pdu.push(FC_READ_HOLDING_REGISTERS);
        pdu.extend_from_slice(&start.to_be_bytes());
        pdu.extend_from_slice(&count.to_be_bytes());

        // Response PDU: function + byte count + 2 bytes per register
        let response = self.execute(slave, &pdu, 2 + 2 * count as usize).await?;

        let byte_count = response[1] as usize;
        if byte_count != 2 * count as usize {
            return Err(FieldlinkError::protocol(format!(
                "byte count {byte_count} does not match {count} requested registers"
            )));
        }

        let registers = response[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(registers)
    }

    /// Write a single holding register (FC 0x06)
    pub async fn write_single_register(&mut self, slave: u8, address: u16, value: u16) -> Result<()> {
        validate_slave(slave)?;

        let mut pdu = Vec::with_capacity(5);
        pdu.push(FC_WRITE_SINGLE_REGISTER);
        pdu.extend_from_slice(&address.to_be_bytes());
        pdu.extend_from_slice(&value.to_be_bytes());

        // Response echoes the request PDU
        let response = self.execute(slave, &pdu, 5).await?;

        if response[1..5] != pdu[1..5] {
            return Err(FieldlinkError::protocol(
                "write echo does not match the request",
            ));
        }
        Ok(())
    }

    /// One full request/response exchange; returns the validated response
    /// PDU or the mapped exception
    async fn execute(
        &mut self,
        slave: u8,
        request_pdu: &[u8],
        expected_pdu_len: usize,
    ) -> Result<Vec<u8>> {
        let start = Instant::now();
        let deadline = start + self.config.timeout;

        self.flush_rx().await?;

        let request = build_adu(slave, request_pdu);
        self.transmit(&request).await?;

        // Scan for the slave's address byte, discarding anything else
        loop {
            if Instant::now() >= deadline {
                return Err(FieldlinkError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }

            let mut lead = [0u8; 1];
            if self.link.read(&mut lead).await? == 0 {
                sleep(Duration::from_millis(RX_POLL_INTERVAL_MS)).await;
                continue;
            }
            if lead[0] != slave {
                trace!(
                    link = %self.link.name(),
                    byte = format_args!("{:#04X}", lead[0]),
                    "discarding byte from foreign address"
                );
                continue;
            }
            break;
        }

        let mut function = [0u8; 1];
        if !self.read_exact(&mut function, deadline).await? {
            return Err(FieldlinkError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
        }

        // Exception responses are short: code + CRC
        let remainder_len = if is_exception(function[0]) {
            3
        } else if function[0] == request_pdu[0] {
            expected_pdu_len - 1 + 2
        } else {
            return Err(FieldlinkError::protocol(format!(
                "unexpected function code {:#04X} in response",
                function[0]
            )));
        };

        let mut frame = Vec::with_capacity(2 + remainder_len);
        frame.push(slave);
        frame.push(function[0]);
        let mut remainder = vec![0u8; remainder_len];
        if !self.read_exact(&mut remainder, deadline).await? {
            return Err(FieldlinkError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
        }
        frame.extend_from_slice(&remainder);

        trace!(link = %self.link.name(), rx = %hex::encode(&frame), "response frame");

        let (_, pdu) = parse_adu(&frame)?;

        if is_exception(pdu[0]) {
            let code = pdu[1];
            warn!(
                link = %self.link.name(),
                function = format_args!("{:#04X}", request_pdu[0]),
                code = format_args!("{code:#04X}"),
                "exception response: {}",
                exception_description(code)
            );
            return Err(FieldlinkError::Exception {
                function: request_pdu[0],
                code,
            });
        }

        debug!(
            link = %self.link.name(),
            function = format_args!("{:#04X}", pdu[0]),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "exchange complete"
        );
        Ok(pdu.to_vec())
    }

    async fn flush_rx(&mut self) -> Result<()> {
        let mut scratch = [0u8; 64];
        let mut flushed = 0usize;
        loop {
            let n = self.link.read(&mut scratch).await?;
            if n == 0 {
                break;
            }
            flushed += n;
        }
        if flushed > 0 {
            debug!(link = %self.link.name(), flushed, "discarded stale receive bytes");
        }
        Ok(())
    }

    /// Guarded transmit; the line returns to receive on every exit path
    async fn transmit(&mut self, frame: &[u8]) -> Result<()> {
        trace!(link = %self.link.name(), tx = %hex::encode(frame), "transmitting request");

        self.link.set_direction(Direction::Transmit).await?;
        sleep(Duration::from_micros(TX_SETTLE_US)).await;

        let write_result = self.link.write(frame).await;

        sleep(Duration::from_millis(TX_DRAIN_MS)).await;
        let release_result = self.link.set_direction(Direction::Receive).await;

        write_result?;
        release_result
    }

    async fn read_exact(&mut self, buf: &mut [u8], deadline: Instant) -> Result<bool> {
        let mut filled = 0usize;
        while filled < buf.len() {
            if Instant::now() >= deadline {
                return Ok(false);
            }
            let n = self.link.read(&mut buf[filled..]).await?;
            if n == 0 {
                sleep(Duration::from_millis(RX_POLL_INTERVAL_MS)).await;
                continue;
            }
            filled += n;
        }
        Ok(true)
    }
}

fn validate_slave(slave: u8) -> Result<()> {
    if !(MODBUS_SLAVE_ADDR_MIN..=MODBUS_SLAVE_ADDR_MAX).contains(&slave) {
        return Err(FieldlinkError::invalid_request(format!(
            "slave address {slave} out of range {MODBUS_SLAVE_ADDR_MIN}..={MODBUS_SLAVE_ADDR_MAX}"
        )));
    }
    Ok(())
}
