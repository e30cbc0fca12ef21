//! Board protocol request/response engine
//!
//! One call to [`BoardEngine::exchange`] is one complete exchange: flush
//! stale receive data, transmit the request with direction guarding, then
//! scan the line for a checksum-valid response frame until the deadline.
//!
//! State machine per call:
//! `Idle -> Transmitting -> AwaitingLeadByte -> AssemblingFrame ->
//! Validating -> {Success | Timeout | ChecksumFailed}` — no state survives
//! between calls except the configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use super::frame::{decode_response, AppFrame, FrameFormat};
use crate::constants::{
    BOARD_DEFAULT_REMAINDER_TIMEOUT_MS, BOARD_DEFAULT_TIMEOUT_MS, BOARD_DEV_ADDR,
    RX_POLL_INTERVAL_MS, TX_DRAIN_MS, TX_SETTLE_US,
};
use crate::error::{FieldlinkError, Result};
use crate::transport::{Direction, SerialLink};

/// Behavior after a candidate frame fails its checksum
///
/// Field deployments of the board firmware differ here: one scans on for
/// another lead byte inside the same deadline, the other fails the exchange
/// immediately. Both behaviors are preserved behind this switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPolicy {
    /// Keep scanning for another lead byte within the same deadline
    Resync,
    /// Fail the exchange with the checksum error immediately
    Abort,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Frame width in use by the device firmware
    pub format: FrameFormat,
    /// Expected device address (lead byte of every valid response)
    pub device_address: u8,
    /// Outer deadline for the whole exchange
    pub timeout: Duration,
    /// Sub-deadline for reading the frame remainder after a lead-byte match
    pub remainder_timeout: Duration,
    /// What to do after a checksum-invalid candidate frame
    pub scan_policy: ScanPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            format: FrameFormat::default(),
            device_address: BOARD_DEV_ADDR,
            timeout: Duration::from_millis(BOARD_DEFAULT_TIMEOUT_MS),
            remainder_timeout: Duration::from_millis(BOARD_DEFAULT_REMAINDER_TIMEOUT_MS),
            scan_policy: ScanPolicy::Resync,
        }
    }
}

/// Request/response engine over one exclusively-owned link
#[derive(Debug)]
pub struct BoardEngine<L: SerialLink> {
    link: L,
    config: EngineConfig,
}

impl<L: SerialLink> BoardEngine<L> {
    pub fn new(link: L, config: EngineConfig) -> Self {
        Self { link, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Run one full exchange: transmit `frame`, return the first
    /// checksum-valid response frame bearing the expected device address
    pub async fn exchange(&mut self, frame: &[u8]) -> Result<AppFrame> {
        let start = Instant::now();

        self.flush_rx().await?;
        self.transmit(frame).await?;

        let deadline = start + self.config.timeout;
        let flen = self.config.format.len();
        let mut frame_buf = vec![0u8; flen];
        let mut last_checksum_failure: Option<FieldlinkError> = None;

        loop {
            if Instant::now() >= deadline {
                // A definitively corrupt frame with no time left to resync
                // is reported as such rather than as silence on the line
                return Err(match last_checksum_failure {
                    Some(err) => err,
                    None => FieldlinkError::Timeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    },
                });
            }

            let mut lead = [0u8; 1];
            if self.link.read(&mut lead).await? == 0 {
                sleep(Duration::from_millis(RX_POLL_INTERVAL_MS)).await;
                continue;
            }

            if lead[0] != self.config.device_address {
                trace!(
                    link = %self.link.name(),
                    byte = format_args!("{:#04X}", lead[0]),
                    "discarding byte from foreign address"
                );
                continue;
            }

            frame_buf[0] = lead[0];
            let remainder_deadline = deadline.min(Instant::now() + self.config.remainder_timeout);
            if !self.read_exact(&mut frame_buf[1..], remainder_deadline).await? {
                return Err(FieldlinkError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }

            trace!(link = %self.link.name(), rx = %hex::encode(&frame_buf), "candidate frame");

            match decode_response(self.config.format, &frame_buf) {
                Ok(frame) => {
                    debug!(
                        link = %self.link.name(),
                        status = format_args!("{:#04X}", frame.status),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "exchange complete"
                    );
                    return Ok(frame);
                }
                Err(err @ FieldlinkError::Checksum { .. }) => match self.config.scan_policy {
                    ScanPolicy::Abort => return Err(err),
                    ScanPolicy::Resync => {
                        warn!(link = %self.link.name(), %err, "dropping corrupt frame, resyncing");
                        last_checksum_failure = Some(err);
                    }
                },
                Err(err) => return Err(err),
            }
        }
    }

    /// Discard anything sitting in the receive buffer from a previous,
    /// abandoned exchange
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

    /// Guarded transmit: the line returns to receive direction on every
    /// exit path, including a failed write
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

    /// Fill `buf` from the line, polling until `deadline`; returns whether
    /// the buffer was completely filled
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
