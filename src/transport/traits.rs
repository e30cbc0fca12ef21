//! Transport layer traits
//!
//! Defines the byte-channel interface the protocol engines run over. The
//! engines only ever need four capabilities: write a buffer, check how many
//! bytes are waiting, pull waiting bytes without blocking, and flip the
//! line direction on half-duplex media.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Line direction for half-duplex media (RS-485 DE/RE)
///
/// Full-duplex transports treat direction changes as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Driver enabled, receiver disabled
    Transmit,
    /// Driver released, receiver enabled
    Receive,
}

/// Byte counters for a link
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStats {
    /// Total bytes written
    pub bytes_sent: u64,
    /// Total bytes read
    pub bytes_received: u64,
    /// Completed write calls
    pub writes: u64,
    /// Read calls that returned at least one byte
    pub reads: u64,
}

impl LinkStats {
    pub fn record_write(&mut self, bytes: usize) {
        self.writes += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_read(&mut self, bytes: usize) {
        if bytes > 0 {
            self.reads += 1;
            self.bytes_received += bytes as u64;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Half-duplex serial byte channel
///
/// One engine owns one link; `&mut self` on the I/O methods means at most
/// one exchange can be in flight per link.
#[async_trait]
pub trait SerialLink: Send + Sync + fmt::Debug {
    /// Human-readable link name for log lines
    fn name(&self) -> &str;

    /// Write the whole buffer to the line
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Number of bytes waiting to be read, without consuming them
    async fn available(&self) -> usize;

    /// Read up to `buf.len()` waiting bytes; returns the count actually
    /// read, possibly zero. Never blocks waiting for data.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Switch line direction; no-op on full-duplex transports
    async fn set_direction(&mut self, direction: Direction) -> Result<()> {
        let _ = direction;
        Ok(())
    }

    /// Link byte counters
    async fn stats(&self) -> LinkStats;
}

#[async_trait]
impl SerialLink for Box<dyn SerialLink> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.as_mut().write(data).await
    }

    async fn available(&self) -> usize {
        self.as_ref().available().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.as_mut().read(buf).await
    }

    async fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.as_mut().set_direction(direction).await
    }

    async fn stats(&self) -> LinkStats {
        self.as_ref().stats().await
    }
}
