//! Serial port transport
//!
//! tokio-serial backed implementation of [`SerialLink`]. Direction control
//! for RS-485 transceivers is mapped to the RTS line when enabled; ports
//! with automatic direction arbitration leave it disabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, trace};

use super::traits::{Direction, LinkStats, SerialLink};
use crate::error::{FieldlinkError, Result};

/// Serial port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0", "COM1")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity ("None", "Even", "Odd")
    pub parity: String,
    /// Drive the RTS line as an RS-485 transmit-enable signal
    pub rts_direction_control: bool,
    /// Timeout handed to the underlying port
    pub port_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: "None".to_string(),
            rts_direction_control: false,
            port_timeout: Duration::from_millis(1000),
        }
    }
}

impl SerialConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(FieldlinkError::config("Port path cannot be empty"));
        }

        if self.baud_rate == 0 {
            return Err(FieldlinkError::config("Baud rate must be greater than zero"));
        }

        if ![5, 6, 7, 8].contains(&self.data_bits) {
            return Err(FieldlinkError::config("Data bits must be 5, 6, 7, or 8"));
        }

        if ![1, 2].contains(&self.stop_bits) {
            return Err(FieldlinkError::config("Stop bits must be 1 or 2"));
        }

        if !["None", "Even", "Odd"].contains(&self.parity.as_str()) {
            return Err(FieldlinkError::config("Parity must be None, Even, or Odd"));
        }

        Ok(())
    }

    fn parse_parity(&self) -> tokio_serial::Parity {
        match self.parity.as_str() {
            "Even" => tokio_serial::Parity::Even,
            "Odd" => tokio_serial::Parity::Odd,
            _ => tokio_serial::Parity::None,
        }
    }

    fn parse_data_bits(&self) -> tokio_serial::DataBits {
        match self.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        }
    }

    fn parse_stop_bits(&self) -> tokio_serial::StopBits {
        match self.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        }
    }
}

/// Serial transport implementation
#[derive(Debug)]
pub struct SerialTransport {
    config: SerialConfig,
    stream: SerialStream,
    stats: LinkStats,
}

impl SerialTransport {
    /// Open the configured port
    pub fn open(config: SerialConfig) -> Result<Self> {
        config.validate()?;

        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(config.parse_data_bits())
            .stop_bits(config.parse_stop_bits())
            .parity(config.parse_parity())
            .timeout(config.port_timeout)
            .open_native_async()
            .map_err(|e| {
                FieldlinkError::transport(format!("Failed to open {}: {}", config.port, e))
            })?;

        debug!(
            port = %config.port,
            baud = config.baud_rate,
            "Opened serial transport"
        );

        Ok(Self {
            config,
            stream,
            stats: LinkStats::default(),
        })
    }

    /// The active configuration
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

#[async_trait]
impl SerialLink for SerialTransport {
    fn name(&self) -> &str {
        &self.config.port
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        self.stats.record_write(data.len());
        trace!(port = %self.config.port, tx = %hex::encode(data), "wrote frame");
        Ok(())
    }

    async fn available(&self) -> usize {
        self.stream.bytes_to_read().map(|n| n as usize).unwrap_or(0)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let waiting = self.available().await.min(buf.len());
        if waiting == 0 {
            return Ok(0);
        }

        let n = self.stream.read(&mut buf[..waiting]).await?;
        self.stats.record_read(n);
        if n > 0 {
            trace!(port = %self.config.port, rx = %hex::encode(&buf[..n]), "read bytes");
        }
        Ok(n)
    }

    async fn set_direction(&mut self, direction: Direction) -> Result<()> {
        if !self.config.rts_direction_control {
            return Ok(());
        }

        let level = matches!(direction, Direction::Transmit);
        self.stream
            .write_request_to_send(level)
            .map_err(|e| FieldlinkError::transport(format!("RTS control failed: {e}")))
    }

    async fn stats(&self) -> LinkStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = SerialConfig::default();
        assert!(config.validate().is_ok());

        let config = SerialConfig {
            port: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SerialConfig {
            baud_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SerialConfig {
            data_bits: 9,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SerialConfig {
            parity: "Mark".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        let config = SerialConfig {
            port: "/dev/does-not-exist-fieldlink".to_string(),
            ..Default::default()
        };
        assert!(SerialTransport::open(config).is_err());
    }
}
