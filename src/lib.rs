//! # fieldlink — framed request/response engines for serial field buses
//!
//! A pure-Rust implementation of two half-duplex serial protocols that
//! share one shape — a framed request, a checksum-valid response, a
//! deadline — and differ only in framing:
//!
//! - **Board protocol**: fixed-width frames (16/24/64 bytes) with a CRC-8
//!   trailer, spoken by the vendor I/O board; master side only.
//! - **Modbus RTU**: variable-length ADUs with a CRC-16 trailer; both the
//!   polling master and a passive register-bank slave.
//!
//! Both engines run over the same [`transport::SerialLink`] abstraction, so
//! the same protocol code drives a real `tokio-serial` port, an RS-485
//! transceiver behind an RTS direction line, or the in-memory
//! [`transport::MockLink`] used by the test suite.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fieldlink::modbus::RtuMaster;
//! use fieldlink::transport::{SerialConfig, SerialTransport};
//!
//! #[tokio::main]
//! async fn main() -> fieldlink::Result<()> {
//!     let config = SerialConfig {
//!         port: "/dev/ttyUSB0".to_string(),
//!         baud_rate: 19200,
//!         rts_direction_control: true,
//!         ..Default::default()
//!     };
//!     let mut master = RtuMaster::new(SerialTransport::open(config)?);
//!
//!     let registers = master.read_holding_registers(17, 0, 4).await?;
//!     println!("registers: {registers:?}");
//!
//!     master.write_single_register(17, 0, 1234).await?;
//!     Ok(())
//! }
//! ```
//!
//! One engine owns one link; every `exchange`/`poll` call is a complete,
//! deadline-bound transaction and no protocol state survives between calls.

/// Core error types and result handling
pub mod error;

/// Protocol constants for both framing variants
pub mod constants;

/// Frame integrity checksums (CRC-8 and CRC-16/MODBUS)
pub mod crc;

/// Serial byte-channel abstraction and implementations
pub mod transport;

/// Vendor board UART application protocol
pub mod board;

/// Modbus RTU master and slave
pub mod modbus;

// === Error handling ===
pub use error::{FieldlinkError, Result};

// === Board protocol ===
pub use board::{
    AppFrame, BmeReading, BoardClient, BoardEngine, EngineConfig, FrameFormat, PowerReading,
    RtcTime, ScanPolicy, ShtReading, VersionInfo,
};

// === Modbus RTU ===
pub use modbus::{MasterConfig, RegisterBank, RtuMaster, RtuSlave};

// === Transport ===
pub use transport::{Direction, LinkStats, MockLink, SerialConfig, SerialLink, SerialTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
