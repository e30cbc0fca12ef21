//! Vendor board UART application protocol (master side)
//!
//! Fixed-width frames addressed to the I/O board: a 4-byte header
//! (address, status, command, parameter), a zero-padded payload area and a
//! trailing CRC-8. The board never initiates traffic; every exchange is one
//! request frame answered by one response frame of the same width.

pub mod client;
pub mod engine;
pub mod frame;
pub mod values;

pub use client::BoardClient;
pub use engine::{BoardEngine, EngineConfig, ScanPolicy};
pub use frame::{AppFrame, FrameFormat};
pub use values::{BmeReading, PowerReading, RtcTime, ShtReading, VersionInfo};
