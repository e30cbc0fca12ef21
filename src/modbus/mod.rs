//! Modbus RTU over a half-duplex serial line
//!
//! ADU framing (address + PDU + CRC-16), a polling master and a passive
//! polled slave with an in-memory holding register bank.

pub mod frame;
pub mod master;
pub mod slave;

pub use master::{MasterConfig, RtuMaster};
pub use slave::{RegisterBank, RtuSlave};
