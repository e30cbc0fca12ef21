//! Transport layer
//!
//! A half-duplex serial byte channel abstraction plus its two
//! implementations: a tokio-serial port and an in-memory mock for tests.

pub mod mock;
pub mod serial;
pub mod traits;

pub use mock::MockLink;
pub use serial::{SerialConfig, SerialTransport};
pub use traits::{Direction, LinkStats, SerialLink};
