//! Error handling for fieldlink
//!
//! All failure outcomes of the protocol engines are distinct variants of a
//! single error enum so callers can react to timeouts, integrity failures
//! and device-side errors programmatically.

use thiserror::Error;

/// Fieldlink error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldlinkError {
    /// No valid response arrived within the configured deadline
    #[error("Timed out after {elapsed_ms} ms waiting for a valid response")]
    Timeout { elapsed_ms: u64 },

    /// A complete frame arrived but failed its integrity check
    #[error("Checksum mismatch: expected {expected:#06X}, got {actual:#06X}")]
    Checksum { expected: u16, actual: u16 },

    /// A frame was shorter or longer than the protocol allows
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    Length { expected: usize, actual: usize },

    /// Request payload does not fit in the frame's data area
    #[error("Payload of {len} bytes exceeds frame capacity of {max}")]
    InvalidPayload { len: usize, max: usize },

    /// Request parameters rejected before anything touched the wire
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Board protocol response carried the device error status (0x7F)
    #[error("Device reported error status {status:#04X}")]
    DeviceError { status: u8 },

    /// Modbus exception response (function code with high bit set)
    #[error("Modbus exception: function {function:#04X}, code {code:#04X}")]
    Exception { function: u8, code: u8 },

    /// Well-formed frame whose content violates the protocol (wrong
    /// function echo, inconsistent byte count)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport-level failure (port I/O, direction control)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for fieldlink operations
pub type Result<T> = std::result::Result<T, FieldlinkError>;

impl FieldlinkError {
    pub fn transport(msg: impl Into<String>) -> Self {
        FieldlinkError::Transport(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        FieldlinkError::Config(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        FieldlinkError::InvalidRequest(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        FieldlinkError::Protocol(msg.into())
    }

    /// Whether this outcome means "no usable response" as opposed to a
    /// caller-side mistake
    pub fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            FieldlinkError::Timeout { .. }
                | FieldlinkError::Checksum { .. }
                | FieldlinkError::Length { .. }
                | FieldlinkError::Transport(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FieldlinkError::Timeout { .. })
    }
}

impl From<std::io::Error> for FieldlinkError {
    fn from(err: std::io::Error) -> Self {
        FieldlinkError::Transport(err.to_string())
    }
}
