//! Protocol constants for both framed serial protocols
//!
//! Board protocol values come from the vendor wire specification; Modbus
//! values follow the official Modbus-over-serial-line specification.

// ============================================================================
// Board protocol frame geometry
// ============================================================================

/// Application frame width used by current board firmware
pub const BOARD_FRAME_LEN_APP: usize = 24;

/// Compact application frame width used by earlier firmware revisions
pub const BOARD_FRAME_LEN_COMPACT: usize = 16;

/// Bootloader frame width
pub const BOARD_FRAME_LEN_BOOT: usize = 64;

/// Fixed header: address + status + command + parameter
pub const BOARD_HEADER_LEN: usize = 4;

/// Trailing CRC-8 byte
pub const BOARD_CRC_LEN: usize = 1;

/// Board device address on the shared UART
pub const BOARD_DEV_ADDR: u8 = 0xB2;

// ============================================================================
// Board protocol status codes
// ============================================================================

/// Operation accepted
pub const BOARD_STATUS_OK: u8 = 0x40;

/// Operation rejected or failed on the device
pub const BOARD_STATUS_ERR: u8 = 0x7F;

// ============================================================================
// Board protocol command codes
// ============================================================================

/// Ping / liveness check
pub const CMD_PING: u8 = 0x00;

/// Identity group: serial number, versions, build/production dates
pub const CMD_IDENTITY: u8 = 0x01;

/// ADC channels and digital input states
pub const CMD_ANALOG_INPUT: u8 = 0x02;

/// Environmental sensors (SHT40, BME280)
pub const CMD_ENVIRONMENT: u8 = 0x03;

/// Digital output states and switching
pub const CMD_OUTPUT: u8 = 0x04;

/// PWM, RGB and buzzer actuators
pub const CMD_ACTUATOR: u8 = 0x05;

/// RTC read/write, wakeup and alarms
pub const CMD_RTC: u8 = 0x06;

/// Power monitor (INA-style bus/shunt/current/power)
pub const CMD_POWER_MONITOR: u8 = 0x07;

// ============================================================================
// Modbus RTU
// ============================================================================

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// High bit marking an exception response
pub const FC_EXCEPTION_FLAG: u8 = 0x80;

/// Illegal Function exception code
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address exception code
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value exception code
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Smallest valid RTU frame: address + function + CRC16
pub const MODBUS_MIN_FRAME_LEN: usize = 4;

/// Maximum number of registers for FC03
///
/// Response PDU: function(1) + byte count(1) + N*2 data bytes must fit the
/// 253-byte PDU limit, so N <= 125.
pub const MODBUS_MAX_READ_REGISTERS: u16 = 125;

/// Valid slave address range for addressed (non-broadcast) requests
pub const MODBUS_SLAVE_ADDR_MIN: u8 = 1;
pub const MODBUS_SLAVE_ADDR_MAX: u8 = 247;

/// Receive buffer large enough for any RTU frame (256-byte ADU limit)
pub const MODBUS_FRAME_BUFFER_SIZE: usize = 256;

// ============================================================================
// Default timing
// ============================================================================

/// Board protocol: outer deadline for the lead-byte scan
pub const BOARD_DEFAULT_TIMEOUT_MS: u64 = 1500;

/// Board protocol: sub-deadline for reading the frame remainder
pub const BOARD_DEFAULT_REMAINDER_TIMEOUT_MS: u64 = 1200;

/// Modbus RTU: response deadline
pub const MODBUS_DEFAULT_TIMEOUT_MS: u64 = 200;

/// Settle time between asserting transmit direction and writing
pub const TX_SETTLE_US: u64 = 50;

/// Drain time after the write before releasing the line
pub const TX_DRAIN_MS: u64 = 5;

/// Poll interval while waiting for receive data
pub const RX_POLL_INTERVAL_MS: u64 = 2;
