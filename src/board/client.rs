//! Typed board client
//!
//! One method per board operation. Each call builds the command payload,
//! runs a single exchange through the engine and decodes the response
//! payload into typed values.
//!
//! The primary API returns `Result` so callers can distinguish device
//! errors from communication failures. The `*_or_default` variants on the
//! sensor-read group reproduce the legacy degrade-to-default behavior where
//! any failure reads as the documented zero value.

use tracing::debug;

use super::engine::{BoardEngine, EngineConfig};
use super::values::{
    ascii_str, i16_be, i32_be, u16_be, u32_be, BmeReading, PowerReading, RtcTime, ShtReading,
    VersionInfo,
};
use crate::constants::{
    CMD_ACTUATOR, CMD_ANALOG_INPUT, CMD_ENVIRONMENT, CMD_IDENTITY, CMD_OUTPUT, CMD_PING,
    CMD_POWER_MONITOR, CMD_RTC,
};
use crate::error::{FieldlinkError, Result};
use crate::transport::SerialLink;

/// Typed client for the board UART protocol
#[derive(Debug)]
pub struct BoardClient<L: SerialLink> {
    engine: BoardEngine<L>,
}

impl<L: SerialLink> BoardClient<L> {
    /// Create a client with default engine configuration
    pub fn new(link: L) -> Self {
        Self::with_config(link, EngineConfig::default())
    }

    /// Create a client with explicit engine configuration
    pub fn with_config(link: L, config: EngineConfig) -> Self {
        Self {
            engine: BoardEngine::new(link, config),
        }
    }

    /// Access the underlying engine
    pub fn engine(&self) -> &BoardEngine<L> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut BoardEngine<L> {
        &mut self.engine
    }

    /// Run one command exchange and return the response payload
    ///
    /// The identity group is issued without status checking (the firmware
    /// answers those with an unset status field); everything else treats a
    /// non-OK status as a device-side failure.
    async fn command(
        &mut self,
        command: u8,
        parameter: u8,
        payload: &[u8],
        check_status: bool,
    ) -> Result<Vec<u8>> {
        let config = self.engine.config();
        let frame = super::frame::encode_request(
            config.format,
            config.device_address,
            command,
            parameter,
            payload,
        )?;

        let response = self.engine.exchange(&frame).await?;

        if check_status && !response.status_ok() {
            debug!(
                command = format_args!("{command:#04X}"),
                status = format_args!("{:#04X}", response.status),
                "device rejected command"
            );
            return Err(FieldlinkError::DeviceError {
                status: response.status,
            });
        }

        Ok(response.payload)
    }

    // ========================================================================
    // Liveness and identity
    // ========================================================================

    /// Liveness check; succeeds when any valid frame comes back
    pub async fn ping(&mut self) -> Result<()> {
        self.command(CMD_PING, 0x00, &[], false).await.map(|_| ())
    }

    /// Device serial number
    pub async fn serial_number(&mut self) -> Result<u32> {
        let p = self.command(CMD_IDENTITY, 0x00, &[], false).await?;
        u32_be(&p, 0)
    }

    /// Firmware and hardware versions
    pub async fn versions(&mut self) -> Result<VersionInfo> {
        let p = self.command(CMD_IDENTITY, 0x01, &[], false).await?;
        if p.len() < 5 {
            return Err(FieldlinkError::Length {
                expected: 5,
                actual: p.len(),
            });
        }
        Ok(VersionInfo {
            firmware: format!("{}.{}.{}", p[0], p[1], p[2]),
            hardware: format!("{}.{}", p[3], p[4]),
        })
    }

    /// Firmware build date, ASCII
    pub async fn build_date(&mut self) -> Result<String> {
        let p = self.command(CMD_IDENTITY, 0x02, &[], false).await?;
        Ok(ascii_str(&p, 10))
    }

    /// Board production date, ASCII
    pub async fn production_date(&mut self) -> Result<String> {
        let p = self.command(CMD_IDENTITY, 0x03, &[], false).await?;
        Ok(ascii_str(&p, 10))
    }

    // ========================================================================
    // Inputs and sensors
    // ========================================================================

    /// Raw readings of both ADC channels
    pub async fn adc_channels(&mut self) -> Result<[u16; 2]> {
        let p = self.command(CMD_ANALOG_INPUT, 0x00, &[], false).await?;
        Ok([u16_be(&p, 0)?, u16_be(&p, 2)?])
    }

    /// Digital input states for an input channel group
    pub async fn input_states(&mut self, channel: u8) -> Result<u8> {
        let p = self.command(CMD_ANALOG_INPUT, channel, &[], true).await?;
        p.first().copied().ok_or(FieldlinkError::Length {
            expected: 1,
            actual: 0,
        })
    }

    /// SHT40 temperature/humidity
    pub async fn sht40(&mut self) -> Result<ShtReading> {
        let p = self.command(CMD_ENVIRONMENT, 0x00, &[], true).await?;
        Ok(ShtReading {
            temperature_c: f64::from(i16_be(&p, 0)?) / 100.0,
            humidity_pct: f64::from(u16_be(&p, 2)?) / 100.0,
        })
    }

    /// BME280 temperature/humidity/pressure
    pub async fn bme280(&mut self) -> Result<BmeReading> {
        let p = self.command(CMD_ENVIRONMENT, 0x01, &[], true).await?;
        Ok(BmeReading {
            temperature_c: f64::from(i32_be(&p, 0)?) / 100.0,
            humidity_pct: f64::from(u32_be(&p, 4)?) / 1024.0,
            pressure_hpa: f64::from(u32_be(&p, 8)?) / 25600.0,
        })
    }

    /// Power monitor: bus/shunt voltage, current, power, chip id
    pub async fn power_monitor(&mut self) -> Result<PowerReading> {
        let p = self.command(CMD_POWER_MONITOR, 0x00, &[], true).await?;
        Ok(PowerReading {
            bus_voltage_v: f64::from(u32_be(&p, 0)?) / 1_000_000.0,
            shunt_voltage_v: f64::from(i32_be(&p, 4)?) / 1_000_000.0,
            current_a: f64::from(i32_be(&p, 8)?) / 1_000_000.0,
            power_w: f64::from(u32_be(&p, 12)?) / 1_000_000.0,
            sensor_id: u16_be(&p, 16)?,
        })
    }

    // ========================================================================
    // Outputs and actuators
    // ========================================================================

    /// States of the five output channels
    pub async fn output_states(&mut self) -> Result<[u8; 5]> {
        let p = self.command(CMD_OUTPUT, 0x00, &[], true).await?;
        if p.len() < 5 {
            return Err(FieldlinkError::Length {
                expected: 5,
                actual: p.len(),
            });
        }
        Ok([p[0], p[1], p[2], p[3], p[4]])
    }

    /// Switch an output channel; returns the echoed state
    pub async fn set_output(&mut self, channel: u8, on: bool) -> Result<u8> {
        let p = self
            .command(CMD_OUTPUT, channel, &[u8::from(on)], true)
            .await?;
        p.first().copied().ok_or(FieldlinkError::Length {
            expected: 1,
            actual: 0,
        })
    }

    /// Set PWM duty on a channel; returns the echoed duty
    pub async fn set_pwm(&mut self, channel: u8, duty: u8) -> Result<u8> {
        let p = self.command(CMD_ACTUATOR, channel, &[duty], true).await?;
        p.first().copied().ok_or(FieldlinkError::Length {
            expected: 1,
            actual: 0,
        })
    }

    /// Set the RGB indicator; returns the echoed color
    pub async fn set_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<[u8; 3]> {
        let p = self.command(CMD_ACTUATOR, 0x05, &[r, g, b], true).await?;
        if p.len() < 3 {
            return Err(FieldlinkError::Length {
                expected: 3,
                actual: p.len(),
            });
        }
        Ok([p[0], p[1], p[2]])
    }

    /// Drive the buzzer; returns the echoed frequency
    pub async fn set_buzzer(&mut self, frequency_hz: u16, volume: u8) -> Result<u16> {
        let freq = frequency_hz.to_be_bytes();
        let p = self
            .command(CMD_ACTUATOR, 0x06, &[freq[0], freq[1], volume], true)
            .await?;
        u16_be(&p, 0)
    }

    // ========================================================================
    // RTC and alarms
    // ========================================================================

    /// Current RTC value
    pub async fn rtc_read(&mut self) -> Result<RtcTime> {
        let p = self.command(CMD_RTC, 0x00, &[], true).await?;
        RtcTime::from_payload(&p)
    }

    /// Set the RTC; returns the device's echo of the new value
    pub async fn rtc_write(&mut self, time: RtcTime) -> Result<RtcTime> {
        let p = self.command(CMD_RTC, 0x01, &time.to_payload(), true).await?;
        RtcTime::from_payload(&p)
    }

    /// Arm the periodic wakeup timer; returns the device acknowledgement
    pub async fn rtc_wakeup(&mut self, seconds: u16) -> Result<u8> {
        let secs = seconds.to_be_bytes();
        let p = self.command(CMD_RTC, 0x02, &[secs[0], secs[1]], true).await?;
        p.first().copied().ok_or(FieldlinkError::Length {
            expected: 1,
            actual: 0,
        })
    }

    /// Configure the alarm; `daily` re-arms it every 24 hours
    pub async fn alarm_set(&mut self, hour: u8, minute: u8, second: u8, daily: bool) -> Result<u8> {
        let p = self
            .command(CMD_RTC, 0x03, &[hour, minute, second, u8::from(daily)], true)
            .await?;
        p.first().copied().ok_or(FieldlinkError::Length {
            expected: 1,
            actual: 0,
        })
    }

    /// Disarm the alarm
    pub async fn alarm_off(&mut self) -> Result<u8> {
        let p = self.command(CMD_RTC, 0x04, &[], true).await?;
        p.first().copied().ok_or(FieldlinkError::Length {
            expected: 1,
            actual: 0,
        })
    }

    /// Device timestamp (RTC snapshot at response time)
    pub async fn timestamp(&mut self) -> Result<RtcTime> {
        let p = self.command(CMD_RTC, 0x05, &[], true).await?;
        RtcTime::from_payload(&p)
    }

    // ========================================================================
    // Legacy degrade-to-default accessors
    // ========================================================================

    /// [`Self::adc_channels`] collapsing any failure into `[0, 0]`
    pub async fn adc_channels_or_default(&mut self) -> [u16; 2] {
        self.adc_channels().await.unwrap_or_default()
    }

    /// [`Self::sht40`] collapsing any failure into zero readings
    pub async fn sht40_or_default(&mut self) -> ShtReading {
        self.sht40().await.unwrap_or_default()
    }

    /// [`Self::bme280`] collapsing any failure into zero readings
    pub async fn bme280_or_default(&mut self) -> BmeReading {
        self.bme280().await.unwrap_or_default()
    }

    /// [`Self::power_monitor`] collapsing any failure into zero readings
    pub async fn power_monitor_or_default(&mut self) -> PowerReading {
        self.power_monitor().await.unwrap_or_default()
    }
}
