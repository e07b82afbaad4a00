//! Serial line and driver configuration

use serde::{Deserialize, Serialize};

use crate::{LinkError, Result};

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

/// Hardware flow control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Hardware,
}

/// Parameters handed to a port when it is opened.
///
/// The meter firmware only speaks 115200 8N1, which is what `Default` gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialConfig {
    /// Validate the line settings.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(LinkError::config("baud rate must be non-zero"));
        }
        Ok(())
    }
}

/// Read-loop tuning for the stream driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Chunk pulls allowed per framing attempt before the driver gives up
    /// waiting for a boundary and returns to the outer loop
    pub max_pulls_per_frame: u32,
}

impl DriverConfig {
    pub const DEFAULT_MAX_PULLS_PER_FRAME: u32 = 1000;

    pub fn validate(&self) -> Result<()> {
        if self.max_pulls_per_frame == 0 {
            return Err(LinkError::config("max_pulls_per_frame must be at least 1"));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_pulls_per_frame: Self::DEFAULT_MAX_PULLS_PER_FRAME }
    }
}

/// Everything a [`MeterLink`](crate::MeterLink) is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub serial: SerialConfig,
    pub driver: DriverConfig,
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        self.serial.validate()?;
        self.driver.validate()
    }
}
