//! Core value types shared across the link.
//!
//! - [`AdcPayload`] / [`BatteryVoltage`] are the typed payloads the meter reports
//! - [`Command`] names the requests the firmware understands
//! - [`SerialConfig`], [`DriverConfig`] and [`LinkConfig`] carry configuration
//!
//! ```rust
//! use meterlink::types::{Command, LinkConfig};
//!
//! let config = LinkConfig::default();
//! assert_eq!(config.serial.baud_rate, 115_200);
//! assert_eq!(Command::Adc.as_str(), "ADC");
//! ```

mod command;
mod config;
mod payload;

pub use command::Command;
pub use config::{DataBits, DriverConfig, FlowControl, LinkConfig, Parity, SerialConfig, StopBits};
pub use payload::{AdcPayload, BatteryVoltage};
