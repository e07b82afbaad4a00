//! Async link layer for sound level meters on a serial line.
//!
//! The meter prints one JSON object per line, `{"path": ..., "value": ...}`,
//! at 115200 8N1. Meterlink turns the raw, arbitrarily chunked byte stream
//! into typed readings and keeps the latest value of each kind.
//!
//! # Pipeline
//!
//! ```text
//! ChunkReader ─► Utf8ChunkDecoder ─► framing::feed ─► decoder::decode ─► dispatch ─► MeterState
//!     ▲                                                                      (watch channels)
//!     └── Driver (one read cycle per connection, cancelled on supersession)
//! ```
//!
//! - **Framing**: text is split on `\n`; partial messages survive across reads
//! - **Decoding**: malformed bodies are logged and skipped, never fatal
//! - **Dispatch**: `ADC` and `BAT` messages update state, anything else is logged
//! - **Starvation guard**: a framing attempt gives up after 1000 chunk pulls
//!   without a boundary and the read loop carries on
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use meterlink::{Command, LinkConfig, MeterLink, transports::IoPort};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> meterlink::Result<()> {
//!     let (device, host) = tokio::io::duplex(4096);
//!     # drop(device);
//!     let link = MeterLink::detached(LinkConfig::default())?;
//!     link.attach(Box::new(IoPort::from_stream("meter", host))).await?;
//!
//!     link.request(Command::Adc).await;
//!     let mut readings = Box::pin(link.adc_updates());
//!     while let Some(adc) = readings.next().await {
//!         println!("{:.1} dB SPL", adc.db_spl);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire protocol
pub mod decoder;
pub mod dispatch;
pub mod framing;
pub mod schema;

// Stream-based connection architecture
pub mod connection;
pub mod driver;
pub mod state;
pub mod transport;
pub mod transports;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use connection::MeterLink;
pub use dispatch::{DispatchOutcome, StateUpdaters};
pub use driver::{Driver, DriverState, DriverStats};
pub use schema::{MessageKind, classify};
pub use state::MeterState;
pub use transport::{ChunkReader, ChunkWriter, DevicePort, DeviceSelector, OpenPort};
