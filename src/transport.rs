//! Transport traits for serial devices
//!
//! The link never touches a serial port directly. The host supplies a
//! [`DeviceSelector`] that hands out [`DevicePort`]s; opening a port yields a
//! [`ChunkReader`] and, when the device accepts input, a [`ChunkWriter`].

use crate::Result;
use crate::types::SerialConfig;

/// Read side of an open device
#[async_trait::async_trait]
pub trait ChunkReader: Send + 'static {
    /// Pull the next chunk of bytes
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - Bytes available (chunk size is arbitrary)
    /// - `Ok(None)` - End of stream (device closed or unplugged)
    /// - `Err(e)` - Transport failure
    ///
    /// May suspend indefinitely while the device is silent.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Write side of an open device
#[async_trait::async_trait]
pub trait ChunkWriter: Send + 'static {
    /// Write all of `bytes` to the device
    async fn write_chunk(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Halves of an opened device
pub struct OpenPort {
    pub reader: Box<dyn ChunkReader>,

    /// `None` for devices that cannot be written to
    pub writer: Option<Box<dyn ChunkWriter>>,
}

impl std::fmt::Debug for OpenPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenPort").field("writable", &self.writer.is_some()).finish()
    }
}

/// A device picked by the user, not yet opened
#[async_trait::async_trait]
pub trait DevicePort: Send + 'static {
    /// Human-readable name for logs
    fn name(&self) -> String;

    /// Open the device with the given line settings
    ///
    /// A port is opened at most once; further calls fail.
    async fn open(&mut self, config: &SerialConfig) -> Result<OpenPort>;
}

/// Host-provided device picker
#[async_trait::async_trait]
pub trait DeviceSelector: Send + Sync + 'static {
    /// Whether this host can offer serial devices at all
    fn is_supported(&self) -> bool;

    /// Ask the user to pick a device
    ///
    /// Returns:
    /// - `Ok(Some(port))` - A device was picked
    /// - `Ok(None)` - The user declined
    /// - `Err(e)` - The picker itself failed
    async fn request_port(&self) -> Result<Option<Box<dyn DevicePort>>>;
}

/// Selector for hosts without serial support
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

#[async_trait::async_trait]
impl DeviceSelector for Unsupported {
    fn is_supported(&self) -> bool {
        false
    }

    async fn request_port(&self) -> Result<Option<Box<dyn DevicePort>>> {
        Err(crate::LinkError::unsupported("Serial device selection"))
    }
}
