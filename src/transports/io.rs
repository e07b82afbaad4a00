//! Ports backed by tokio byte streams
//!
//! Anything that implements `AsyncRead` (and optionally `AsyncWrite`) can act
//! as a meter port: a serial device handle, a pseudo-terminal, a pipe or a
//! socket relaying the device.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::debug;

use crate::transport::{ChunkReader, ChunkWriter, DevicePort, OpenPort};
use crate::types::SerialConfig;
use crate::{LinkError, Result};

/// Largest chunk returned by a single read
pub const READ_CHUNK_SIZE: usize = 4096;

/// [`DevicePort`] over an already-configured byte stream.
///
/// The line settings are fixed by whoever created the stream, so `open` only
/// records them.
pub struct IoPort<R, W> {
    name: String,
    halves: Option<(R, Option<W>)>,
}

impl<R, W> IoPort<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Port with separate read and write halves
    pub fn new(name: impl Into<String>, reader: R, writer: W) -> Self {
        Self { name: name.into(), halves: Some((reader, Some(writer))) }
    }
}

impl<R> IoPort<R, tokio::io::Sink>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Port that can only be read from
    pub fn read_only(name: impl Into<String>, reader: R) -> Self {
        Self { name: name.into(), halves: Some((reader, None)) }
    }
}

impl<S> IoPort<ReadHalf<S>, WriteHalf<S>>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Port over a single bidirectional stream
    pub fn from_stream(name: impl Into<String>, stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self { name: name.into(), halves: Some((reader, Some(writer))) }
    }
}

#[async_trait::async_trait]
impl<R, W> DevicePort for IoPort<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn open(&mut self, config: &SerialConfig) -> Result<OpenPort> {
        let (reader, writer) = self
            .halves
            .take()
            .ok_or_else(|| LinkError::open_failed(format!("{} is already open", self.name)))?;

        debug!(port = %self.name, baud_rate = config.baud_rate, "Opened stream port");

        Ok(OpenPort {
            reader: Box::new(IoReader { inner: reader, buf: vec![0u8; READ_CHUNK_SIZE] }),
            writer: writer.map(|w| Box::new(IoWriter { inner: w }) as Box<dyn ChunkWriter>),
        })
    }
}

struct IoReader<R> {
    inner: R,
    buf: Vec<u8>,
}

#[async_trait::async_trait]
impl<R> ChunkReader for IoReader<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.inner.read(&mut self.buf).await {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(self.buf[..n].to_vec())),
            Err(e) => Err(LinkError::transport("read", e)),
        }
    }
}

struct IoWriter<W> {
    inner: W,
}

#[async_trait::async_trait]
impl<W> ChunkWriter for IoWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).await.map_err(|e| LinkError::transport("write", e))?;
        self.inner.flush().await.map_err(|e| LinkError::transport("flush", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_chunks_until_eof() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut port = IoPort::from_stream("duplex", host);
        let mut open = port.open(&SerialConfig::default()).await.unwrap();

        device.write_all(b"{\"path\":\"BAT\"").await.unwrap();
        let chunk = open.reader.read_chunk().await.unwrap().unwrap();
        assert_eq!(chunk, b"{\"path\":\"BAT\"");

        drop(device);
        assert!(open.reader.read_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_reach_the_device() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut port = IoPort::from_stream("duplex", host);
        let open = port.open(&SerialConfig::default()).await.unwrap();
        let mut writer = open.writer.expect("stream port is writable");

        writer.write_chunk(b"ADC").await.unwrap();

        let mut received = [0u8; 3];
        device.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"ADC");
    }

    #[tokio::test]
    async fn read_only_port_has_no_writer() {
        let (_device, host) = tokio::io::duplex(64);
        let mut port = IoPort::read_only("rx-only", host);

        let open = port.open(&SerialConfig::default()).await.unwrap();

        assert!(open.writer.is_none());
    }

    #[tokio::test]
    async fn second_open_fails() {
        let (_device, host) = tokio::io::duplex(64);
        let mut port = IoPort::from_stream("duplex", host);

        port.open(&SerialConfig::default()).await.unwrap();
        let again = port.open(&SerialConfig::default()).await;

        assert!(matches!(again, Err(LinkError::Open { .. })));
    }
}
