//! Test doubles for transports and state
//!
//! Scripted readers, recording writers and selectors that stand in for a real
//! serial device, plus a [`StateUpdaters`] that records every call.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::dispatch::StateUpdaters;
use crate::transport::{ChunkReader, ChunkWriter, DevicePort, DeviceSelector, OpenPort};
use crate::types::{AdcPayload, BatteryVoltage, SerialConfig};
use crate::{LinkError, Result};

/// One recorded state-updater call
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Adc(AdcPayload),
    Battery(BatteryVoltage),
}

/// [`StateUpdaters`] that records calls in order. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingUpdaters {
    calls: Arc<Mutex<Vec<Update>>>,
}

impl RecordingUpdaters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, oldest first
    pub fn updates(&self) -> Vec<Update> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, update: Update) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(update);
    }
}

impl StateUpdaters for RecordingUpdaters {
    fn set_adc_values(&self, payload: AdcPayload) {
        self.push(Update::Adc(payload));
    }

    fn set_battery_value(&self, voltage: BatteryVoltage) {
        self.push(Update::Battery(voltage));
    }
}

/// Reader that replays a fixed list of chunks, then reports end of stream
/// (or blocks forever with [`ScriptedReader::then_hang`]).
#[derive(Debug)]
pub struct ScriptedReader {
    script: VecDeque<std::io::Result<Vec<u8>>>,
    hang: bool,
}

impl ScriptedReader {
    pub fn new(script: impl IntoIterator<Item = std::io::Result<Vec<u8>>>) -> Self {
        Self { script: script.into_iter().collect(), hang: false }
    }

    /// One chunk per string
    pub fn from_text<'a>(chunks: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(chunks.into_iter().map(|c| Ok(c.as_bytes().to_vec())))
    }

    /// Reader that never produces anything
    pub fn hanging() -> Self {
        Self { script: VecDeque::new(), hang: true }
    }

    /// Block instead of ending once the script is exhausted
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[async_trait::async_trait]
impl ChunkReader for ScriptedReader {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match self.script.pop_front() {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(LinkError::transport("read", e)),
            None if self.hang => std::future::pending().await,
            None => Ok(None),
        }
    }
}

/// Reader that never produces a boundary character
#[derive(Debug, Default)]
pub struct SilentReader {
    pulls: Arc<AtomicU32>,
}

impl SilentReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared count of `read_chunk` calls
    pub fn pull_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.pulls)
    }
}

#[async_trait::async_trait]
impl ChunkReader for SilentReader {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(Some(b"~".to_vec()))
    }
}

/// Reader fed from a channel; dropping the sender ends the stream
#[derive(Debug)]
pub struct ChannelReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl ChannelReader {
    pub fn pair() -> (mpsc::UnboundedSender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl ChunkReader for ChannelReader {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.rx.recv().await)
    }
}

/// Writer that appends everything to a shared byte log.
///
/// With `byte_at_a_time` each byte is written separately with a yield in
/// between, so overlapping writers would interleave.
#[derive(Debug, Clone, Default)]
pub struct RecordingWriter {
    written: Arc<Mutex<Vec<u8>>>,
    byte_at_a_time: bool,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte_at_a_time() -> Self {
        Self { byte_at_a_time: true, ..Self::default() }
    }

    /// Everything written so far
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait::async_trait]
impl ChunkWriter for RecordingWriter {
    async fn write_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        if self.byte_at_a_time {
            for byte in bytes {
                self.written.lock().unwrap_or_else(PoisonError::into_inner).push(*byte);
                tokio::task::yield_now().await;
            }
        } else {
            self.written.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(bytes);
        }
        Ok(())
    }
}

/// Port that hands out pre-built halves, or fails to open
pub struct ScriptedPort {
    name: String,
    halves: Option<OpenPort>,
    last_config: Arc<Mutex<Option<SerialConfig>>>,
}

impl ScriptedPort {
    pub fn new(
        name: impl Into<String>,
        reader: impl ChunkReader,
        writer: Option<RecordingWriter>,
    ) -> Self {
        let writer = writer.map(|w| Box::new(w) as Box<dyn ChunkWriter>);
        Self {
            name: name.into(),
            halves: Some(OpenPort { reader: Box::new(reader), writer }),
            last_config: Arc::default(),
        }
    }

    /// Port whose `open` always fails
    pub fn failing(name: impl Into<String>) -> Self {
        Self { name: name.into(), halves: None, last_config: Arc::default() }
    }

    /// Config passed to the most recent `open`
    pub fn config_probe(&self) -> Arc<Mutex<Option<SerialConfig>>> {
        Arc::clone(&self.last_config)
    }
}

#[async_trait::async_trait]
impl DevicePort for ScriptedPort {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn open(&mut self, config: &SerialConfig) -> Result<OpenPort> {
        *self.last_config.lock().unwrap_or_else(PoisonError::into_inner) = Some(*config);
        self.halves
            .take()
            .ok_or_else(|| LinkError::open_failed(format!("{} refused to open", self.name)))
    }
}

/// Selector answering from a queue; an exhausted queue means "declined"
#[derive(Default)]
pub struct ScriptedSelector {
    responses: Mutex<VecDeque<Option<Box<dyn DevicePort>>>>,
}

impl ScriptedSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a port to be picked
    pub fn offer(self, port: impl DevicePort) -> Self {
        self.push(Some(Box::new(port)));
        self
    }

    /// Queue a declined pick
    pub fn decline(self) -> Self {
        self.push(None);
        self
    }

    fn push(&self, response: Option<Box<dyn DevicePort>>) {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).push_back(response);
    }
}

#[async_trait::async_trait]
impl DeviceSelector for ScriptedSelector {
    fn is_supported(&self) -> bool {
        true
    }

    async fn request_port(&self) -> Result<Option<Box<dyn DevicePort>>> {
        let next = self.responses.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        Ok(next.flatten())
    }
}
