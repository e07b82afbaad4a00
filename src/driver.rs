//! Driver owns a connection's read cycle

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::decoder;
use crate::dispatch::{DispatchOutcome, StateUpdaters, dispatch};
use crate::framing::{Frames, Utf8ChunkDecoder, feed};
use crate::transport::ChunkReader;
use crate::types::DriverConfig;

/// Lifecycle of one read cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// No connection yet
    Idle,
    /// Pulling chunks from the device
    Reading,
    /// Decoding and dispatching a batch of complete messages
    Draining,
    /// Stream ended, failed or was superseded. Terminal.
    Closed,
}

/// Counters reported when a read cycle ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Transport pulls, including the one that reported end of stream
    pub chunks: u64,
    /// Complete messages framed
    pub messages: u64,
    /// Messages that reached a state updater
    pub dispatched: u64,
    /// Messages that were not valid JSON
    pub decode_failures: u64,
    /// Messages with an unknown discriminant
    pub unrecognized: u64,
    /// Known discriminant with a payload of the wrong shape
    pub rejected: u64,
    /// Framing attempts that hit the pull ceiling without a boundary
    pub starvations: u64,
}

/// Result of spawning a driver
pub struct DriverChannels {
    /// Receiver for driver state changes
    pub state: watch::Receiver<DriverState>,
    /// Liveness token; cancelling it stops the cycle
    pub cancel: CancellationToken,
    /// Resolves with the cycle's counters once it has closed
    pub finished: JoinHandle<DriverStats>,
}

/// One framing attempt
#[derive(Debug)]
pub(crate) struct Pull {
    pub messages: Vec<String>,
    pub pending: String,
    pub pulls: u32,
    pub end_of_stream: bool,
}

/// Pull chunks until at least one complete message is framed, the stream
/// ends, or `max_pulls` chunks have been read.
///
/// At least one chunk is always pulled, so a zero ceiling still makes progress.
/// `pending` is moved in and handed back in the returned [`Pull`].
pub(crate) async fn pull_frames(
    reader: &mut dyn ChunkReader,
    text: &mut Utf8ChunkDecoder,
    mut pending: String,
    max_pulls: u32,
) -> Result<Pull> {
    let max_pulls = max_pulls.max(1);
    let mut pulls = 0;
    while pulls < max_pulls {
        pulls += 1;
        let Some(chunk) = reader.read_chunk().await? else {
            return Ok(Pull { messages: Vec::new(), pending, pulls, end_of_stream: true });
        };
        trace!(bytes = chunk.len(), pulls, "Chunk received");

        let Frames { messages, pending: rest } = feed(pending, &text.decode(&chunk));
        if !messages.is_empty() {
            return Ok(Pull { messages, pending: rest, pulls, end_of_stream: false });
        }
        pending = rest;
    }
    Ok(Pull { messages: Vec::new(), pending, pulls, end_of_stream: false })
}

/// Driver spawns and runs the read cycle for one connection
///
/// The cycle owns the reader for its whole life and drops it on every exit
/// path. Exactly one cycle should run per connection.
pub struct Driver;

impl Driver {
    /// Spawn a read cycle for `reader`
    ///
    /// Returns a watch receiver for the driver state, the liveness token and
    /// a handle resolving to the final counters.
    pub fn spawn<U>(
        reader: Box<dyn ChunkReader>,
        updaters: U,
        config: DriverConfig,
        cancel: CancellationToken,
    ) -> DriverChannels
    where
        U: StateUpdaters + 'static,
    {
        let (state_tx, state_rx) = watch::channel(DriverState::Idle);
        let cancel_cycle = cancel.clone();

        let finished = tokio::spawn(async move {
            Self::read_cycle(reader, updaters, config, state_tx, cancel_cycle).await
        });

        DriverChannels { state: state_rx, cancel, finished }
    }

    /// Run the read cycle to completion on the current task
    pub async fn read_cycle<U>(
        mut reader: Box<dyn ChunkReader>,
        updaters: U,
        config: DriverConfig,
        state_tx: watch::Sender<DriverState>,
        cancel: CancellationToken,
    ) -> DriverStats
    where
        U: StateUpdaters,
    {
        if let Err(e) = config.validate() {
            warn!(error = %e, "Invalid driver config, pulling one chunk per framing attempt");
        }
        info!(max_pulls = config.max_pulls_per_frame, "Read cycle started");
        let mut stats = DriverStats::default();
        let mut text = Utf8ChunkDecoder::new();
        let mut pending = String::new();
        state_tx.send_replace(DriverState::Reading);

        loop {
            if cancel.is_cancelled() {
                info!("Connection superseded");
                break;
            }

            // Select so a silent device cannot keep a superseded cycle alive
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Connection superseded during read");
                    break;
                }
                result = pull_frames(
                    reader.as_mut(),
                    &mut text,
                    pending,
                    config.max_pulls_per_frame,
                ) => result,
            };

            let pull = match result {
                Ok(pull) => pull,
                Err(e) => {
                    error!(error = %e, "Transport read failed, closing connection");
                    break;
                }
            };
            stats.chunks += u64::from(pull.pulls);
            pending = pull.pending;

            if pull.end_of_stream {
                let tail = pending.len() + text.held_back();
                if tail > 0 {
                    debug!(bytes = tail, "Discarding partial message at end of stream");
                }
                info!("Device stream ended");
                break;
            }

            if pull.messages.is_empty() {
                stats.starvations += 1;
                debug!(
                    pulls = pull.pulls,
                    pending_bytes = pending.len(),
                    "No message boundary within pull ceiling, continuing"
                );
                continue;
            }

            state_tx.send_replace(DriverState::Draining);
            for raw in pull.messages {
                if cancel.is_cancelled() {
                    debug!("Connection superseded mid-batch, dropping remaining messages");
                    break;
                }
                stats.messages += 1;

                match decoder::decode(&raw) {
                    Ok(value) => match dispatch(value, &updaters) {
                        DispatchOutcome::Adc | DispatchOutcome::Battery => stats.dispatched += 1,
                        DispatchOutcome::Unrecognized => stats.unrecognized += 1,
                        DispatchOutcome::Rejected => stats.rejected += 1,
                    },
                    Err(e) => {
                        stats.decode_failures += 1;
                        warn!(error = %e, "Failed to decode message");
                    }
                }
            }
            state_tx.send_replace(DriverState::Reading);
        }

        drop(reader);
        state_tx.send_replace(DriverState::Closed);
        info!(
            chunks = stats.chunks,
            messages = stats.messages,
            dispatched = stats.dispatched,
            decode_failures = stats.decode_failures,
            "Read cycle ended"
        );
        stats
    }
}
