//! Book-keeping for the connection currently driving the link

use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::driver::{DriverState, DriverStats};
use crate::transport::ChunkWriter;

/// Write half shared by concurrent callers; the mutex admits one writer at a time
pub(crate) type SharedWriter = Arc<Mutex<Box<dyn ChunkWriter>>>;

/// The active connection. Replaced wholesale when a new device is attached.
pub(crate) struct ActiveSession {
    pub id: u64,
    pub port_name: String,
    pub liveness: CancellationToken,
    pub writer: Option<SharedWriter>,
    pub driver_state: watch::Receiver<DriverState>,
    pub finished: JoinHandle<DriverStats>,
}

impl ActiveSession {
    pub fn driver_state(&self) -> DriverState {
        *self.driver_state.borrow()
    }

    /// Readable: the driver has not closed
    pub fn is_open(&self) -> bool {
        self.driver_state() != DriverState::Closed
    }
}
