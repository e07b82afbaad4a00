//! The link between one meter and the application

use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::session::ActiveSession;
use crate::driver::{Driver, DriverState, DriverStats};
use crate::state::MeterState;
use crate::transport::{DevicePort, DeviceSelector, Unsupported};
use crate::types::{AdcPayload, BatteryVoltage, Command, LinkConfig};
use crate::{LinkError, Result};

/// Connection to a sound level meter.
///
/// Owns at most one active device. Attaching a new device supersedes the
/// previous one: its read cycle is retired before the new one starts, and
/// nothing it reads afterwards reaches the application state.
///
/// Readings are published as the latest value per message kind and can be
/// consumed as streams ([`adc_updates`](Self::adc_updates),
/// [`battery_updates`](Self::battery_updates)) or snapshots.
pub struct MeterLink {
    selector: Arc<dyn DeviceSelector>,
    config: LinkConfig,
    state: Arc<MeterState>,
    session: Mutex<Option<ActiveSession>>,
    /// Parent of every connection's liveness token
    root: CancellationToken,
    next_id: AtomicU64,
}

impl MeterLink {
    /// Create a link that picks devices through `selector`.
    pub fn new(selector: Arc<dyn DeviceSelector>, config: LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            selector,
            config,
            state: Arc::new(MeterState::new()),
            session: Mutex::new(None),
            root: CancellationToken::new(),
            next_id: AtomicU64::new(0),
        })
    }

    /// Create a link with no device picker. Ports can still be attached directly.
    pub fn detached(config: LinkConfig) -> Result<Self> {
        Self::new(Arc::new(Unsupported), config)
    }

    /// Whether the host can offer serial devices
    pub fn is_supported(&self) -> bool {
        self.selector.is_supported()
    }

    /// Whether a device is attached and its stream is still open
    pub fn is_connected(&self) -> bool {
        self.lock_session().as_ref().is_some_and(ActiveSession::is_open)
    }

    /// Name of the attached device, if any
    pub fn port_name(&self) -> Option<String> {
        self.lock_session().as_ref().map(|s| s.port_name.clone())
    }

    /// State of the active read cycle; `Idle` when nothing is attached
    pub fn driver_state(&self) -> DriverState {
        self.lock_session().as_ref().map_or(DriverState::Idle, ActiveSession::driver_state)
    }

    /// Ask the user for a device and attach it.
    ///
    /// Returns `Ok(false)` when the user declines; the current connection is
    /// left as it is.
    pub async fn select_device(&self) -> Result<bool> {
        if !self.selector.is_supported() {
            warn!("Serial devices are not supported on this host");
            return Err(LinkError::unsupported("Serial device selection"));
        }

        match self.selector.request_port().await? {
            Some(port) => {
                self.attach(port).await?;
                Ok(true)
            }
            None => {
                info!("Device selection declined");
                Ok(false)
            }
        }
    }

    /// Open `port` and make it the active connection.
    ///
    /// If opening fails the error is logged and returned and any previous
    /// connection keeps running.
    pub async fn attach(&self, mut port: Box<dyn DevicePort>) -> Result<()> {
        let port_name = port.name();
        let opened = match port.open(&self.config.serial).await {
            Ok(opened) => opened,
            Err(e) => {
                error!(port = %port_name, error = %e, "Failed to open device");
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let writable = opened.writer.is_some();
        let liveness = self.root.child_token();

        let mut slot = self.lock_session();
        if let Some(previous) = slot.take() {
            self.state.retire(&previous.liveness);
            info!(connection = previous.id, port = %previous.port_name, "Connection superseded");
        }

        let channels = Driver::spawn(
            opened.reader,
            self.state.session_updaters(liveness.clone()),
            self.config.driver,
            liveness,
        );

        *slot = Some(ActiveSession {
            id,
            port_name: port_name.clone(),
            liveness: channels.cancel,
            writer: opened.writer.map(|w| Arc::new(tokio::sync::Mutex::new(w))),
            driver_state: channels.state,
            finished: channels.finished,
        });

        info!(connection = id, port = %port_name, writable, "Device connected");
        Ok(())
    }

    /// Close the active connection and wait for its read cycle to end.
    ///
    /// Returns the cycle's counters, or `None` when nothing was attached.
    pub async fn disconnect(&self) -> Option<DriverStats> {
        let session = self.lock_session().take()?;
        self.state.retire(&session.liveness);
        info!(connection = session.id, port = %session.port_name, "Disconnecting device");

        match session.finished.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!(connection = session.id, error = %e, "Read cycle task failed");
                None
            }
        }
    }

    /// Send `text` to the device verbatim.
    ///
    /// With no open connection, or a read-only one, the command is dropped
    /// and a warning is logged.
    pub async fn send_command(&self, text: &str) {
        if let Err(e) = self.try_send_command(text).await {
            warn!(command = text, error = %e, "Command dropped");
        }
    }

    /// Send one of the known commands
    pub async fn request(&self, command: Command) {
        self.send_command(command.as_str()).await
    }

    /// Like [`send_command`](Self::send_command) but reports why a command
    /// was not sent.
    ///
    /// Writes never interleave: each one holds the connection's writer until
    /// all of its bytes are out.
    pub async fn try_send_command(&self, text: &str) -> Result<()> {
        let (id, writer) = {
            let slot = self.lock_session();
            match slot.as_ref() {
                Some(session) if session.is_open() => (session.id, session.writer.clone()),
                _ => return Err(LinkError::NotConnected),
            }
        };
        let writer = writer.ok_or(LinkError::NotWritable)?;

        let mut writer = writer.lock().await;
        writer.write_chunk(text.as_bytes()).await?;
        debug!(connection = id, command = text, "Command sent");
        Ok(())
    }

    /// Stream of ADC blocks, starting with the current one if any
    pub fn adc_updates(&self) -> impl Stream<Item = Arc<AdcPayload>> + 'static {
        WatchStream::new(self.state.adc()).filter_map(|opt| async move { opt })
    }

    /// Stream of battery voltages, starting with the current one if any
    pub fn battery_updates(&self) -> impl Stream<Item = BatteryVoltage> + 'static {
        WatchStream::new(self.state.battery()).filter_map(|opt| async move { opt })
    }

    /// Driver state changes of the connection active at call time.
    ///
    /// Ends once that connection's read cycle has closed. With nothing
    /// attached it yields `Idle` and ends.
    pub fn state_updates(&self) -> impl Stream<Item = DriverState> + 'static {
        let receiver = match self.lock_session().as_ref() {
            Some(session) => session.driver_state.clone(),
            None => watch::channel(DriverState::Idle).1,
        };
        WatchStream::new(receiver)
    }

    /// Most recent ADC block
    pub fn latest_adc(&self) -> Option<Arc<AdcPayload>> {
        self.state.latest_adc()
    }

    /// Most recent battery voltage
    pub fn latest_battery(&self) -> Option<BatteryVoltage> {
        self.state.latest_battery()
    }

    /// The configuration this link was built with
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MeterLink {
    fn drop(&mut self) {
        debug!("Dropping meter link");
        // Cancel tasks on drop for clean shutdown
        self.root.cancel();
    }
}
