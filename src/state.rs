//! Last-known meter readings, published over watch channels

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dispatch::StateUpdaters;
use crate::types::{AdcPayload, BatteryVoltage};

/// Application state written by the dispatcher.
///
/// Each field holds only the most recent value of its message kind. Readers
/// subscribe to the watch channels; windowing for charts is the reader's job.
#[derive(Debug)]
pub struct MeterState {
    adc: watch::Sender<Option<Arc<AdcPayload>>>,
    battery: watch::Sender<Option<BatteryVoltage>>,
    /// Serializes session retirement against state writes
    gate: Mutex<()>,
}

impl Default for MeterState {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterState {
    pub fn new() -> Self {
        let (adc, _) = watch::channel(None);
        let (battery, _) = watch::channel(None);
        Self { adc, battery, gate: Mutex::new(()) }
    }

    /// Receiver for ADC updates
    pub fn adc(&self) -> watch::Receiver<Option<Arc<AdcPayload>>> {
        self.adc.subscribe()
    }

    /// Receiver for battery updates
    pub fn battery(&self) -> watch::Receiver<Option<BatteryVoltage>> {
        self.battery.subscribe()
    }

    /// Most recent ADC block, if any has arrived
    pub fn latest_adc(&self) -> Option<Arc<AdcPayload>> {
        self.adc.borrow().clone()
    }

    /// Most recent battery voltage, if any has arrived
    pub fn latest_battery(&self) -> Option<BatteryVoltage> {
        *self.battery.borrow()
    }

    /// Updaters bound to one connection's liveness token.
    ///
    /// Once the token is retired through [`MeterState::retire`], every write
    /// through these updaters is dropped.
    pub fn session_updaters(self: &Arc<Self>, liveness: CancellationToken) -> SessionUpdaters {
        SessionUpdaters { state: Arc::clone(self), liveness }
    }

    /// Cancel `liveness` so that no write through its updaters can land
    /// after this returns.
    pub fn retire(&self, liveness: &CancellationToken) {
        let _gate = self.lock_gate();
        liveness.cancel();
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateUpdaters for MeterState {
    fn set_adc_values(&self, payload: AdcPayload) {
        self.adc.send_replace(Some(Arc::new(payload)));
    }

    fn set_battery_value(&self, voltage: BatteryVoltage) {
        self.battery.send_replace(Some(voltage));
    }
}

/// [`StateUpdaters`] that refuse writes once their connection is superseded
#[derive(Debug, Clone)]
pub struct SessionUpdaters {
    state: Arc<MeterState>,
    liveness: CancellationToken,
}

impl SessionUpdaters {
    pub fn is_live(&self) -> bool {
        !self.liveness.is_cancelled()
    }
}

impl StateUpdaters for SessionUpdaters {
    fn set_adc_values(&self, payload: AdcPayload) {
        let _gate = self.state.lock_gate();
        if self.liveness.is_cancelled() {
            debug!("Dropping ADC update from superseded connection");
            return;
        }
        self.state.set_adc_values(payload);
    }

    fn set_battery_value(&self, voltage: BatteryVoltage) {
        let _gate = self.state.lock_gate();
        if self.liveness.is_cancelled() {
            debug!("Dropping battery update from superseded connection");
            return;
        }
        self.state.set_battery_value(voltage);
    }
}
