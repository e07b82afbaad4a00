//! Routes decoded messages to application state

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{trace, warn};

use crate::schema::{MessageKind, PAYLOAD_FIELD, classify};
use crate::types::{AdcPayload, BatteryVoltage};

/// State-update callbacks invoked by the dispatcher.
///
/// Implementations overwrite the last-known value; no history is kept here.
pub trait StateUpdaters: Send + Sync {
    /// Replace the last-known ADC block
    fn set_adc_values(&self, payload: AdcPayload);

    /// Replace the last-known battery voltage
    fn set_battery_value(&self, voltage: BatteryVoltage);
}

/// What [`dispatch`] did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// `set_adc_values` was called once
    Adc,
    /// `set_battery_value` was called once
    Battery,
    /// Unknown discriminant; nothing was called
    Unrecognized,
    /// Known discriminant but the payload did not have the expected shape;
    /// nothing was called
    Rejected,
}

impl DispatchOutcome {
    /// True when a state updater was invoked
    pub fn updated_state(self) -> bool {
        matches!(self, DispatchOutcome::Adc | DispatchOutcome::Battery)
    }
}

/// Classify `value` and hand its payload to the matching updater.
///
/// Exactly one updater call for a recognized message with a well-typed
/// payload, none otherwise. Unknown schemas are logged, not returned as errors.
pub fn dispatch<U>(value: Value, updaters: &U) -> DispatchOutcome
where
    U: StateUpdaters + ?Sized,
{
    match classify(&value) {
        MessageKind::Adc => match payload::<AdcPayload>(value) {
            Ok(adc) => {
                trace!(samples = adc.sample_count(), db_spl = adc.db_spl, "ADC update");
                updaters.set_adc_values(adc);
                DispatchOutcome::Adc
            }
            Err(e) => {
                warn!(error = %e, "ADC message with malformed payload dropped");
                DispatchOutcome::Rejected
            }
        },
        MessageKind::Battery => match payload::<BatteryVoltage>(value) {
            Ok(voltage) => {
                trace!(voltage, "Battery update");
                updaters.set_battery_value(voltage);
                DispatchOutcome::Battery
            }
            Err(e) => {
                warn!(error = %e, "BAT message with malformed payload dropped");
                DispatchOutcome::Rejected
            }
        },
        MessageKind::Unrecognized { path } => {
            warn!(%path, raw = %value, "Unrecognized message schema");
            DispatchOutcome::Unrecognized
        }
    }
}

/// Take the `value` field out of a message and deserialize it.
fn payload<T: DeserializeOwned>(mut message: Value) -> serde_json::Result<T> {
    let payload = message
        .as_object_mut()
        .and_then(|fields| fields.remove(PAYLOAD_FIELD))
        .unwrap_or(Value::Null);
    serde_json::from_value(payload)
}
