//! Typed payloads carried by device messages

use serde::{Deserialize, Serialize};

/// Acoustic measurement block reported by the meter's ADC.
///
/// Field names on the wire follow the firmware (`rmsV`, `rmsP`, `dBSPL`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcPayload {
    /// Raw microphone samples in volts, oldest first
    pub voltages: Vec<f64>,

    /// RMS of the sample window in volts
    #[serde(rename = "rmsV")]
    pub rms_v: f64,

    /// RMS sound pressure in pascals
    #[serde(rename = "rmsP")]
    pub rms_p: f64,

    /// Sound pressure level in dB SPL
    #[serde(rename = "dBSPL")]
    pub db_spl: f64,
}

impl AdcPayload {
    /// Number of samples in the window
    pub fn sample_count(&self) -> usize {
        self.voltages.len()
    }
}

/// Battery voltage reported by the meter, in volts.
pub type BatteryVoltage = f64;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adc_payload_reads_firmware_field_names() {
        let value = json!({"voltages": [1, 2], "rmsV": 0.5, "rmsP": 0.1, "dBSPL": 40});

        let payload: AdcPayload = serde_json::from_value(value).unwrap();

        assert_eq!(payload.voltages, vec![1.0, 2.0]);
        assert_eq!(payload.rms_v, 0.5);
        assert_eq!(payload.rms_p, 0.1);
        assert_eq!(payload.db_spl, 40.0);
        assert_eq!(payload.sample_count(), 2);
    }

    #[test]
    fn adc_payload_writes_firmware_field_names() {
        let payload =
            AdcPayload { voltages: vec![0.25], rms_v: 0.25, rms_p: 0.02, db_spl: 60.0 };

        let json = serde_json::to_string(&payload).unwrap();

        assert!(json.contains(r#""rmsV":0.25"#));
        assert!(json.contains(r#""dBSPL":60.0"#));
    }

    #[test]
    fn adc_payload_missing_field_is_rejected() {
        let value = json!({"voltages": [], "rmsV": 0.5, "rmsP": 0.1});

        assert!(serde_json::from_value::<AdcPayload>(value).is_err());
    }
}
