//! Message classification by discriminant

use serde_json::Value;

/// Field holding the message discriminant
pub const DISCRIMINANT_FIELD: &str = "path";

/// Field holding the message payload
pub const PAYLOAD_FIELD: &str = "value";

/// The closed set of message kinds the meter sends.
///
/// Adding a message type means adding a variant here; every `match` on
/// `MessageKind` then fails to compile until it handles the new kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// `"path": "ADC"`
    Adc,

    /// `"path": "BAT"`
    Battery,

    /// Any other discriminant. Holds the raw `path` value (`Null` when the
    /// field is missing or the message is not an object).
    Unrecognized { path: Value },
}

impl MessageKind {
    /// Discriminant string for recognized kinds
    pub fn discriminant(&self) -> Option<&'static str> {
        match self {
            MessageKind::Adc => Some("ADC"),
            MessageKind::Battery => Some("BAT"),
            MessageKind::Unrecognized { .. } => None,
        }
    }
}

/// Classify a decoded message by the exact string value of its `path` field.
///
/// Total: every value maps to exactly one kind.
pub fn classify(value: &Value) -> MessageKind {
    match value.get(DISCRIMINANT_FIELD) {
        Some(Value::String(path)) if path == "ADC" => MessageKind::Adc,
        Some(Value::String(path)) if path == "BAT" => MessageKind::Battery,
        Some(other) => MessageKind::Unrecognized { path: other.clone() },
        None => MessageKind::Unrecognized { path: Value::Null },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn adc_and_bat_are_recognized() {
        assert_eq!(classify(&json!({"path": "ADC", "value": {}})), MessageKind::Adc);
        assert_eq!(classify(&json!({"path": "BAT", "value": 3.7})), MessageKind::Battery);
    }

    #[test]
    fn matching_is_exact() {
        for path in ["adc", "Bat", " ADC", "ADC\r", "BATT", ""] {
            let kind = classify(&json!({"path": path, "value": 1}));
            assert_eq!(kind, MessageKind::Unrecognized { path: json!(path) }, "path {path:?}");
        }
    }

    #[test]
    fn missing_or_non_string_path_is_unrecognized() {
        assert_eq!(
            classify(&json!({"value": 1})),
            MessageKind::Unrecognized { path: Value::Null }
        );
        assert_eq!(
            classify(&json!({"path": 7, "value": 1})),
            MessageKind::Unrecognized { path: json!(7) }
        );
        assert_eq!(classify(&json!([1, 2, 3])), MessageKind::Unrecognized { path: Value::Null });
        assert_eq!(classify(&json!("ADC")), MessageKind::Unrecognized { path: Value::Null });
    }

    #[test]
    fn recognized_kinds_report_their_discriminant() {
        assert_eq!(MessageKind::Adc.discriminant(), Some("ADC"));
        assert_eq!(MessageKind::Battery.discriminant(), Some("BAT"));
        assert_eq!(MessageKind::Unrecognized { path: Value::Null }.discriminant(), None);
    }

    proptest! {
        #[test]
        fn classification_is_total(path in ".*", payload in any::<f64>()) {
            let kind = classify(&json!({"path": path.clone(), "value": payload}));

            match path.as_str() {
                "ADC" => prop_assert_eq!(kind, MessageKind::Adc),
                "BAT" => prop_assert_eq!(kind, MessageKind::Battery),
                _ => prop_assert_eq!(kind, MessageKind::Unrecognized { path: json!(path.clone()) }),
            }
        }
    }
}
