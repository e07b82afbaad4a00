//! Error types for the meter link.
//!
//! Every failure in this crate is recoverable. Connection-level errors
//! (`Open`, `Transport`, `NotConnected`, `NotWritable`) are returned to the
//! host so it can tell the user; message-level errors (`Decode`) are logged by
//! the stream driver and never escape the read loop.
//!
//! ## Error Categories
//!
//! - **Selection / Open**: the device could not be opened with the serial config
//! - **Transport**: a read or write on an open device failed
//! - **Decode**: a single message body was not valid JSON
//! - **Capability**: no device selector is available on this host
//! - **Config**: a [`LinkConfig`](crate::LinkConfig) value is unusable
//!
//! ```rust
//! use meterlink::LinkError;
//!
//! let error = LinkError::open_failed("port busy");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for link operations.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

/// Main error type for link operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LinkError {
    #[error("Failed to open device: {reason}")]
    Open {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transport error during {operation}")]
    Transport {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed message body: {raw:?}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No device connected")]
    NotConnected,

    #[error("Connected device is not writable")]
    NotWritable,

    #[error("{feature} is not supported on this host")]
    Unsupported { feature: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },
}

impl LinkError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LinkError::Open { .. } => true,
            LinkError::Transport { .. } => true,
            LinkError::NotConnected => true,
            LinkError::Decode { .. } => false,
            LinkError::NotWritable => false,
            LinkError::Unsupported { .. } => false,
            LinkError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LinkError::Open { .. } => vec![
                "Check that no other program holds the serial port",
                "Unplug and reconnect the meter",
                "Select the device again",
            ],
            LinkError::Transport { .. } => vec![
                "Check the USB cable",
                "Verify the meter is powered",
                "Select the device again",
            ],
            LinkError::Decode { .. } => vec![
                "Check the meter firmware prints one JSON object per line",
                "Verify the serial line runs at 115200 8N1",
            ],
            LinkError::NotConnected => vec!["Select a device before sending commands"],
            LinkError::NotWritable => vec![
                "Reopen the device with write access",
                "Check the port was not opened read-only",
            ],
            LinkError::Unsupported { .. } => vec![
                "Use a host that exposes serial devices",
                "Attach a port directly with MeterLink::attach",
            ],
            LinkError::Config { .. } => vec![
                "Use LinkConfig::default() as a starting point",
                "Check numeric settings are non-zero",
            ],
        }
    }

    /// Helper constructor for open failures.
    pub fn open_failed(reason: impl Into<String>) -> Self {
        LinkError::Open { reason: reason.into(), source: None }
    }

    /// Helper constructor for open failures with source.
    pub fn open_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        LinkError::Open { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for transport errors.
    pub fn transport(operation: impl Into<String>, source: std::io::Error) -> Self {
        LinkError::Transport { operation: operation.into(), source }
    }

    /// Helper constructor for decode failures.
    pub fn decode(raw: impl Into<String>, source: serde_json::Error) -> Self {
        LinkError::Decode { raw: raw.into(), source }
    }

    /// Helper constructor for unsupported capabilities.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        LinkError::Unsupported { feature: feature.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        LinkError::Config { details: details.into() }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Transport { operation: "<unknown>".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            operation in "\\w+",
            feature in "\\w+",
            details in ".*"
          ) {
            let open = LinkError::open_failed(reason.clone());
            let transport = LinkError::transport(operation.clone(), std::io::Error::other("boom"));
            let unsupported = LinkError::unsupported(feature.clone());
            let config = LinkError::config(details.clone());

            prop_assert!(open.to_string().contains(&reason));
            prop_assert!(transport.to_string().contains(&operation));
            prop_assert!(unsupported.to_string().contains(&feature));
            prop_assert!(config.to_string().contains(&details));
          }

          #[test]
          fn decode_errors_keep_the_offending_body(raw in "[^\"\\\\]*") {
            let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
            let error = LinkError::decode(raw.clone(), source);

            match &error {
              LinkError::Decode { raw: kept, .. } => prop_assert_eq!(kept, &raw),
              _ => prop_assert!(false, "Expected Decode variant"),
            }
            prop_assert!(std::error::Error::source(&error).is_some());
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<LinkError>();

        let error = LinkError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let open = LinkError::open_failed("busy");
        let not_writable = LinkError::NotWritable;
        let config = LinkError::config("zero baud rate");

        assert!(open.is_retryable());
        assert!(!not_writable.is_retryable());
        assert!(!config.is_retryable());

        for error in [&open, &not_writable, &config] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn open_failure_chains_its_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = LinkError::open_failed_with_source("/dev/ttyACM0", Box::new(io));

        let source = std::error::Error::source(&error).expect("source should be chained");
        assert_eq!(source.to_string(), "access denied");
    }

    #[test]
    fn from_io_error_maps_to_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error: LinkError = io.into();

        match error {
            LinkError::Transport { source, .. } => assert_eq!(source.to_string(), "pipe closed"),
            _ => panic!("Expected Transport error variant"),
        }
    }
}
