//! Message body decoding

use serde_json::Value;

use crate::{LinkError, Result};

/// Parse one complete message body as JSON.
///
/// The value is returned as-is for classification. A malformed body yields
/// [`LinkError::Decode`] carrying the offending text; callers treat it as a
/// per-message failure.
pub fn decode(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| LinkError::decode(raw, e))
}
