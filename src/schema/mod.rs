//! Schema registry for device messages.
//!
//! Every message is a JSON object `{ "path": <discriminant>, "value": <payload> }`.
//! [`classify`] looks only at the discriminant; the payload is interpreted by
//! the dispatcher once the kind is known.

mod registry;

pub use registry::{DISCRIMINANT_FIELD, MessageKind, PAYLOAD_FIELD, classify};
