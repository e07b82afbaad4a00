//! Newline frame assembly
//!
//! [`feed`] is a pure function of the previous pending text and the newly
//! decoded text. The caller owns the pending buffer and threads it from one
//! call to the next.

/// Message boundary on the wire
pub const BOUNDARY: char = '\n';

/// Output of one assembly step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frames {
    /// Complete messages in stream order, boundary stripped
    pub messages: Vec<String>,

    /// Text after the last boundary. Never contains a boundary.
    pub pending: String,
}

impl Frames {
    /// True when at least one complete message was produced
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }
}

/// Append `new_text` to `previous_pending` and split on [`BOUNDARY`].
///
/// Every segment but the last is a complete message; the last segment (empty
/// when the text ends with a boundary) becomes the new pending buffer. An
/// empty `new_text` still goes through the split and returns the pending
/// buffer unchanged with no messages.
pub fn feed(previous_pending: String, new_text: &str) -> Frames {
    let mut buffer = previous_pending;
    buffer.push_str(new_text);

    match buffer.rfind(BOUNDARY) {
        Some(last) => {
            let pending = buffer[last + BOUNDARY.len_utf8()..].to_string();
            buffer.truncate(last);
            let messages = buffer.split(BOUNDARY).map(str::to_string).collect();
            Frames { messages, pending }
        }
        None => Frames { messages: Vec::new(), pending: buffer },
    }
}
