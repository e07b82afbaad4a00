//! Byte stream to message framing.
//!
//! Raw chunks from the transport go through [`Utf8ChunkDecoder`] and then
//! [`feed`], which splits the text on `\n` and returns the complete messages
//! plus the pending remainder.

mod assembler;
mod utf8;

pub use assembler::{BOUNDARY, Frames, feed};
pub use utf8::Utf8ChunkDecoder;
