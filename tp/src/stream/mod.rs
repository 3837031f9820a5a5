//! Planning stream decoding
//!
//! Byte chunks go through [`Utf8Decoder`], the resulting text is accumulated
//! and run through [`decode`] to yield complete frames.

mod decoder;
mod utf8;

pub use decoder::{DEFAULT_EVENT, Decoded, Frame, decode};
pub use utf8::Utf8Decoder;
