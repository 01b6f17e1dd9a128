//! Byte buffer primitives shared by the litedoc codec and document model.
//!
//! - [`Writer`] appends big-endian numbers and raw bytes into a growable buffer.
//! - [`Reader`] walks a borrowed slice with a cursor and never reads past `end`.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of buffer: need {needed} bytes at offset {offset}, have {available}")]
    EndOfBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Returns `true` when `value` survives a round trip through `f32`.
#[inline]
pub fn is_float32(value: f64) -> bool {
    (value as f32) as f64 == value || value.is_nan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float32_detection() {
        assert!(is_float32(3.5));
        assert!(is_float32(0.0));
        assert!(is_float32(f64::INFINITY));
        assert!(!is_float32(0.1));
        assert!(!is_float32(1.0e300));
    }
}
