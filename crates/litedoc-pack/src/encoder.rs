//! `Encoder`: canonical writer for the litedoc encoding.
//!
//! Output is canonical so that decoding and re-encoding an unmodified value
//! reproduces the same bytes:
//! - integers and lengths use the shortest header,
//! - floats use f32 when the value survives the narrowing, f64 otherwise,
//! - text uses its exact UTF-8 byte length.

use litedoc_buffers::{is_float32, Writer};

use crate::blob::BlobRef;
use crate::constants::*;
use crate::decoder::Scalar;

pub struct Encoder {
    pub writer: Writer,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(),
        }
    }

    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            writer: Writer::with_alloc_size(alloc_size),
        }
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        self.writer.as_slice()
    }

    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Takes the encoded output, leaving the encoder empty.
    pub fn finish(&mut self) -> Vec<u8> {
        self.writer.flush()
    }

    /// Discards anything written since the last [`Encoder::finish`].
    pub fn reset(&mut self) {
        self.writer.reset();
    }

    /// Writes a major type with its argument using the shortest header.
    pub fn write_major(&mut self, major: u8, n: u64) {
        let bits = major << 5;
        let w = &mut self.writer;
        if n <= 23 {
            w.u8(bits | n as u8);
        } else if n <= 0xff {
            w.ensure_capacity(2);
            w.u8(bits | 24);
            w.u8(n as u8);
        } else if n <= 0xffff {
            w.u8u16(bits | 25, n as u16);
        } else if n <= 0xffff_ffff {
            w.u8u32(bits | 26, n as u32);
        } else {
            w.u8u64(bits | 27, n);
        }
    }

    pub fn write_null(&mut self) {
        self.writer.u8(NULL);
    }

    pub fn write_boolean(&mut self, b: bool) {
        self.writer.u8(if b { TRUE } else { FALSE });
    }

    pub fn write_integer(&mut self, int: i64) {
        if int >= 0 {
            self.write_major(MAJOR_UNSIGNED, int as u64);
        } else {
            self.write_major(MAJOR_NEGATIVE, (-1 - int) as u64);
        }
    }

    pub fn write_u_integer(&mut self, uint: u64) {
        self.write_major(MAJOR_UNSIGNED, uint);
    }

    /// Uses f32 if the value fits losslessly, otherwise f64.
    pub fn write_float(&mut self, float: f64) {
        if is_float32(float) {
            self.writer.u8f32(FLOAT32, float as f32);
        } else {
            self.writer.u8f64(FLOAT64, float);
        }
    }

    pub fn write_bin(&mut self, buf: &[u8]) {
        self.write_major(MAJOR_BYTES, buf.len() as u64);
        self.writer.buf(buf);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_major(MAJOR_TEXT, s.len() as u64);
        self.writer.utf8(s);
    }

    pub fn write_arr_hdr(&mut self, length: usize) {
        self.write_major(MAJOR_ARRAY, length as u64);
    }

    /// Writes a map header; `length` counts key/value pairs.
    pub fn write_obj_hdr(&mut self, length: usize) {
        self.write_major(MAJOR_MAP, length as u64);
    }

    pub fn write_blob_ref(&mut self, blob: &BlobRef) {
        self.write_major(MAJOR_TAG, BLOB_TAG);
        let fields = if blob.content_type.is_some() { 3 } else { 2 };
        self.write_obj_hdr(fields);
        self.write_str(BlobRef::DIGEST_KEY);
        self.write_str(&blob.digest);
        self.write_str(BlobRef::LENGTH_KEY);
        self.write_u_integer(blob.length);
        if let Some(content_type) = &blob.content_type {
            self.write_str(BlobRef::CONTENT_TYPE_KEY);
            self.write_str(content_type);
        }
    }

    pub fn write_scalar(&mut self, scalar: &Scalar<'_>) {
        match *scalar {
            Scalar::Null => self.write_null(),
            Scalar::Bool(b) => self.write_boolean(b),
            Scalar::Int(i) => self.write_integer(i),
            Scalar::UInt(u) => self.write_u_integer(u),
            Scalar::Float(f) => self.write_float(f),
            Scalar::Text(s) => self.write_str(s),
            Scalar::Bytes(b) => self.write_bin(b),
        }
    }

    /// Copies already-encoded bytes into the output unchanged.
    pub fn write_raw(&mut self, raw: &[u8]) {
        self.writer.buf(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
        let mut enc = Encoder::new();
        f(&mut enc);
        enc.finish()
    }

    #[test]
    fn integers_use_shortest_header() {
        assert_eq!(encoded(|e| e.write_integer(0)), [0x00]);
        assert_eq!(encoded(|e| e.write_integer(23)), [0x17]);
        assert_eq!(encoded(|e| e.write_integer(24)), [0x18, 0x18]);
        assert_eq!(encoded(|e| e.write_integer(256)), [0x19, 0x01, 0x00]);
        assert_eq!(encoded(|e| e.write_integer(-1)), [0x20]);
        assert_eq!(encoded(|e| e.write_integer(-25)), [0x38, 0x18]);
        assert_eq!(
            encoded(|e| e.write_integer(i64::MIN)),
            [0x3b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn floats_narrow_when_lossless() {
        assert_eq!(encoded(|e| e.write_float(3.5)), [0xfa, 0x40, 0x60, 0x00, 0x00]);
        let wide = encoded(|e| e.write_float(0.1));
        assert_eq!(wide[0], 0xfb);
        assert_eq!(wide.len(), 9);
    }

    #[test]
    fn text_uses_exact_byte_length() {
        // Six 3-byte codepoints: 18 bytes, short header.
        let out = encoded(|e| e.write_str("€€€€€€"));
        assert_eq!(out[0], 0x60 | 18);
        assert_eq!(out.len(), 19);
    }

    #[test]
    fn blob_ref_layout() {
        let blob = BlobRef::new("sha1-x", 3);
        let out = encoded(|e| e.write_blob_ref(&blob));
        assert_eq!(&out[..4], &[0xd9, 0xb1, 0x0b, 0xa2]);
        let item = crate::decode(&out, 0).unwrap();
        assert_eq!(crate::read_blob_ref(&out, &item).unwrap(), blob);
    }
}
