//! Growable binary writer.

/// Appends big-endian numbers and raw bytes to an owned buffer.
///
/// The buffer starts with `alloc_size` bytes of reserved capacity and grows
/// as needed. [`Writer::flush`] hands out everything written since the last
/// flush, so one writer can produce several independent outputs.
///
/// # Example
///
/// ```
/// use litedoc_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// assert_eq!(writer.flush(), [0x01, 0x02, 0x03]);
/// ```
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a writer with a 4KB initial reservation.
    pub fn new() -> Self {
        Self::with_alloc_size(4 * 1024)
    }

    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(alloc_size),
            alloc_size,
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes written since the last flush, without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Ensures at least `capacity` more bytes can be written without reallocating.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if self.buf.capacity() - self.buf.len() < capacity {
            self.buf.reserve(capacity.max(self.alloc_size));
        }
    }

    /// Drops everything written since the last flush.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Returns the bytes written since the last flush and starts a new output.
    pub fn flush(&mut self) -> Vec<u8> {
        std::mem::replace(&mut self.buf, Vec::with_capacity(self.alloc_size))
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    /// Writes an unsigned 16-bit integer (big-endian).
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes an unsigned 32-bit integer (big-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes an unsigned 64-bit integer (big-endian).
    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a 32-bit floating point number (big-endian).
    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a 64-bit floating point number (big-endian).
    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.buf.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a u8 followed by a u16 (big-endian).
    pub fn u8u16(&mut self, u8_val: u8, u16_val: u16) {
        self.ensure_capacity(3);
        self.u8(u8_val);
        self.u16(u16_val);
    }

    /// Writes a u8 followed by a u32 (big-endian).
    pub fn u8u32(&mut self, u8_val: u8, u32_val: u32) {
        self.ensure_capacity(5);
        self.u8(u8_val);
        self.u32(u32_val);
    }

    /// Writes a u8 followed by a u64 (big-endian).
    pub fn u8u64(&mut self, u8_val: u8, u64_val: u64) {
        self.ensure_capacity(9);
        self.u8(u8_val);
        self.u64(u64_val);
    }

    /// Writes a u8 followed by a f32 (big-endian).
    pub fn u8f32(&mut self, u8_val: u8, f32_val: f32) {
        self.ensure_capacity(5);
        self.u8(u8_val);
        self.f32(f32_val);
    }

    /// Writes a u8 followed by a f64 (big-endian).
    pub fn u8f64(&mut self, u8_val: u8, f64_val: f64) {
        self.ensure_capacity(9);
        self.u8(u8_val);
        self.f64(f64_val);
    }

    /// Writes a byte slice verbatim.
    pub fn buf(&mut self, buf: &[u8]) {
        self.buf.extend_from_slice(buf);
    }

    /// Writes the UTF-8 bytes of `s`. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.buf.extend_from_slice(s.as_bytes());
        s.len()
    }
}
