//! Shallow decoding primitives.
//!
//! [`decode`] reads exactly one item header and reports where the item and
//! each of its direct children live in the buffer. Nothing below the first
//! level is interpreted, which is what lets the document model materialize
//! values one slot at a time.

use std::collections::HashSet;
use std::ops::Range;
use std::str;

use litedoc_buffers::Reader;

use crate::blob::BlobRef;
use crate::constants::*;
use crate::error::PackError;

/// Logical kind of an encoded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Null,
    Bool,
    Int,
    Float,
    Bytes,
    Text,
    Array,
    Map,
    Blob,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Null => "null",
            Tag::Bool => "bool",
            Tag::Int => "int",
            Tag::Float => "float",
            Tag::Bytes => "bytes",
            Tag::Text => "text",
            Tag::Array => "array",
            Tag::Map => "map",
            Tag::Blob => "blob",
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(self, Tag::Array | Tag::Map)
    }
}

/// Decoded scalar value borrowing from the encoded buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Text(&'a str),
    Bytes(&'a [u8]),
}

/// One item located by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub tag: Tag,
    /// Full extent of the item, header included.
    pub range: Range<usize>,
    /// Direct children: array elements, or map keys and values interleaved
    /// (`k0, v0, k1, v1, ...`), or the wrapped map of a blob reference.
    pub children: Vec<Range<usize>>,
    head: u8,
    arg: u64,
    body: usize,
}

impl Decoded {
    /// The encoded bytes of this item.
    pub fn raw<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.range.clone()]
    }

    /// Number of logical entries: elements for arrays, pairs for maps.
    pub fn count(&self) -> usize {
        match self.tag {
            Tag::Map => self.children.len() / 2,
            Tag::Array => self.children.len(),
            _ => 0,
        }
    }
}

struct Header {
    head: u8,
    major: u8,
    info: u8,
    arg: u64,
    body: usize,
}

fn read_header(buf: &[u8], offset: usize) -> Result<Header, PackError> {
    let mut reader = Reader::from_slice(buf, offset, buf.len());
    let head = reader.u8()?;
    let major = head >> 5;
    let info = head & 0x1f;
    let arg = match info {
        0..=23 => info as u64,
        24 => reader.u8()? as u64,
        25 => reader.u16()? as u64,
        26 => reader.u32()? as u64,
        27 => reader.u64()?,
        INDEFINITE => {
            return Err(PackError::Unsupported {
                offset,
                what: "indefinite-length item",
            })
        }
        _ => return Err(PackError::Reserved { info, offset }),
    };
    Ok(Header {
        head,
        major,
        info,
        arg,
        body: reader.x,
    })
}

fn skip_payload(buf: &[u8], x: usize, len: u64) -> Result<usize, PackError> {
    let len = usize::try_from(len).map_err(|_| PackError::Unsupported {
        offset: x,
        what: "payload longer than address space",
    })?;
    let mut reader = Reader::from_slice(buf, x, buf.len());
    reader.skip(len)?;
    Ok(reader.x)
}

fn simple_tag(info: u8, offset: usize) -> Result<Tag, PackError> {
    match info {
        20 | 21 => Ok(Tag::Bool),
        22 => Ok(Tag::Null),
        25..=27 => Ok(Tag::Float),
        _ => Err(PackError::Unsupported {
            offset,
            what: "simple value",
        }),
    }
}

fn add_pending(pending: u64, more: Option<u64>, offset: usize) -> Result<u64, PackError> {
    more.and_then(|more| pending.checked_add(more))
        .ok_or(PackError::Unsupported {
            offset,
            what: "item count overflow",
        })
}

/// Returns the offset just past the item starting at `offset`.
///
/// Walks nested items iteratively, so hostile nesting cannot exhaust the stack.
pub fn item_end(buf: &[u8], offset: usize) -> Result<usize, PackError> {
    let mut x = offset;
    let mut pending: u64 = 1;
    while pending > 0 {
        let start = x;
        let h = read_header(buf, x)?;
        pending -= 1;
        x = h.body;
        match h.major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE => {}
            MAJOR_BYTES | MAJOR_TEXT => x = skip_payload(buf, x, h.arg)?,
            MAJOR_ARRAY => pending = add_pending(pending, Some(h.arg), start)?,
            MAJOR_MAP => pending = add_pending(pending, h.arg.checked_mul(2), start)?,
            MAJOR_TAG => pending = add_pending(pending, Some(1), start)?,
            _ => {
                debug_assert_eq!(h.major, MAJOR_SIMPLE);
                simple_tag(h.info, start)?;
            }
        }
    }
    Ok(x)
}

fn child_ranges(buf: &[u8], mut x: usize, n: u64) -> Result<(Vec<Range<usize>>, usize), PackError> {
    // Every child takes at least one byte, so the remaining length caps the
    // allocation regardless of what the header claims.
    let cap = usize::try_from(n).unwrap_or(usize::MAX).min(buf.len().saturating_sub(x));
    let mut children = Vec::with_capacity(cap);
    for _ in 0..n {
        let end = item_end(buf, x)?;
        children.push(x..end);
        x = end;
    }
    Ok((children, x))
}

/// Decodes the item at `offset`: its tag, its byte range and the byte ranges
/// of its direct children.
pub fn decode(buf: &[u8], offset: usize) -> Result<Decoded, PackError> {
    let h = read_header(buf, offset)?;
    let (tag, children, end) = match h.major {
        MAJOR_UNSIGNED => (Tag::Int, Vec::new(), h.body),
        MAJOR_NEGATIVE => {
            if h.arg > i64::MAX as u64 {
                return Err(PackError::IntegerOverflow { offset });
            }
            (Tag::Int, Vec::new(), h.body)
        }
        MAJOR_BYTES => (Tag::Bytes, Vec::new(), skip_payload(buf, h.body, h.arg)?),
        MAJOR_TEXT => (Tag::Text, Vec::new(), skip_payload(buf, h.body, h.arg)?),
        MAJOR_ARRAY => {
            let (children, end) = child_ranges(buf, h.body, h.arg)?;
            (Tag::Array, children, end)
        }
        MAJOR_MAP => {
            let n = h.arg.checked_mul(2).ok_or(PackError::Unsupported {
                offset,
                what: "item count overflow",
            })?;
            let (children, end) = child_ranges(buf, h.body, n)?;
            (Tag::Map, children, end)
        }
        MAJOR_TAG => {
            if h.arg != BLOB_TAG {
                return Err(PackError::Unsupported {
                    offset,
                    what: "semantic tag",
                });
            }
            let end = item_end(buf, h.body)?;
            (Tag::Blob, vec![h.body..end], end)
        }
        _ => (simple_tag(h.info, offset)?, Vec::new(), h.body),
    };
    Ok(Decoded {
        tag,
        range: offset..end,
        children,
        head: h.head,
        arg: h.arg,
        body: h.body,
    })
}

fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = ((bits >> 10) & 0x1f) as i32;
    let mant = (bits & 0x3ff) as f64;
    let magnitude = match exp {
        0 => mant * 2f64.powi(-24),
        31 if mant == 0.0 => f64::INFINITY,
        31 => f64::NAN,
        _ => (1.0 + mant / 1024.0) * 2f64.powi(exp - 15),
    };
    sign * magnitude
}

/// Reads the scalar value of an item returned by [`decode`].
pub fn read_scalar<'a>(buf: &'a [u8], item: &Decoded) -> Result<Scalar<'a>, PackError> {
    let offset = item.range.start;
    Ok(match item.tag {
        Tag::Null => Scalar::Null,
        Tag::Bool => Scalar::Bool(item.head == TRUE),
        Tag::Int if item.head >> 5 == MAJOR_NEGATIVE => Scalar::Int(-1 - item.arg as i64),
        Tag::Int if item.arg > i64::MAX as u64 => Scalar::UInt(item.arg),
        Tag::Int => Scalar::Int(item.arg as i64),
        Tag::Float => match item.head {
            FLOAT16 => Scalar::Float(f16_to_f64(item.arg as u16)),
            FLOAT32 => Scalar::Float(f32::from_bits(item.arg as u32) as f64),
            _ => Scalar::Float(f64::from_bits(item.arg)),
        },
        Tag::Text => {
            let bytes = &buf[item.body..item.range.end];
            Scalar::Text(str::from_utf8(bytes).map_err(|_| PackError::InvalidUtf8 { offset })?)
        }
        Tag::Bytes => Scalar::Bytes(&buf[item.body..item.range.end]),
        Tag::Array | Tag::Map | Tag::Blob => {
            return Err(PackError::UnexpectedType {
                expected: "scalar",
                found: item.tag.name(),
            })
        }
    })
}

fn read_key(buf: &[u8], offset: usize) -> Result<&str, PackError> {
    let key = decode(buf, offset)?;
    match read_scalar(buf, &key)? {
        Scalar::Text(k) => Ok(k),
        _ => Err(PackError::NonTextKey { offset }),
    }
}

/// Reads the blob reference wrapped by a [`Tag::Blob`] item.
///
/// Unknown keys inside the reference map are ignored.
pub fn read_blob_ref(buf: &[u8], item: &Decoded) -> Result<BlobRef, PackError> {
    let offset = item.range.start;
    let invalid = |reason| PackError::InvalidBlob { offset, reason };
    if item.tag != Tag::Blob {
        return Err(PackError::UnexpectedType {
            expected: "blob",
            found: item.tag.name(),
        });
    }
    let inner = decode(buf, item.children[0].start)?;
    if inner.tag != Tag::Map {
        return Err(invalid("payload is not a map"));
    }
    let mut digest = None;
    let mut length = None;
    let mut content_type = None;
    for pair in inner.children.chunks(2) {
        let value = decode(buf, pair[1].start)?;
        match read_key(buf, pair[0].start)? {
            BlobRef::DIGEST_KEY => match read_scalar(buf, &value)? {
                Scalar::Text(d) => digest = Some(d.to_owned()),
                _ => return Err(invalid("digest is not text")),
            },
            BlobRef::LENGTH_KEY => match read_scalar(buf, &value)? {
                Scalar::Int(n) if n >= 0 => length = Some(n as u64),
                Scalar::UInt(n) => length = Some(n),
                _ => return Err(invalid("length is not an unsigned integer")),
            },
            BlobRef::CONTENT_TYPE_KEY => match read_scalar(buf, &value)? {
                Scalar::Text(t) => content_type = Some(t.to_owned()),
                Scalar::Null => {}
                _ => return Err(invalid("content_type is not text")),
            },
            _ => {}
        }
    }
    Ok(BlobRef {
        digest: digest.ok_or_else(|| invalid("missing digest"))?,
        length: length.ok_or_else(|| invalid("missing length"))?,
        content_type,
    })
}

/// Levels of arrays and maps in the item at `offset`: 0 for a scalar or
/// blob reference, 1 for a collection of scalars, and so on.
///
/// Iterative like [`item_end`].
pub fn nesting_depth(buf: &[u8], offset: usize) -> Result<usize, PackError> {
    let mut x = offset;
    // Items still expected by each open collection, innermost last.
    let mut open: Vec<u64> = Vec::new();
    let mut deepest = 0;
    let mut root = true;
    loop {
        while open.last() == Some(&0) {
            open.pop();
        }
        match open.last_mut() {
            Some(remaining) => *remaining -= 1,
            None if root => root = false,
            None => break,
        }
        let start = x;
        let h = read_header(buf, x)?;
        x = h.body;
        match h.major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE => {}
            MAJOR_BYTES | MAJOR_TEXT => x = skip_payload(buf, x, h.arg)?,
            MAJOR_ARRAY => open.push(h.arg),
            MAJOR_MAP => open.push(add_pending(0, h.arg.checked_mul(2), start)?),
            MAJOR_TAG => x = item_end(buf, start)?,
            _ => {
                debug_assert_eq!(h.major, MAJOR_SIMPLE);
                simple_tag(h.info, start)?;
            }
        }
        deepest = deepest.max(open.len());
    }
    Ok(deepest)
}

/// An array or map whose children are still being checked.
struct Level<'a> {
    remaining: u64,
    /// Keys seen so far; `None` for arrays.
    keys: Option<HashSet<&'a str>>,
}

/// Checks that `buf` holds exactly one well-formed item.
///
/// Verifies extents, UTF-8 of every text item, text-only and unique map
/// keys, blob reference shape, and that collections nest at most
/// `max_depth` levels. Nesting is tracked on the heap, so `max_depth` may be
/// arbitrarily large.
pub fn validate(buf: &[u8], max_depth: usize) -> Result<(), PackError> {
    let mut x = 0;
    let mut levels: Vec<Level<'_>> = Vec::new();
    let mut root = true;
    loop {
        while levels.last().is_some_and(|level| level.remaining == 0) {
            levels.pop();
        }
        let is_key = match levels.last_mut() {
            Some(level) => {
                let is_key = level.keys.is_some() && level.remaining % 2 == 0;
                level.remaining -= 1;
                is_key
            }
            None if root => {
                root = false;
                false
            }
            None => break,
        };
        let start = x;
        if is_key {
            let key = read_key(buf, start)?;
            if let Some(keys) = levels.last_mut().and_then(|level| level.keys.as_mut()) {
                if !keys.insert(key) {
                    return Err(PackError::DuplicateKey {
                        key: key.to_owned(),
                        offset: start,
                    });
                }
            }
            x = item_end(buf, start)?;
            continue;
        }
        let h = read_header(buf, start)?;
        x = h.body;
        match h.major {
            MAJOR_UNSIGNED => {}
            MAJOR_NEGATIVE => {
                if h.arg > i64::MAX as u64 {
                    return Err(PackError::IntegerOverflow { offset: start });
                }
            }
            MAJOR_BYTES => x = skip_payload(buf, x, h.arg)?,
            MAJOR_TEXT => {
                x = skip_payload(buf, x, h.arg)?;
                str::from_utf8(&buf[h.body..x]).map_err(|_| PackError::InvalidUtf8 { offset: start })?;
            }
            MAJOR_ARRAY | MAJOR_MAP => {
                if levels.len() + 1 > max_depth {
                    return Err(PackError::TooDeep { max_depth, offset: start });
                }
                let (remaining, keys) = if h.major == MAJOR_MAP {
                    (add_pending(0, h.arg.checked_mul(2), start)?, Some(HashSet::new()))
                } else {
                    (h.arg, None)
                };
                levels.push(Level { remaining, keys });
            }
            MAJOR_TAG => {
                let item = decode(buf, start)?;
                read_blob_ref(buf, &item)?;
                x = item.range.end;
            }
            _ => {
                debug_assert_eq!(h.major, MAJOR_SIMPLE);
                simple_tag(h.info, start)?;
            }
        }
    }
    if x != buf.len() {
        return Err(PackError::TrailingBytes {
            trailing: buf.len() - x,
        });
    }
    Ok(())
}
