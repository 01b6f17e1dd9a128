//! Materialized ("native") values.

use std::sync::Arc;

use litedoc_pack::BlobRef;

use crate::node::NodeId;

/// The in-memory form of one slot.
///
/// Strings, byte strings and blobs are reference counted: every read of an
/// unmodified slot hands out a clone of the same allocation, so callers can
/// rely on `Arc::ptr_eq` for identity. Nested collections are referenced by
/// [`NodeId`] and stay the same node until their slot is overwritten.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Blob(Blob),
    Array(NodeId),
    Dictionary(NodeId),
}

impl Native {
    /// The nested collection held by this value, if any.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Native::Array(id) | Native::Dictionary(id) => Some(*id),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Native::Null => "null",
            Native::Bool(_) => "bool",
            Native::Int(_) | Native::UInt(_) => "int",
            Native::Float(_) => "float",
            Native::String(_) => "string",
            Native::Bytes(_) => "bytes",
            Native::Blob(_) => "blob",
            Native::Array(_) => "array",
            Native::Dictionary(_) => "dictionary",
        }
    }
}

/// Numeric view returned by the `get_number` accessors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    /// Truncates floats toward zero; saturates at the `i64` bounds.
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::UInt(u) => i64::try_from(u).unwrap_or(i64::MAX),
            Number::Float(f) => f as i64,
        }
    }
}

/// A binary attachment stored outside the document.
///
/// Holding a `Blob` never touches the blob store; use
/// [`crate::Document::blob_content`] to fetch the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob(Arc<BlobRef>);

impl Blob {
    pub fn new(reference: BlobRef) -> Self {
        Self(Arc::new(reference))
    }

    pub fn reference(&self) -> &BlobRef {
        &self.0
    }

    pub fn digest(&self) -> &str {
        &self.0.digest
    }

    pub fn length(&self) -> u64 {
        self.0.length
    }

    pub fn content_type(&self) -> Option<&str> {
        self.0.content_type.as_deref()
    }

    pub fn ptr_eq(&self, other: &Blob) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<BlobRef> for Blob {
    fn from(reference: BlobRef) -> Self {
        Blob::new(reference)
    }
}

impl From<bool> for Native {
    fn from(b: bool) -> Self {
        Native::Bool(b)
    }
}

impl From<i32> for Native {
    fn from(i: i32) -> Self {
        Native::Int(i as i64)
    }
}

impl From<i64> for Native {
    fn from(i: i64) -> Self {
        Native::Int(i)
    }
}

impl From<u64> for Native {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Native::Int(i),
            Err(_) => Native::UInt(u),
        }
    }
}

impl From<f32> for Native {
    fn from(f: f32) -> Self {
        Native::Float(f as f64)
    }
}

impl From<f64> for Native {
    fn from(f: f64) -> Self {
        Native::Float(f)
    }
}

impl From<&str> for Native {
    fn from(s: &str) -> Self {
        Native::String(Arc::from(s))
    }
}

impl From<String> for Native {
    fn from(s: String) -> Self {
        Native::String(Arc::from(s))
    }
}

impl From<Vec<u8>> for Native {
    fn from(b: Vec<u8>) -> Self {
        Native::Bytes(Arc::from(b))
    }
}

impl From<Blob> for Native {
    fn from(b: Blob) -> Self {
        Native::Blob(b)
    }
}

impl From<BlobRef> for Native {
    fn from(r: BlobRef) -> Self {
        Native::Blob(Blob::new(r))
    }
}

impl<T: Into<Native>> From<Option<T>> for Native {
    fn from(v: Option<T>) -> Self {
        v.map_or(Native::Null, Into::into)
    }
}
