//! Compact binary encoding for litedoc documents.
//!
//! The format is a strict subset of CBOR (RFC 8949): definite-length arrays
//! and text-keyed maps, integers, floats, byte and text strings, and a single
//! private tag for blob references. The document model only ever needs the
//! shallow [`decode`] primitive, the scalar readers, and the [`Encoder`].

mod blob;
mod constants;
mod decoder;
mod encoder;
mod error;

pub use blob::BlobRef;
pub use constants::{BLOB_TAG, DEFAULT_MAX_DEPTH};
pub use decoder::{decode, item_end, nesting_depth, read_blob_ref, read_scalar, validate, Decoded, Scalar, Tag};
pub use encoder::Encoder;
pub use error::PackError;
