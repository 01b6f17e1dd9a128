//! Lazily decoded, copy-on-write document collections.
//!
//! A [`Document`] wraps an immutable encoded buffer (see `litedoc_pack`) and
//! exposes its arrays and dictionaries through the [`Array`] and
//! [`Dictionary`] handles. Nothing is decoded until it is read; decoded
//! values are cached, so repeated reads hand back the same allocation.
//! Writes replace individual slots and mark the path up to the root as
//! touched. Encoding copies every untouched byte range of the original
//! buffer and writes only what changed.
//!
//! Collections live in an arena owned by the document and are referred to by
//! [`NodeId`]. Replacing or removing a slot releases the collection it held;
//! ids of released collections fail with [`Error::StaleNode`].
//!
//! `Document` is `Send + Sync`. Decoding reads take `&mut self`, so a shared
//! `&Document` only permits the read-only operations (`to_json`, `encode`).

mod array;
mod blob;
mod config;
pub mod convert;
mod dictionary;
mod document;
mod encode;
mod error;
mod json;
mod loader;
mod node;
mod slot;
mod tracker;
mod value;

pub use array::Array;
pub use blob::{digest_of, BlobHandle, BlobStore, BlobStoreError, MemoryBlobStore};
pub use config::DocumentConfig;
pub use dictionary::Dictionary;
pub use document::{Document, Stats};
pub use encode::EncodeReport;
pub use error::{EncodeError, Error, Result};
pub use json::{blob_from_json, blob_to_json, bytes_to_json};
pub use node::{NodeId, Owner};
pub use slot::SlotState;
pub use value::{Blob, Native, Number};

pub use litedoc_pack::{BlobRef, Encoder};
