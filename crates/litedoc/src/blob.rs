//! Blob store collaborator.
//!
//! Documents only carry [`BlobRef`]s. The attachment bytes live in a
//! [`BlobStore`] and are fetched on demand through
//! [`crate::Document::blob_content`].

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use litedoc_pack::BlobRef;
use sha1::{Digest, Sha1};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("document has no blob store")]
    NoStore,
    #[error("blob {digest} not found")]
    NotFound { digest: String },
    #[error("blob {digest} has {actual} bytes, reference says {expected}")]
    LengthMismatch {
        digest: String,
        expected: u64,
        actual: u64,
    },
    #[error("blob store failure: {0}")]
    Backend(String),
}

/// Resolved attachment content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle(Arc<[u8]>);

impl BlobHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.0
    }
}

impl Deref for BlobHandle {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Source of attachment content, keyed by digest.
pub trait BlobStore: Send + Sync {
    fn resolve_blob(&self, reference: &BlobRef) -> Result<BlobHandle, BlobStoreError>;
}

/// `sha1-` followed by the base64 SHA-1 of `content`.
pub fn digest_of(content: &[u8]) -> String {
    let hash = Sha1::digest(content);
    format!("sha1-{}", STANDARD.encode(hash))
}

/// Blob store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, BlobHandle>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` and returns a reference to it.
    pub fn put(&self, content_type: Option<&str>, content: &[u8]) -> Result<BlobRef, BlobStoreError> {
        let digest = digest_of(content);
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        blobs
            .entry(digest.clone())
            .or_insert_with(|| BlobHandle::new(content));
        let reference = BlobRef::new(digest, content.len() as u64);
        Ok(match content_type {
            Some(ct) => reference.with_content_type(ct),
            None => reference,
        })
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn resolve_blob(&self, reference: &BlobRef) -> Result<BlobHandle, BlobStoreError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        let handle = blobs
            .get(&reference.digest)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound {
                digest: reference.digest.clone(),
            })?;
        if handle.len() as u64 != reference.length {
            return Err(BlobStoreError::LengthMismatch {
                digest: reference.digest.clone(),
                expected: reference.length,
                actual: handle.len() as u64,
            });
        }
        Ok(handle)
    }
}
