use litedoc_pack::PackError;
use thiserror::Error;

use crate::blob::BlobStoreError;

/// Failures of the re-encoder. Output is never partially written when one of
/// these is returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error("cannot encode non-finite float {0}")]
    NonFiniteFloat(f64),
    #[error("value refers to a released collection")]
    StaleNode,
    #[error("source range {start}..{end} lies outside the encoded buffer")]
    SourceRange { start: usize, end: usize },
    #[error("source bytes could not be transcoded: {0}")]
    Decode(#[from] PackError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("index {index} out of range (count={count})")]
    OutOfRange { index: usize, count: usize },
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("blob resolution failed: {0}")]
    BlobResolution(#[from] BlobStoreError),
    #[error("malformed document: {0}")]
    Decode(#[from] PackError),
    #[error("collection handle refers to a released node")]
    StaleNode,
    #[error("node is not an array")]
    NotAnArray,
    #[error("node is not a dictionary")]
    NotADictionary,
    #[error("collection is already owned by another slot")]
    AlreadyAttached,
    #[error("assignment would make a collection contain itself")]
    Cycle,
    #[error("collections nest deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
