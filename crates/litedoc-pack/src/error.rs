use litedoc_buffers::BufferError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("truncated payload: {0}")]
    Truncated(#[from] BufferError),
    #[error("reserved additional info {info} at offset {offset}")]
    Reserved { info: u8, offset: usize },
    #[error("unsupported item at offset {offset}: {what}")]
    Unsupported { offset: usize, what: &'static str },
    #[error("negative integer at offset {offset} does not fit in i64")]
    IntegerOverflow { offset: usize },
    #[error("invalid UTF-8 in text at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("map key at offset {offset} is not text")]
    NonTextKey { offset: usize },
    #[error("duplicate map key {key:?} at offset {offset}")]
    DuplicateKey { key: String, offset: usize },
    #[error("nesting deeper than {max_depth} at offset {offset}")]
    TooDeep { max_depth: usize, offset: usize },
    #[error("malformed blob reference at offset {offset}: {reason}")]
    InvalidBlob { offset: usize, reason: &'static str },
    #[error("{trailing} trailing bytes after top-level item")]
    TrailingBytes { trailing: usize },
    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
}
