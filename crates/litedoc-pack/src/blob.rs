//! Blob reference metadata stored inline in a document.

/// Pointer to binary content that lives outside the document.
///
/// Only the metadata is encoded; the content itself is fetched through a
/// blob store when someone asks for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobRef {
    /// Content address, e.g. `sha1-<base64>`.
    pub digest: String,
    /// Content length in bytes.
    pub length: u64,
    pub content_type: Option<String>,
}

impl BlobRef {
    pub const DIGEST_KEY: &'static str = "digest";
    pub const LENGTH_KEY: &'static str = "length";
    pub const CONTENT_TYPE_KEY: &'static str = "content_type";

    pub fn new(digest: impl Into<String>, length: u64) -> Self {
        Self {
            digest: digest.into(),
            length,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
