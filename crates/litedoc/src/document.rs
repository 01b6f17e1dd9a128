//! The document: one encoded buffer plus the tree materialized from it.

use std::fmt;
use std::sync::Arc;

use litedoc_pack::{validate, Encoder};
use tracing::debug;

use crate::array::Array;
use crate::blob::{BlobHandle, BlobStore, BlobStoreError};
use crate::config::DocumentConfig;
use crate::dictionary::Dictionary;
use crate::encode::{EncodeReport, ReEncoder};
use crate::error::{EncodeError, Error, Result};
use crate::loader::Location;
use crate::node::{Arena, Body, Node, NodeId, Owner};
use crate::slot::{Slot, SlotState};
use crate::value::{Blob, Native};

/// Materialization counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Slots decoded from the encoded buffer.
    pub materialized: u64,
    /// Reads answered from an already loaded slot.
    pub cache_hits: u64,
    pub nodes_created: u64,
    pub nodes_released: u64,
}

/// A lazily decoded, mutable view over an immutable encoded buffer.
///
/// Values are decoded on first access and cached. Writes replace single
/// slots; encoding copies every untouched range of the original buffer and
/// only writes what changed. Cloning a document forks it: both copies share
/// the encoded buffer and diverge independently from there.
///
/// Reads that may decode take `&mut self`. Methods on `&self` never change
/// the tree, so a `&Document` can be shared between threads.
///
/// ```
/// use litedoc::Document;
///
/// // [1, "two", true]
/// let mut doc = Document::from_bytes(vec![0x83, 0x01, 0x63, b't', b'w', b'o', 0xf5]).unwrap();
/// let mut array = doc.root_array().unwrap();
/// assert_eq!(array.get_int(0).unwrap(), 1);
/// assert_eq!(array.get_string(1).unwrap().as_deref(), Some("two"));
///
/// array.set(1, 3.5).unwrap();
/// assert_eq!(doc.encode().unwrap(), [0x83, 0x01, 0xfa, 0x40, 0x60, 0x00, 0x00, 0xf5]);
/// ```
#[derive(Clone)]
pub struct Document {
    pub(crate) source: Arc<[u8]>,
    pub(crate) arena: Arena,
    pub(crate) root: Slot,
    pub(crate) config: DocumentConfig,
    pub(crate) blobs: Option<Arc<dyn BlobStore>>,
    pub(crate) stats: Stats,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("source_len", &self.source.len())
            .field("nodes", &self.arena.len())
            .field("root", &self.root.state())
            .field("config", &self.config)
            .field("blob_store", &self.blobs.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document whose root is null.
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        Self {
            source: Arc::from(Vec::new()),
            arena: Arena::default(),
            root: Slot::assigned(Native::Null),
            config,
            blobs: None,
            stats: Stats::default(),
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::from_bytes_with(bytes, DocumentConfig::default())
    }

    /// Wraps an encoded buffer after checking that it is well formed.
    /// Nothing is decoded yet.
    pub fn from_bytes_with(bytes: impl Into<Arc<[u8]>>, config: DocumentConfig) -> Result<Self> {
        let source: Arc<[u8]> = bytes.into();
        validate(&source, config.max_depth)?;
        debug!(len = source.len(), "opened document");
        Ok(Self {
            root: Slot::Unloaded(0..source.len()),
            source,
            arena: Arena::default(),
            config,
            blobs: None,
            stats: Stats::default(),
        })
    }

    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(store);
        self
    }

    pub fn set_blob_store(&mut self, store: Arc<dyn BlobStore>) {
        self.blobs = Some(store);
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// The encoded buffer the tree reads from.
    pub fn source(&self) -> &Arc<[u8]> {
        &self.source
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Live collection nodes.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn root(&mut self) -> Result<Native> {
        Ok(self.load(Location::Root)?.unwrap_or(Native::Null))
    }

    pub fn root_state(&self) -> SlotState {
        self.root.state()
    }

    /// Replaces the root value. The previous root tree is released.
    pub fn set_root(&mut self, value: impl Into<Native>) -> Result<()> {
        self.assign(Location::Root, value.into())
    }

    pub(crate) fn new_detached(&mut self, body: Body, depth: usize) -> NodeId {
        let mut node = Node::detached(body);
        node.depth = depth;
        self.stats.nodes_created += 1;
        self.arena.insert(node)
    }

    /// A new empty array that is not part of the tree yet.
    pub fn create_array(&mut self) -> NodeId {
        self.new_detached(Body::Array(Vec::new()), 1)
    }

    /// A new empty dictionary that is not part of the tree yet.
    pub fn create_dict(&mut self) -> NodeId {
        self.new_detached(Body::Dict(Default::default()), 1)
    }

    /// Replaces the root with a new empty array.
    pub fn new_array(&mut self) -> Result<Array<'_>> {
        let id = self.create_array();
        self.set_root(Native::Array(id))?;
        self.array(id)
    }

    /// Replaces the root with a new empty dictionary.
    pub fn new_dict(&mut self) -> Result<Dictionary<'_>> {
        let id = self.create_dict();
        self.set_root(Native::Dictionary(id))?;
        self.dictionary(id)
    }

    /// Detached copy of a collection.
    ///
    /// Materialized nodes are copied; slots that were never loaded keep
    /// pointing into the shared encoded buffer, and untouched copies are
    /// still written out by range copy.
    pub fn copy_node(&mut self, id: NodeId) -> Result<NodeId> {
        let mut root = self.arena.get(id)?.clone();
        root.owner = Owner::Detached;
        let copy = self.arena.insert(root);
        let mut created = 1;
        let mut stack = vec![copy];
        while let Some(parent) = stack.pop() {
            let originals: Vec<NodeId> = self.arena.get(parent)?.children().collect();
            let mut copies = Vec::with_capacity(originals.len());
            for original in originals {
                let mut node = self.arena.get(original)?.clone();
                node.owner = Owner::Node(parent);
                let child = self.arena.insert(node);
                copies.push(child);
                stack.push(child);
            }
            created += copies.len() as u64;
            let node = self.arena.get_mut(parent)?;
            for (slot, child) in node.slots_mut().filter_map(Slot::child_mut).zip(copies) {
                *slot = child;
            }
        }
        self.stats.nodes_created += created;
        debug!(?id, ?copy, created, "copied node");
        Ok(copy)
    }

    /// What holds the collection `id`.
    pub fn owner(&self, id: NodeId) -> Result<Owner> {
        Ok(self.arena.get(id)?.owner)
    }

    pub fn array(&mut self, id: NodeId) -> Result<Array<'_>> {
        if !matches!(self.arena.get(id)?.body, Body::Array(_)) {
            return Err(Error::NotAnArray);
        }
        Ok(Array::new(self, id))
    }

    pub fn dictionary(&mut self, id: NodeId) -> Result<Dictionary<'_>> {
        if !matches!(self.arena.get(id)?.body, Body::Dict(_)) {
            return Err(Error::NotADictionary);
        }
        Ok(Dictionary::new(self, id))
    }

    /// The root as an array; fails with [`Error::NotAnArray`] otherwise.
    pub fn root_array(&mut self) -> Result<Array<'_>> {
        match self.root()? {
            Native::Array(id) => self.array(id),
            _ => Err(Error::NotAnArray),
        }
    }

    /// The root as a dictionary; fails with [`Error::NotADictionary`]
    /// otherwise.
    pub fn root_dictionary(&mut self) -> Result<Dictionary<'_>> {
        match self.root()? {
            Native::Dictionary(id) => self.dictionary(id),
            _ => Err(Error::NotADictionary),
        }
    }

    /// Whether anything was assigned since the document was opened or saved.
    pub fn is_dirty(&self) -> bool {
        match &self.root {
            Slot::Unloaded(_) => false,
            Slot::Loaded { dirty: true, .. } => true,
            Slot::Loaded { value, .. } => value
                .node_id()
                .and_then(|id| self.arena.get(id).ok())
                .is_some_and(|node| node.touched),
        }
    }

    fn re_encoder(&self) -> ReEncoder<'_> {
        ReEncoder::new(
            &self.source,
            &self.arena,
            self.config.reuse_encoded,
            self.config.writer_alloc_size,
        )
    }

    /// Appends the encoded document to `encoder`. On failure nothing is
    /// appended.
    pub fn encode_to(&self, encoder: &mut Encoder) -> std::result::Result<EncodeReport, EncodeError> {
        let mut re = self.re_encoder();
        re.slot(&self.root)?;
        encoder.write_raw(re.out.as_slice());
        Ok(re.report)
    }

    pub(crate) fn encode_node_to(
        &self,
        id: NodeId,
        encoder: &mut Encoder,
    ) -> std::result::Result<EncodeReport, EncodeError> {
        let mut re = self.re_encoder();
        re.node(id)?;
        encoder.write_raw(re.out.as_slice());
        Ok(re.report)
    }

    pub fn encode_with_report(&self) -> std::result::Result<(Vec<u8>, EncodeReport), EncodeError> {
        let mut re = self.re_encoder();
        re.slot(&self.root)?;
        let report = re.report;
        debug!(
            verbatim = report.verbatim_ranges,
            verbatim_bytes = report.verbatim_bytes,
            encoded = report.encoded_values,
            "encoded document"
        );
        Ok((re.out.finish(), report))
    }

    pub fn encode(&self) -> std::result::Result<Vec<u8>, EncodeError> {
        self.encode_with_report().map(|(bytes, _)| bytes)
    }

    /// Encodes the document and makes the result its new source.
    ///
    /// Every node is released, so all outstanding [`NodeId`]s go stale. If
    /// encoding fails the document is left as it was.
    pub fn save(&mut self) -> Result<EncodeReport> {
        let (bytes, report) = self.encode_with_report()?;
        let source: Arc<[u8]> = Arc::from(bytes);
        self.stats.nodes_released += self.arena.len() as u64;
        self.arena.clear();
        self.root = Slot::Unloaded(0..source.len());
        self.source = source;
        debug!(len = self.source.len(), "saved document");
        Ok(report)
    }

    /// Fetches the content of a blob from the attached store.
    pub fn blob_content(&self, blob: &Blob) -> Result<BlobHandle> {
        let store = self.blobs.as_ref().ok_or(BlobStoreError::NoStore)?;
        Ok(store.resolve_blob(blob.reference())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn document_is_send_and_sync() {
        assert_send_sync::<Document>();
    }

    #[test]
    fn new_document_is_null_and_dirty() {
        let mut doc = Document::new();
        assert_eq!(doc.root().unwrap(), Native::Null);
        assert!(doc.is_dirty());
        assert_eq!(doc.encode().unwrap(), [0xf6]);
    }

    #[test]
    fn opened_document_is_clean_and_unloaded() {
        let doc = Document::from_bytes(vec![0x80]).unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(doc.root_state(), SlotState::Unloaded);
        assert_eq!(doc.node_count(), 0);
    }

    #[test]
    fn malformed_input_is_rejected_up_front() {
        assert!(matches!(
            Document::from_bytes(vec![0x82, 0x01]),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            Document::from_bytes(vec![0x01, 0x02]),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn blob_content_without_store() {
        let doc = Document::new();
        let blob = Blob::new(litedoc_pack::BlobRef::new("sha1-x", 1));
        assert!(matches!(
            doc.blob_content(&blob),
            Err(Error::BlobResolution(BlobStoreError::NoStore))
        ));
    }
}
