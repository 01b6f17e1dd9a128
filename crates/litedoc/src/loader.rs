//! Lazy materialization of slots.
//!
//! A slot is decoded the first time somebody asks for it. Scalars become
//! [`Native`] values; arrays and maps become arena nodes whose own slots
//! start out `Unloaded`, so one access costs one shallow decode.

use std::ops::Range;
use std::sync::Arc;

use indexmap::IndexMap;
use litedoc_pack::{decode, read_blob_ref, read_scalar, PackError, Scalar, Tag};
use tracing::{debug, trace};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Body, Node, NodeId, Owner};
use crate::slot::Slot;
use crate::value::{Blob, Native};

/// Address of one slot in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location<'k> {
    Root,
    Index(NodeId, usize),
    Key(NodeId, &'k str),
}

impl Location<'_> {
    pub fn parent(&self) -> Option<NodeId> {
        match *self {
            Location::Root => None,
            Location::Index(id, _) | Location::Key(id, _) => Some(id),
        }
    }
}

impl Document {
    /// The slot at `at`, or `None` for an absent dictionary key.
    pub(crate) fn slot(&self, at: Location<'_>) -> Result<Option<&Slot>> {
        match at {
            Location::Root => Ok(Some(&self.root)),
            Location::Index(id, index) => self.element(id, index).map(Some),
            Location::Key(id, key) => match &self.arena.get(id)?.body {
                Body::Dict(map) => Ok(map.get(key)),
                Body::Array(_) => Err(Error::NotADictionary),
            },
        }
    }

    /// The slot at `index` of array `id`.
    pub(crate) fn element(&self, id: NodeId, index: usize) -> Result<&Slot> {
        match &self.arena.get(id)?.body {
            Body::Array(slots) => slots.get(index).ok_or(Error::OutOfRange {
                index,
                count: slots.len(),
            }),
            Body::Dict(_) => Err(Error::NotAnArray),
        }
    }

    pub(crate) fn slot_mut(&mut self, at: Location<'_>) -> Result<Option<&mut Slot>> {
        match at {
            Location::Root => Ok(Some(&mut self.root)),
            Location::Index(id, index) => match &mut self.arena.get_mut(id)?.body {
                Body::Array(slots) => {
                    let count = slots.len();
                    slots
                        .get_mut(index)
                        .map(Some)
                        .ok_or(Error::OutOfRange { index, count })
                }
                Body::Dict(_) => Err(Error::NotAnArray),
            },
            Location::Key(id, key) => match &mut self.arena.get_mut(id)?.body {
                Body::Dict(map) => Ok(map.get_mut(key)),
                Body::Array(_) => Err(Error::NotADictionary),
            },
        }
    }

    /// Returns the native value at `at`, decoding and caching it on first
    /// access. Later calls hand back clones of the cached value, which share
    /// its allocation.
    pub(crate) fn load(&mut self, at: Location<'_>) -> Result<Option<Native>> {
        let range = match self.slot(at)? {
            None => return Ok(None),
            Some(Slot::Loaded { value, .. }) => {
                let value = value.clone();
                self.stats.cache_hits += 1;
                return Ok(Some(value));
            }
            Some(Slot::Unloaded(range)) => range.clone(),
        };
        let (owner, depth) = match at.parent() {
            None => (Owner::Root, 1),
            Some(parent) => (Owner::Node(parent), self.arena.get(parent)?.depth + 1),
        };
        let value = self.materialize(range.clone(), owner, depth)?;
        trace!(?at, kind = value.type_name(), "materialized slot");
        if let Some(slot) = self.slot_mut(at)? {
            *slot = Slot::decoded(value.clone(), range);
        }
        self.stats.materialized += 1;
        Ok(Some(value))
    }

    fn materialize(&mut self, range: Range<usize>, owner: Owner, depth: usize) -> Result<Native> {
        let source = Arc::clone(&self.source);
        let buf: &[u8] = &source;
        let item = decode(buf, range.start)?;
        let value = match item.tag {
            Tag::Array => {
                let slots = item.children.into_iter().map(Slot::Unloaded).collect();
                Native::Array(self.attach(Body::Array(slots), item.range, owner, depth)?)
            }
            Tag::Map => {
                let mut map = IndexMap::with_capacity(item.children.len() / 2);
                for pair in item.children.chunks(2) {
                    let key_item = decode(buf, pair[0].start)?;
                    let key = match read_scalar(buf, &key_item)? {
                        Scalar::Text(key) => key.to_owned(),
                        _ => return Err(PackError::NonTextKey { offset: pair[0].start }.into()),
                    };
                    map.insert(key, Slot::Unloaded(pair[1].clone()));
                }
                Native::Dictionary(self.attach(Body::Dict(map), item.range, owner, depth)?)
            }
            Tag::Blob => Native::Blob(Blob::new(read_blob_ref(buf, &item)?)),
            _ => match read_scalar(buf, &item)? {
                Scalar::Null => Native::Null,
                Scalar::Bool(b) => Native::Bool(b),
                Scalar::Int(i) => Native::Int(i),
                Scalar::UInt(u) => Native::UInt(u),
                Scalar::Float(f) => Native::Float(f),
                Scalar::Text(s) => Native::String(Arc::from(s)),
                Scalar::Bytes(b) => Native::Bytes(Arc::from(b)),
            },
        };
        Ok(value)
    }

    fn attach(&mut self, body: Body, source: Range<usize>, owner: Owner, depth: usize) -> Result<NodeId> {
        if depth > self.config.max_depth {
            return Err(Error::TooDeep {
                max_depth: self.config.max_depth,
            });
        }
        let id = self.arena.insert(Node::attached(body, source, owner, depth));
        self.stats.nodes_created += 1;
        debug!(?id, ?owner, depth, "allocated node");
        Ok(id)
    }

    /// Number of entries in a node, without materializing anything.
    pub(crate) fn node_len(&self, id: NodeId) -> Result<usize> {
        Ok(self.arena.get(id)?.len())
    }

    /// Decodes every slot reachable from the root.
    pub fn materialize_all(&mut self) -> Result<()> {
        let mut stack = Vec::new();
        if let Some(id) = self.load(Location::Root)?.and_then(|v| v.node_id()) {
            stack.push(id);
        }
        while let Some(id) = stack.pop() {
            let keys: Option<Vec<String>> = match &self.arena.get(id)?.body {
                Body::Array(_) => None,
                Body::Dict(map) => Some(map.keys().cloned().collect()),
            };
            let children = match keys {
                None => {
                    let len = self.node_len(id)?;
                    let mut children = Vec::with_capacity(len);
                    for index in 0..len {
                        children.push(self.load(Location::Index(id, index))?);
                    }
                    children
                }
                Some(keys) => {
                    let mut children = Vec::with_capacity(keys.len());
                    for key in &keys {
                        children.push(self.load(Location::Key(id, key))?);
                    }
                    children
                }
            };
            stack.extend(children.into_iter().flatten().filter_map(|v| v.node_id()));
        }
        Ok(())
    }
}
