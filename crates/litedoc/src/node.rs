//! Collection nodes and the arena that owns them.
//!
//! Every array and dictionary in a document lives in a single [`Arena`] and
//! is addressed by a generational [`NodeId`]. Ownership runs strictly
//! downward through slots; the [`Owner`] link on each node is a plain id used
//! only to walk upward when a mutation has to be propagated.

use std::ops::Range;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::slot::Slot;

/// Handle to a collection node.
///
/// Ids are generational: once the node is released (its slot overwritten or
/// the document saved), the id stops resolving and accessors fail with
/// [`Error::StaleNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Non-owning back reference from a node to whatever holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Held by the document's root slot.
    Root,
    /// Held by a slot of another node.
    Node(NodeId),
    /// Created in memory and not yet assigned anywhere.
    Detached,
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Array(Vec<Slot>),
    Dict(IndexMap<String, Slot>),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub body: Body,
    /// Range of the encoded buffer this node was decoded from.
    pub source: Option<Range<usize>>,
    /// Element count or key set changed.
    pub structurally_dirty: bool,
    /// This node or something below it changed; its source range can no
    /// longer be copied as a whole.
    pub touched: bool,
    pub owner: Owner,
    /// Nesting level, 1 for a collection held by the root slot.
    pub depth: usize,
}

impl Node {
    pub fn attached(body: Body, source: Range<usize>, owner: Owner, depth: usize) -> Self {
        Self {
            body,
            source: Some(source),
            structurally_dirty: false,
            touched: false,
            owner,
            depth,
        }
    }

    pub fn detached(body: Body) -> Self {
        Self {
            body,
            source: None,
            structurally_dirty: true,
            touched: true,
            owner: Owner::Detached,
            depth: 1,
        }
    }

    pub fn len(&self) -> usize {
        match &self.body {
            Body::Array(slots) => slots.len(),
            Body::Dict(map) => map.len(),
        }
    }

    pub fn slots(&self) -> Box<dyn Iterator<Item = &Slot> + '_> {
        match &self.body {
            Body::Array(slots) => Box::new(slots.iter()),
            Body::Dict(map) => Box::new(map.values()),
        }
    }

    pub fn slots_mut(&mut self) -> Box<dyn Iterator<Item = &mut Slot> + '_> {
        match &mut self.body {
            Body::Array(slots) => Box::new(slots.iter_mut()),
            Body::Dict(map) => Box::new(map.values_mut()),
        }
    }

    /// Materialized child collections, in slot order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots().filter_map(Slot::child)
    }

    /// Whether the whole source range can be emitted verbatim.
    pub fn is_pristine(&self) -> bool {
        self.source.is_some() && !self.structurally_dirty && !self.touched
    }
}

#[derive(Debug, Clone)]
struct Entry {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.node = Some(node);
            return NodeId {
                index,
                generation: entry.generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.node.as_ref())
            .ok_or(Error::StaleNode)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.node.as_mut())
            .ok_or(Error::StaleNode)
    }

    /// Removes a node; its id and every copy of it become stale.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let entry = self.entries.get_mut(id.index as usize)?;
        if entry.generation != id.generation {
            return None;
        }
        let node = entry.node.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Removes every node, invalidating all outstanding ids.
    pub fn clear(&mut self) {
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.node.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }

    pub fn len(&self) -> usize {
        self.live
    }
}
