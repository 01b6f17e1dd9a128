//! Mutation tracking.
//!
//! Every write goes through here. A write replaces or inserts a slot,
//! releases whatever collection the old slot held, and marks the owning node
//! and its ancestors as touched so the re-encoder stops copying their source
//! ranges. Propagation stops at the first node that is already touched: a
//! touched node always has touched ancestors.

use litedoc_pack::nesting_depth;
use tracing::{debug, trace};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::loader::Location;
use crate::node::{Body, NodeId, Owner};
use crate::slot::Slot;
use crate::value::Native;

impl Document {
    /// Marks `id` (and, if it was clean, its ancestors) as changed.
    pub(crate) fn touch(&mut self, id: NodeId, structural: bool) -> Result<()> {
        let node = self.arena.get_mut(id)?;
        if structural {
            node.structurally_dirty = true;
        }
        if node.touched {
            return Ok(());
        }
        node.touched = true;
        let mut owner = node.owner;
        let mut walked = 0usize;
        while let Owner::Node(parent) = owner {
            let parent = self.arena.get_mut(parent)?;
            if parent.touched {
                break;
            }
            parent.touched = true;
            owner = parent.owner;
            walked += 1;
        }
        trace!(?id, structural, walked, "propagated mutation");
        Ok(())
    }

    /// Checks that `value` may be stored in a slot of `parent` (or the root
    /// slot when `parent` is `None`) replacing `current`.
    ///
    /// Scalars are always accepted. A collection must be detached, must not
    /// be `parent` or one of its ancestors, and must fit under the depth
    /// limit once attached, undecoded levels included.
    fn ensure_adoptable(&self, value: &Native, parent: Option<NodeId>, current: Option<NodeId>) -> Result<()> {
        let Some(child) = value.node_id() else {
            return Ok(());
        };
        let node = self.arena.get(child)?;
        if current == Some(child) {
            return Ok(());
        }
        if node.owner != Owner::Detached {
            return Err(Error::AlreadyAttached);
        }
        let mut base = 0;
        if let Some(parent) = parent {
            let mut cursor = Some(parent);
            while let Some(id) = cursor {
                if id == child {
                    return Err(Error::Cycle);
                }
                cursor = match self.arena.get(id)?.owner {
                    Owner::Node(up) => Some(up),
                    Owner::Root | Owner::Detached => None,
                };
            }
            base = self.arena.get(parent)?.depth;
        }
        if base + self.height(child)? > self.config.max_depth {
            return Err(Error::TooDeep {
                max_depth: self.config.max_depth,
            });
        }
        Ok(())
    }

    /// Levels of collections in the subtree rooted at `id`, counting the
    /// ones still sitting undecoded in the source buffer.
    fn height(&self, id: NodeId) -> Result<usize> {
        let mut max = 0;
        let mut stack = vec![(id, 1)];
        while let Some((id, level)) = stack.pop() {
            max = max.max(level);
            for slot in self.arena.get(id)?.slots() {
                match slot {
                    Slot::Unloaded(range) => {
                        max = max.max(level + nesting_depth(&self.source, range.start)?);
                    }
                    _ => stack.extend(slot.child().map(|c| (c, level + 1))),
                }
            }
        }
        Ok(max)
    }

    /// Links a detached subtree under `owner` and renumbers its depths.
    fn adopt(&mut self, child: NodeId, owner: Owner, depth: usize) -> Result<()> {
        self.arena.get_mut(child)?.owner = owner;
        let mut stack = vec![(child, depth)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.arena.get_mut(id)?;
            node.depth = depth;
            let children: Vec<NodeId> = node.children().collect();
            stack.extend(children.into_iter().map(|c| (c, depth + 1)));
        }
        Ok(())
    }

    /// Frees a node and every materialized node below it.
    pub(crate) fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        let mut released = 0u64;
        while let Some(id) = stack.pop() {
            if let Some(node) = self.arena.remove(id) {
                stack.extend(node.children());
                released += 1;
            }
        }
        self.stats.nodes_released += released;
        debug!(?id, released, "released subtree");
    }

    fn depth_under(&self, parent: Option<NodeId>) -> Result<(Owner, usize)> {
        Ok(match parent {
            None => (Owner::Root, 1),
            Some(p) => (Owner::Node(p), self.arena.get(p)?.depth + 1),
        })
    }

    /// Replaces the value at `at`. An absent dictionary key is inserted.
    pub(crate) fn assign(&mut self, at: Location<'_>, value: Native) -> Result<()> {
        let parent = at.parent();
        let (current, exists) = match self.slot(at)? {
            Some(slot) => (slot.child(), true),
            None => (None, false),
        };
        self.ensure_adoptable(&value, parent, current)?;
        let child = value.node_id();
        match at {
            Location::Key(id, key) if !exists => {
                if let Body::Dict(map) = &mut self.arena.get_mut(id)?.body {
                    map.insert(key.to_owned(), Slot::assigned(value));
                }
            }
            _ => {
                if let Some(slot) = self.slot_mut(at)? {
                    *slot = Slot::assigned(value);
                }
            }
        }
        if let Some(old) = current.filter(|old| Some(*old) != child) {
            self.release(old);
        }
        if let Some(child) = child {
            let (owner, depth) = self.depth_under(parent)?;
            self.adopt(child, owner, depth)?;
        }
        if let Some(parent) = parent {
            self.touch(parent, !exists)?;
        }
        Ok(())
    }

    /// Inserts `value` before `index`; `index == count` appends.
    pub(crate) fn insert_at(&mut self, id: NodeId, index: usize, value: Native) -> Result<()> {
        let count = match &self.arena.get(id)?.body {
            Body::Array(slots) => slots.len(),
            Body::Dict(_) => return Err(Error::NotAnArray),
        };
        if index > count {
            return Err(Error::OutOfRange { index, count });
        }
        self.ensure_adoptable(&value, Some(id), None)?;
        let child = value.node_id();
        if let Body::Array(slots) = &mut self.arena.get_mut(id)?.body {
            slots.insert(index, Slot::assigned(value));
        }
        if let Some(child) = child {
            let (owner, depth) = self.depth_under(Some(id))?;
            self.adopt(child, owner, depth)?;
        }
        self.touch(id, true)
    }

    pub(crate) fn remove_at(&mut self, id: NodeId, index: usize) -> Result<()> {
        let removed = match &mut self.arena.get_mut(id)?.body {
            Body::Array(slots) => {
                if index >= slots.len() {
                    return Err(Error::OutOfRange {
                        index,
                        count: slots.len(),
                    });
                }
                slots.remove(index)
            }
            Body::Dict(_) => return Err(Error::NotAnArray),
        };
        if let Some(child) = removed.child() {
            self.release(child);
        }
        self.touch(id, true)
    }

    /// Removes `key`; returns whether it was present.
    pub(crate) fn remove_key(&mut self, id: NodeId, key: &str) -> Result<bool> {
        let removed = match &mut self.arena.get_mut(id)?.body {
            Body::Dict(map) => map.shift_remove(key),
            Body::Array(_) => return Err(Error::NotADictionary),
        };
        let Some(removed) = removed else {
            return Ok(false);
        };
        if let Some(child) = removed.child() {
            self.release(child);
        }
        self.touch(id, true)?;
        Ok(true)
    }
}
