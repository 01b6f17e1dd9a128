//! One position in the document tree.

use std::ops::Range;

use crate::node::NodeId;
use crate::value::Native;

/// Either a pointer into the encoded buffer or a materialized value.
///
/// A slot goes from `Unloaded` to `Loaded` on first access and never back.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Unloaded(Range<usize>),
    Loaded {
        value: Native,
        /// Set when the value was assigned rather than decoded.
        dirty: bool,
        /// Where the decoded value came from; `None` for assigned values.
        origin: Option<Range<usize>>,
    },
}

impl Slot {
    /// A freshly assigned value.
    pub fn assigned(value: Native) -> Self {
        Slot::Loaded {
            value,
            dirty: true,
            origin: None,
        }
    }

    pub fn decoded(value: Native, origin: Range<usize>) -> Self {
        Slot::Loaded {
            value,
            dirty: false,
            origin: Some(origin),
        }
    }

    pub fn loaded(&self) -> Option<&Native> {
        match self {
            Slot::Loaded { value, .. } => Some(value),
            Slot::Unloaded(_) => None,
        }
    }

    /// The collection node held by this slot, if it has been materialized.
    pub fn child(&self) -> Option<NodeId> {
        self.loaded().and_then(Native::node_id)
    }

    pub fn child_mut(&mut self) -> Option<&mut NodeId> {
        match self {
            Slot::Loaded {
                value: Native::Array(id) | Native::Dictionary(id),
                ..
            } => Some(id),
            _ => None,
        }
    }

    pub fn state(&self) -> SlotState {
        match self {
            Slot::Unloaded(_) => SlotState::Unloaded,
            Slot::Loaded { dirty: false, .. } => SlotState::Clean,
            Slot::Loaded { dirty: true, .. } => SlotState::Dirty,
        }
    }
}

/// Observable materialization state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Still only a range in the encoded buffer.
    Unloaded,
    /// Decoded and cached, unchanged since.
    Clean,
    /// Holds an assigned value.
    Dirty,
}
