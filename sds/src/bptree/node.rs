//! Node representation for the plain B+tree.
//!
//! Nodes live in an arena (`Tree::arena`) and refer to each other by
//! [`NodeId`] rather than by pointer. This sidesteps maintaining parent
//! back-pointers: descent accumulates an explicit path of `NodeId`s, and
//! that path -- not a stored `parent` field -- is what split/merge/
//! rebalance walk back up through.

use crate::error::{CResult, Error};

/// An index into a [`Tree`](super::tree::Tree)'s arena.
pub type NodeId = usize;

/// A node's children/value area. Leaves carry the values paired with
/// their keys plus a sibling link; branches carry one more child than
/// they have keys (the standard B+tree convention).
#[derive(Debug)]
pub(crate) enum Payload<V> {
    Leaf {
        values: Vec<V>,
        /// The next leaf in key order, or `None` at the end of the chain.
        sibling: Option<NodeId>,
    },
    Branch {
        /// `children.len() == keys.len() + 1`.
        children: Vec<NodeId>,
    },
}

#[derive(Debug)]
pub(crate) struct Node<K, V> {
    /// 0 for leaves, > 0 for branches; a branch's level is always exactly
    /// one more than its children's.
    pub(crate) level: u32,
    pub(crate) keys: Vec<K>,
    pub(crate) payload: Payload<V>,
    /// CRC32C over the fixed portion of this node (level, keys, and
    /// values/children), recomputed and checked by `verify` and by the
    /// search path when the `checksum` feature is enabled.
    #[cfg(feature = "checksum")]
    pub(crate) checksum: u32,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new_leaf() -> Self {
        Node {
            level: 0,
            keys: Vec::new(),
            payload: Payload::Leaf { values: Vec::new(), sibling: None },
            #[cfg(feature = "checksum")]
            checksum: 0,
        }
    }

    pub(crate) fn new_branch(level: u32) -> Self {
        assert!(level > 0);
        Node {
            level,
            keys: Vec::new(),
            payload: Payload::Branch { children: Vec::new() },
            #[cfg(feature = "checksum")]
            checksum: 0,
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.payload, Payload::Leaf { .. })
    }

    pub(crate) fn item_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn leaf_values(&self) -> CResult<&Vec<V>> {
        match &self.payload {
            Payload::Leaf { values, .. } => Ok(values),
            Payload::Branch { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn leaf_values_mut(&mut self) -> CResult<&mut Vec<V>> {
        match &mut self.payload {
            Payload::Leaf { values, .. } => Ok(values),
            Payload::Branch { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn sibling(&self) -> CResult<Option<NodeId>> {
        match &self.payload {
            Payload::Leaf { sibling, .. } => Ok(*sibling),
            Payload::Branch { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn set_sibling(&mut self, next: Option<NodeId>) -> CResult<()> {
        match &mut self.payload {
            Payload::Leaf { sibling, .. } => {
                *sibling = next;
                Ok(())
            }
            Payload::Branch { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn children(&self) -> CResult<&Vec<NodeId>> {
        match &self.payload {
            Payload::Branch { children } => Ok(children),
            Payload::Leaf { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn children_mut(&mut self) -> CResult<&mut Vec<NodeId>> {
        match &mut self.payload {
            Payload::Branch { children } => Ok(children),
            Payload::Leaf { .. } => Err(Error::InvalidNode),
        }
    }
}
