//! Node representation for the copy-on-write B+tree.
//!
//! Unlike the plain tree's arena, nodes here are individually
//! reference-counted (`Arc`) and never mutated after being published: a
//! write transaction that needs to change a node builds a brand new one
//! and links it in, leaving every node reachable from an older snapshot
//! untouched. `txn_id` records which write transaction produced a node;
//! it's diagnostic only (see [`crate::cow::ops`]) since ownership and
//! reclamation are handled by `Arc`, not by comparing ids at runtime.

use std::sync::Arc;

use crate::error::{CResult, Error};

pub(crate) enum CowPayload<K, V> {
    Leaf {
        values: Vec<V>,
        sibling: Option<Arc<CowNode<K, V>>>,
    },
    Branch {
        children: Vec<Arc<CowNode<K, V>>>,
    },
}

pub(crate) struct CowNode<K, V> {
    pub(crate) level: u32,
    pub(crate) keys: Vec<K>,
    pub(crate) payload: CowPayload<K, V>,
    /// The write transaction that produced this node. Present for
    /// introspection/tests; never compared to decide whether a node may
    /// be mutated in place (it never may -- all mutation is copy-first).
    pub(crate) txn_id: u64,
}

impl<K, V> CowNode<K, V> {
    pub(crate) fn empty_leaf(txn_id: u64) -> Arc<Self> {
        Arc::new(CowNode { level: 0, keys: Vec::new(), payload: CowPayload::Leaf { values: Vec::new(), sibling: None }, txn_id })
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.payload, CowPayload::Leaf { .. })
    }

    pub(crate) fn item_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn leaf_values(&self) -> CResult<&Vec<V>> {
        match &self.payload {
            CowPayload::Leaf { values, .. } => Ok(values),
            CowPayload::Branch { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn sibling(&self) -> CResult<Option<Arc<CowNode<K, V>>>> {
        match &self.payload {
            CowPayload::Leaf { sibling, .. } => Ok(sibling.clone()),
            CowPayload::Branch { .. } => Err(Error::InvalidNode),
        }
    }

    pub(crate) fn children(&self) -> CResult<&Vec<Arc<CowNode<K, V>>>> {
        match &self.payload {
            CowPayload::Branch { children } => Ok(children),
            CowPayload::Leaf { .. } => Err(Error::InvalidNode),
        }
    }
}
