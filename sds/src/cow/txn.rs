//! The commit chain: one [`TxnNode`] per committed write transaction,
//! linked forward from oldest to newest by `child`. A pinned read
//! transaction keeps its `TxnNode` (and everything reachable from its
//! `root`) alive by holding a strong reference; the chain is pruned by
//! walking forward from `tail` and dropping entries whose
//! `reference_count` has reached zero, stopping at the first still-live
//! one.
//!
//! There's deliberately no `parent_txn` link. A node only ever needs to
//! walk *forward* (prune from the tail towards the active end); storing
//! a backward link too would make every chain entry part of an `Arc`
//! reference cycle with its neighbours, which is exactly the kind of
//! bookkeeping `Arc`/`Drop` is supposed to make unnecessary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::node::CowNode;

/// One entry in the commit chain: the tree root as of transaction `id`,
/// plus enough bookkeeping to know when it's safe to drop. Every node
/// reachable from `tail` represents a committed write -- nothing links
/// an in-progress [`WriteTxn`](super::instance::WriteTxn) into the chain
/// until it commits.
pub(crate) struct TxnNode<K, V> {
    pub(crate) id: u64,
    pub(crate) root: Arc<CowNode<K, V>>,
    /// Number of live pins on this exact version: one for every
    /// [`ReadTxn`](super::instance::ReadTxn) currently reading it, plus
    /// one while it's the instance's `active` version, plus one while
    /// it's reachable as someone's `child` and hasn't been superseded.
    pub(crate) reference_count: AtomicUsize,
    pub(crate) child: Mutex<Option<Arc<TxnNode<K, V>>>>,
}

impl<K, V> TxnNode<K, V> {
    pub(crate) fn new(id: u64, root: Arc<CowNode<K, V>>, initial_refs: usize) -> Arc<Self> {
        Arc::new(TxnNode { id, root, reference_count: AtomicUsize::new(initial_refs), child: Mutex::new(None) })
    }

    pub(crate) fn pin(&self) {
        self.reference_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the post-decrement count.
    pub(crate) fn unpin(&self) -> usize {
        self.reference_count.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub(crate) fn refs(&self) -> usize {
        self.reference_count.load(Ordering::Acquire)
    }
}
