//! The public entry point for the copy-on-write tree: [`CowInstance`] is
//! cheaply cloneable (an `Arc` underneath) and hands out [`ReadTxn`]s that
//! pin a consistent snapshot and a single [`WriteTxn`] at a time that
//! builds the next snapshot without ever blocking a reader.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::callback::Comparator;
use crate::error::{CResult, Presence};

use super::node::CowNode;
use super::ops::{self, InsertResult};
use super::txn::TxnNode;

struct Inner<K, V> {
    comparator: Comparator<K>,
    capacity: usize,
    next_txn_id: AtomicU64,
    active: RwLock<Arc<TxnNode<K, V>>>,
    write_lock: Mutex<()>,
    tail: Mutex<Arc<TxnNode<K, V>>>,
}

/// A handle to a copy-on-write B+tree. Clones share the same underlying
/// transaction chain -- cloning is how you hand the tree to another
/// thread, not how you get an independent copy.
pub struct CowInstance<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for CowInstance<K, V> {
    fn clone(&self) -> Self {
        CowInstance { inner: self.inner.clone() }
    }
}

fn min_fill(capacity: usize) -> usize {
    (capacity + 1) / 2
}

impl<K, V> CowInstance<K, V> {
    pub fn new(comparator: Comparator<K>) -> Self {
        Self::with_capacity(comparator, crate::bptree::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(comparator: Comparator<K>, capacity: usize) -> Self {
        assert!(capacity >= 2, "capacity must allow at least a 2-way split");
        let genesis = TxnNode::new(0, CowNode::empty_leaf(0), 1);
        Inner {
            comparator,
            capacity,
            next_txn_id: AtomicU64::new(1),
            active: RwLock::new(genesis.clone()),
            write_lock: Mutex::new(()),
            tail: Mutex::new(genesis),
        }
        .into()
    }

    /// Pins the current snapshot for lock-free reading. The returned
    /// [`ReadTxn`] sees a consistent view no matter how many writes
    /// commit after it's taken out.
    pub fn rotxn_begin(&self) -> ReadTxn<K, V> {
        let node = self.inner.active.read().expect("active lock poisoned").clone();
        node.pin();
        ReadTxn { instance: self.clone(), node: Some(node) }
    }

    /// Begins the single write transaction this instance allows at a
    /// time; blocks until any prior `WriteTxn` has committed or aborted.
    pub fn wrtxn_begin(&self) -> WriteTxn<K, V> {
        let guard = self.inner.write_lock.lock().expect("write lock poisoned");
        // Safety: `guard` borrows `self.inner.write_lock`, and the returned
        // `WriteTxn` keeps its own clone of `self` (and thus a strong ref
        // to the same `Inner`) alive for at least as long as the guard --
        // the `Arc`'s heap allocation never moves, so stretching the
        // borrow to `'static` here is sound as long as `_guard` is never
        // outlived by anything that reads past `instance`'s drop.
        let guard: MutexGuard<'static, ()> = unsafe { std::mem::transmute(guard) };
        let base = self.inner.active.read().expect("active lock poisoned").clone();
        log::trace!("wrtxn_begin: based on committed txn {}", base.id);
        WriteTxn { instance: self.clone(), _guard: guard, working_root: base.root.clone() }
    }

    fn cascade_free(&self) {
        let mut tail = self.inner.tail.lock().expect("tail lock poisoned");
        loop {
            if tail.refs() != 0 {
                return;
            }
            let next = tail.child.lock().expect("child lock poisoned").clone();
            match next {
                Some(next) => {
                    log::trace!("cascade_free: pruning unreferenced txn {}", tail.id);
                    *tail = next;
                }
                None => return,
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of versions currently reachable from the tail of the
    /// commit chain (at least 1: the active version itself).
    pub fn retained_versions(&self) -> usize {
        let tail = self.inner.tail.lock().expect("tail lock poisoned").clone();
        let mut count = 1;
        let mut cur = tail;
        loop {
            let next = cur.child.lock().expect("child lock poisoned").clone();
            match next {
                Some(next) => {
                    count += 1;
                    cur = next;
                }
                None => return count,
            }
        }
    }
}

impl<K, V> From<Inner<K, V>> for CowInstance<K, V> {
    fn from(inner: Inner<K, V>) -> Self {
        CowInstance { inner: Arc::new(inner) }
    }
}

/// A pinned, read-only snapshot. Cheap to hold for a long time: it never
/// blocks a concurrent writer, and a writer never blocks it.
pub struct ReadTxn<K, V> {
    instance: CowInstance<K, V>,
    node: Option<Arc<TxnNode<K, V>>>,
}

impl<K, V> ReadTxn<K, V> {
    fn root(&self) -> &Arc<CowNode<K, V>> {
        &self.node.as_ref().expect("read txn already closed").root
    }

    pub fn search(&self, key: &K) -> CResult<Presence> {
        ops::cow_search(self.root(), key, &self.instance.inner.comparator)
    }

    pub fn retrieve(&self, key: &K) -> CResult<Option<&V>> {
        ops::cow_retrieve(self.root(), key, &self.instance.inner.comparator)
    }

    pub fn map(&self, f: impl FnMut(&K, &V)) -> CResult<()> {
        ops::cow_map(self.root(), f)
    }

    pub fn verify(&self) -> CResult<()> {
        let capacity = self.instance.inner.capacity;
        ops::cow_verify(self.root(), &self.instance.inner.comparator, capacity, min_fill(capacity)).inspect_err(|error| {
            log::error!("cow verify failed: {error}");
        })
    }

    /// Releases this snapshot early instead of waiting for `Drop`.
    pub fn rotxn_close(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(node) = self.node.take() {
            node.unpin();
            self.instance.cascade_free();
        }
    }
}

impl<K, V> Drop for ReadTxn<K, V> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The single in-flight write transaction. Mutations build a new root
/// purely functionally; nothing becomes visible to readers until
/// [`WriteTxn::wrtxn_commit`].
pub struct WriteTxn<K, V> {
    instance: CowInstance<K, V>,
    _guard: MutexGuard<'static, ()>,
    working_root: Arc<CowNode<K, V>>,
}

impl<K, V> WriteTxn<K, V> {
    pub fn search(&self, key: &K) -> CResult<Presence> {
        ops::cow_search(&self.working_root, key, &self.instance.inner.comparator)
    }

    pub fn retrieve(&self, key: &K) -> CResult<Option<&V>> {
        ops::cow_retrieve(&self.working_root, key, &self.instance.inner.comparator)
    }
}

impl<K: Clone, V: Clone> WriteTxn<K, V> {
    pub fn insert(&mut self, key: K, value: V) -> CResult<()> {
        let txn_id = self.instance.inner.next_txn_id.load(Ordering::Acquire);
        let capacity = self.instance.inner.capacity;
        let old_root_level = self.working_root.level;
        match ops::cow_insert(&self.working_root, txn_id, capacity, &self.instance.inner.comparator, key, value)? {
            InsertResult::Done(root) => self.working_root = root,
            InsertResult::Split { left, separator, right } => {
                self.working_root = Arc::new(CowNode {
                    level: old_root_level + 1,
                    keys: vec![separator],
                    payload: super::node::CowPayload::Branch { children: vec![left, right] },
                    txn_id,
                });
            }
        }
        Ok(())
    }

    pub fn delete(&mut self, key: &K) -> CResult<Presence> {
        let txn_id = self.instance.inner.next_txn_id.load(Ordering::Acquire);
        let min_fill = min_fill(self.instance.inner.capacity);
        let comparator = self.instance.inner.comparator.clone();
        match ops::cow_delete(&self.working_root, true, min_fill, &comparator, txn_id, key)? {
            None => Ok(Presence::NotPresent),
            Some(outcome) => {
                self.working_root = ops::collapse_root(outcome.node)?;
                Ok(Presence::Present)
            }
        }
    }

    /// Publishes this transaction's working root as the new active
    /// snapshot, then attempts to prune any older versions nothing
    /// still reads. The write lock releases as `self` drops at the end
    /// of this call.
    pub fn wrtxn_commit(self) -> CResult<()> {
        let id = self.instance.inner.next_txn_id.fetch_add(1, Ordering::AcqRel);
        let new_node = TxnNode::new(id, self.working_root.clone(), 1);

        let mut active = self.instance.inner.active.write().expect("active lock poisoned");
        let old_active = std::mem::replace(&mut *active, new_node.clone());
        drop(active);

        *old_active.child.lock().expect("child lock poisoned") = Some(new_node);
        old_active.unpin();
        log::debug!("wrtxn_commit: txn {} is now the active version", id);

        let instance = self.instance.clone();
        drop(self);
        instance.cascade_free();
        Ok(())
    }

    /// Discards this transaction's uncommitted working root. Nothing it
    /// built was ever made reachable from `active`, so there's nothing
    /// to free beyond the ordinary `Arc` drop of `working_root` that
    /// happens as `self` drops here.
    pub fn wrtxn_abort(self) {
        log::debug!("wrtxn_abort: discarding uncommitted writes");
    }
}
