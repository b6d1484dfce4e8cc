//! The plain, single-owner B+tree: search, insert, delete, bulk-load,
//! verify, and in-order map.
//!
//! Nodes live in an arena (`Vec<Option<Node<K, V>>>`) and are addressed by
//! [`NodeId`]. Descent accumulates an explicit path of ids rather than
//! relying on a stored parent pointer.

use std::cmp::Ordering;
use std::hash::Hash;

use crate::callback::{natural, Comparator};
use crate::error::{CResult, Error, Presence};

use super::node::{Node, NodeId, Payload};

/// Default maximum keys per node. `⌈DEFAULT_CAPACITY / 2⌉` is the minimum
/// fill for a non-root node.
pub const DEFAULT_CAPACITY: usize = 3;

/// Per-instance checksum-enable flags. Only meaningful when built with
/// the `checksum` feature; otherwise they are accepted but have no
/// effect, since checksumming compiles out entirely without it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct InstanceFlags {
    pub checksum_on_write: bool,
    pub checksum_on_search: bool,
}

/// Introspection snapshot of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, serde_derive::Serialize, serde_derive::Deserialize)]
pub struct Status {
    pub keys: u64,
    pub levels: u32,
    pub capacity: usize,
}

/// A sorted in-memory B+tree with a user-supplied key comparator.
pub struct Tree<K, V> {
    pub(crate) comparator: Comparator<K>,
    pub(crate) arena: Vec<Option<Node<K, V>>>,
    pub(crate) free: Vec<NodeId>,
    pub(crate) root: NodeId,
    pub(crate) capacity: usize,
    pub(crate) flags: InstanceFlags,
}

impl<K: Ord, V> Default for Tree<K, V> {
    fn default() -> Self {
        Tree::new(natural())
    }
}

impl<K, V> Tree<K, V> {
    /// Allocates an empty instance; the root starts as an empty leaf.
    pub fn new(comparator: Comparator<K>) -> Self {
        Self::with_capacity(comparator, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(comparator: Comparator<K>, capacity: usize) -> Self {
        assert!(capacity >= 2, "capacity must allow at least a 2-way split");
        let mut arena = Vec::new();
        arena.push(Some(Node::new_leaf()));
        Tree { comparator, arena, free: Vec::new(), root: 0, capacity, flags: InstanceFlags::default() }
    }

    pub fn with_flags(mut self, flags: InstanceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn min_fill(&self) -> usize {
        (self.capacity + 1) / 2
    }

    pub(crate) fn node(&self, id: NodeId) -> CResult<&Node<K, V>> {
        self.arena.get(id).and_then(|n| n.as_ref()).ok_or(Error::InvalidNodeId)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> CResult<&mut Node<K, V>> {
        self.arena.get_mut(id).and_then(|n| n.as_mut()).ok_or(Error::InvalidNodeId)
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.arena[id] = Some(node);
            id
        } else {
            self.arena.push(Some(node));
            self.arena.len() - 1
        }
    }

    fn dealloc(&mut self, id: NodeId) {
        self.arena[id] = None;
        self.free.push(id);
    }

    fn cmp(&self, a: &K, b: &K) -> Ordering {
        self.comparator.compare(a, b)
    }

    /// Finds the index of the child to descend into for `key`, i.e. the
    /// rightmost child whose separator key is `<= key`.
    fn branch_child_index(&self, branch: NodeId, key: &K) -> CResult<usize> {
        let node = self.node(branch)?;
        let mut idx = 0;
        for (i, k) in node.keys.iter().enumerate() {
            if self.cmp(key, k) == Ordering::Less {
                break;
            }
            idx = i + 1;
        }
        Ok(idx)
    }

    /// Returns `(index, found)` where `index` is where `key` is, or would
    /// be inserted, in the leaf's ordered keys.
    fn locate_in_leaf(&self, leaf: NodeId, key: &K) -> CResult<(usize, bool)> {
        let node = self.node(leaf)?;
        for (i, k) in node.keys.iter().enumerate() {
            match self.cmp(key, k) {
                Ordering::Less => return Ok((i, false)),
                Ordering::Equal => return Ok((i, true)),
                Ordering::Greater => {}
            }
        }
        Ok((node.keys.len(), false))
    }

    /// Descends from the root to the leaf that would hold `key`,
    /// returning the full root-to-leaf path.
    fn descend(&self, key: &K) -> CResult<Vec<NodeId>> {
        let mut path = vec![self.root];
        loop {
            let cur = *path.last().unwrap();
            if self.node(cur)?.is_leaf() {
                return Ok(path);
            }
            let idx = self.branch_child_index(cur, key)?;
            let child = self.node(cur)?.children()?[idx];
            path.push(child);
        }
    }

    /// Descend from the root to the leftmost leaf, for map/set-op scans.
    fn leftmost_leaf(&self) -> CResult<NodeId> {
        let mut cur = self.root;
        while !self.node(cur)?.is_leaf() {
            cur = self.node(cur)?.children()?[0];
        }
        Ok(cur)
    }

    /// Returns `KEY_PRESENT`/`KEY_NOT_PRESENT`. Never mutates.
    pub fn search(&self, key: &K) -> CResult<Presence> {
        let path = self.descend(key)?;
        let leaf = *path.last().unwrap();
        let (_, found) = self.locate_in_leaf(leaf, key)?;
        Ok(if found { Presence::Present } else { Presence::NotPresent })
    }

    /// Like `search`, but also returns the stored value on `KEY_PRESENT`.
    /// The caller does not own the returned value; it remains the tree's.
    pub fn retrieve(&self, key: &K) -> CResult<Option<&V>> {
        let path = self.descend(key)?;
        let leaf = *path.last().unwrap();
        let (idx, found) = self.locate_in_leaf(leaf, key)?;
        if !found {
            return Ok(None);
        }
        Ok(Some(&self.node(leaf)?.leaf_values()?[idx]))
    }

    /// In-order traversal, calling `f(key, value)` for every leaf entry.
    pub fn map(&self, mut f: impl FnMut(&K, &V)) -> CResult<()> {
        let mut cur = Some(self.leftmost_leaf()?);
        while let Some(id) = cur {
            let node = self.node(id)?;
            let values = node.leaf_values()?;
            for (k, v) in node.keys.iter().zip(values.iter()) {
                f(k, v);
            }
            cur = node.sibling()?;
        }
        Ok(())
    }

    pub fn status(&self) -> CResult<Status> {
        let mut keys = 0u64;
        self.map_count(&mut keys)?;
        Ok(Status { keys, levels: self.node(self.root)?.level + 1, capacity: self.capacity })
    }

    fn map_count(&self, count: &mut u64) -> CResult<()> {
        let mut cur = Some(self.leftmost_leaf()?);
        while let Some(id) = cur {
            let node = self.node(id)?;
            *count += node.item_count() as u64;
            cur = node.sibling()?;
        }
        Ok(())
    }

    pub(crate) fn leaf_scan(&self) -> CResult<LeafScan<'_, K, V>> {
        Ok(LeafScan { tree: self, cur: Some(self.leftmost_leaf()?), pos: 0 })
    }
}

/// Mutating operations. Keys are duplicated whenever they're promoted to
/// a parent separator, so these all require `K: Clone`.
impl<K: Clone, V> Tree<K, V> {
    /// Inserts `(key, value)`. Returns `Err(DuplicateKey)` without
    /// modifying the tree if `key` is already present.
    pub fn insert(&mut self, key: K, value: V) -> CResult<()> {
        let mut path = self.descend(&key)?;
        let leaf = *path.last().unwrap();
        let (idx, found) = self.locate_in_leaf(leaf, &key)?;
        if found {
            return Err(Error::DuplicateKey);
        }

        {
            let node = self.node_mut(leaf)?;
            node.keys.insert(idx, key);
            node.leaf_values_mut()?.insert(idx, value);
        }

        if self.node(leaf)?.item_count() > self.capacity {
            self.split_up(&mut path)?;
        }
        Ok(())
    }

    /// Splits the overfull leaf at the tail of `path`, propagating the
    /// promoted separator up towards the root. Each level either absorbs
    /// the separator (inserted exactly once) or, if that insertion
    /// overflows it, splits on the spot and promotes its own separator to
    /// the level above -- mirroring `cow::ops::cow_insert`'s
    /// insert-then-check-then-split step, so a promoted key and its child
    /// are never written into a node more than once.
    fn split_up(&mut self, path: &mut Vec<NodeId>) -> CResult<()> {
        let leaf = path.pop().unwrap();
        let (mut sep, mut right) = self.split_leaf(leaf)?;
        let mut left = leaf;

        loop {
            match path.pop() {
                Some(parent) => {
                    self.insert_separator(parent, &sep, right)?;
                    if self.node(parent)?.item_count() <= self.capacity {
                        return Ok(());
                    }
                    let (new_sep, new_right) = self.split_overfull_branch(parent)?;
                    left = parent;
                    sep = new_sep;
                    right = new_right;
                }
                None => {
                    // `left` was the root; grow the tree by one level.
                    let level = self.node(left)?.level + 1;
                    let mut new_root = Node::new_branch(level);
                    new_root.keys.push(sep);
                    new_root.children_mut()?.push(left);
                    new_root.children_mut()?.push(right);
                    self.root = self.alloc(new_root);
                    return Ok(());
                }
            }
        }
    }

    fn split_leaf(&mut self, leaf: NodeId) -> CResult<(K, NodeId)> {
        let split_count = (self.capacity + 1) / 2;
        let node = self.node_mut(leaf)?;
        let total = node.keys.len();
        let split_at = total - split_count;
        let right_keys = node.keys.split_off(split_at);
        let right_values = node.leaf_values_mut()?.split_off(split_at);
        let old_sibling = node.sibling()?;

        let mut right = Node::new_leaf();
        right.keys = right_keys;
        *right.leaf_values_mut()? = right_values;
        right.set_sibling(old_sibling)?;

        let right_id = self.alloc(right);
        self.node_mut(leaf)?.set_sibling(Some(right_id))?;

        let separator = self.node(right_id)?.keys[0].clone();
        Ok((separator, right_id))
    }

    /// Splits a branch that's already overfull (its caller has already
    /// inserted the new separator/child into it via `insert_separator`),
    /// keeping the lower half in `branch` and promoting the middle key.
    /// Does no insertion of its own -- the node handed in is the final,
    /// already-updated one.
    fn split_overfull_branch(&mut self, branch: NodeId) -> CResult<(K, NodeId)> {
        let level = self.node(branch)?.level;
        let node = self.node_mut(branch)?;
        let mid = node.keys.len() / 2;
        let promoted = node.keys.remove(mid);
        let right_keys = node.keys.split_off(mid);
        let right_children = node.children_mut()?.split_off(mid + 1);

        let mut right = Node::new_branch(level);
        right.keys = right_keys;
        *right.children_mut()? = right_children;
        let right_id = self.alloc(right);

        Ok((promoted, right_id))
    }

    /// Inserts a freshly-split child's separator key and right sibling
    /// into `parent`'s keys/children arrays.
    fn insert_separator(&mut self, parent: NodeId, sep: &K, right: NodeId) -> CResult<()> {
        let node = self.node_mut(parent)?;
        let mut idx = node.keys.len();
        for (i, k) in node.keys.iter().enumerate() {
            if self.cmp(sep, k) == Ordering::Less {
                idx = i;
                break;
            }
        }
        node.keys.insert(idx, sep.clone());
        node.children_mut()?.insert(idx + 1, right);
        Ok(())
    }

    /// Deletes `key`. Returns `KEY_NOT_PRESENT` without modifying the
    /// tree if `key` is absent.
    pub fn delete(&mut self, key: &K) -> CResult<Presence> {
        let mut path = self.descend(key)?;
        let leaf = *path.last().unwrap();
        let (idx, found) = self.locate_in_leaf(leaf, key)?;
        if !found {
            return Ok(Presence::NotPresent);
        }

        {
            let node = self.node_mut(leaf)?;
            node.keys.remove(idx);
            node.leaf_values_mut()?.remove(idx);
        }

        if path.len() > 1 && self.node(leaf)?.item_count() < self.min_fill() {
            self.rebalance(&mut path)?;
        }
        self.collapse_root_if_needed()?;
        Ok(Presence::Present)
    }

    /// Finds `child`'s index within `parent`'s children array.
    fn child_index(&self, parent: NodeId, child: NodeId) -> CResult<usize> {
        self.node(parent)?
            .children()?
            .iter()
            .position(|&c| c == child)
            .ok_or(Error::InvalidPointer)
    }

    /// Borrows from a sibling or merges, walking upward from `path`'s
    /// tail as long as underflow propagates.
    fn rebalance(&mut self, path: &mut Vec<NodeId>) -> CResult<()> {
        while path.len() > 1 {
            let node_id = *path.last().unwrap();
            if self.node(node_id)?.item_count() >= self.min_fill() {
                return Ok(());
            }
            let parent = path[path.len() - 2];
            let idx = self.child_index(parent, node_id)?;
            let left = if idx > 0 { Some(self.node(parent)?.children()?[idx - 1]) } else { None };
            let right_sib = {
                let children = self.node(parent)?.children()?;
                if idx + 1 < children.len() { Some(children[idx + 1]) } else { None }
            };

            if let Some(left) = left {
                if self.node(left)?.item_count() > self.min_fill() {
                    self.borrow_from_left(parent, idx, left, node_id)?;
                    return Ok(());
                }
            }
            if let Some(right) = right_sib {
                if self.node(right)?.item_count() > self.min_fill() {
                    self.borrow_from_right(parent, idx, node_id, right)?;
                    return Ok(());
                }
            }
            if let Some(left) = left {
                self.merge(parent, idx - 1, left, node_id)?;
            } else if let Some(right) = right_sib {
                self.merge(parent, idx, node_id, right)?;
            } else {
                // Only child of the root: nothing to borrow from or merge
                // with; leave it underfull, same as the root itself.
                return Ok(());
            }

            path.pop();
        }
        Ok(())
    }

    fn borrow_from_left(&mut self, parent: NodeId, right_idx: usize, left: NodeId, right: NodeId) -> CResult<()> {
        if self.node(left)?.is_leaf() {
            let moved_key = self.node_mut(left)?.keys.pop().unwrap();
            let moved_val = self.node_mut(left)?.leaf_values_mut()?.pop().unwrap();
            {
                let r = self.node_mut(right)?;
                r.keys.insert(0, moved_key.clone());
                r.leaf_values_mut()?.insert(0, moved_val);
            }
            self.node_mut(parent)?.keys[right_idx - 1] = moved_key;
        } else {
            let moved_key = self.node_mut(left)?.keys.pop().unwrap();
            let moved_child = self.node_mut(left)?.children_mut()?.pop().unwrap();
            let down = std::mem::replace(&mut self.node_mut(parent)?.keys[right_idx - 1], moved_key);
            let r = self.node_mut(right)?;
            r.keys.insert(0, down);
            r.children_mut()?.insert(0, moved_child);
        }
        Ok(())
    }

    fn borrow_from_right(&mut self, parent: NodeId, left_idx: usize, left: NodeId, right: NodeId) -> CResult<()> {
        if self.node(right)?.is_leaf() {
            let moved_key = self.node_mut(right)?.keys.remove(0);
            let moved_val = self.node_mut(right)?.leaf_values_mut()?.remove(0);
            self.node_mut(left)?.keys.push(moved_key);
            self.node_mut(left)?.leaf_values_mut()?.push(moved_val);
            let new_sep = self.node(right)?.keys[0].clone();
            self.node_mut(parent)?.keys[left_idx] = new_sep;
        } else {
            let moved_key = self.node_mut(right)?.keys.remove(0);
            let moved_child = self.node_mut(right)?.children_mut()?.remove(0);
            let down = std::mem::replace(&mut self.node_mut(parent)?.keys[left_idx], moved_key);
            self.node_mut(left)?.keys.push(down);
            self.node_mut(left)?.children_mut()?.push(moved_child);
        }
        Ok(())
    }

    /// Merges `right` into `left` (both children of `parent` at index
    /// `left_idx`/`left_idx + 1`), collapsing the separator between them.
    fn merge(&mut self, parent: NodeId, left_idx: usize, left: NodeId, right: NodeId) -> CResult<()> {
        let is_leaf = self.node(left)?.is_leaf();
        if is_leaf {
            let right_keys = std::mem::take(&mut self.node_mut(right)?.keys);
            let right_vals = std::mem::take(self.node_mut(right)?.leaf_values_mut()?);
            let right_sibling = self.node(right)?.sibling()?;
            {
                let l = self.node_mut(left)?;
                l.keys.extend(right_keys);
                l.leaf_values_mut()?.extend(right_vals);
                l.set_sibling(right_sibling)?;
            }
        } else {
            let sep = self.node_mut(parent)?.keys[left_idx].clone();
            let right_keys = std::mem::take(&mut self.node_mut(right)?.keys);
            let right_children = std::mem::take(self.node_mut(right)?.children_mut()?);
            let l = self.node_mut(left)?;
            l.keys.push(sep);
            l.keys.extend(right_keys);
            l.children_mut()?.extend(right_children);
        }
        self.node_mut(parent)?.keys.remove(left_idx);
        self.node_mut(parent)?.children_mut()?.remove(left_idx + 1);
        self.dealloc(right);
        Ok(())
    }

    /// If the root is a branch with zero keys (one child left after
    /// merges), that child becomes the new root.
    fn collapse_root_if_needed(&mut self) -> CResult<()> {
        loop {
            let root = self.node(self.root)?;
            if root.is_leaf() || !root.keys.is_empty() {
                return Ok(());
            }
            let only_child = root.children()?[0];
            let old_root = self.root;
            self.root = only_child;
            self.dealloc(old_root);
        }
    }

    /// Destroys current contents and builds a tree bottom-up from
    /// already-sorted, already-distinct `items`.
    pub fn bulk_load(&mut self, items: Vec<(K, V)>) -> CResult<()> {
        for w in items.windows(2) {
            if self.cmp(&w[0].0, &w[1].0) != Ordering::Less {
                return Err(Error::InvalidKeyOrder);
            }
        }

        self.arena.clear();
        self.free.clear();

        if items.is_empty() {
            self.arena.push(Some(Node::new_leaf()));
            self.root = 0;
            return Ok(());
        }

        let mut leaf_ids = Vec::new();
        let mut iter = items.into_iter().peekable();
        while iter.peek().is_some() {
            let mut keys = crate::alloc::checked_vec_with_capacity(self.capacity);
            let mut values = crate::alloc::checked_vec_with_capacity(self.capacity);
            for _ in 0..self.capacity {
                match iter.next() {
                    Some((k, v)) => {
                        keys.push(k);
                        values.push(v);
                    }
                    None => break,
                }
            }
            let mut leaf = Node::new_leaf();
            leaf.keys = keys;
            *leaf.leaf_values_mut()? = values;
            leaf_ids.push(self.alloc(leaf));
        }
        for w in leaf_ids.windows(2) {
            let next = w[1];
            self.node_mut(w[0])?.set_sibling(Some(next))?;
        }

        let mut level = 0u32;
        let mut current = leaf_ids;
        while current.len() > 1 {
            level += 1;
            let mut next_level = Vec::new();
            let chunk_iter = current.chunks(self.capacity + 1);
            for chunk in chunk_iter {
                let mut branch = Node::new_branch(level);
                for (i, &child) in chunk.iter().enumerate() {
                    branch.children_mut()?.push(child);
                    if i > 0 {
                        let min_key = self.min_key_of(child)?;
                        branch.keys.push(min_key);
                    }
                }
                next_level.push(self.alloc(branch));
            }
            current = next_level;
        }
        self.root = current[0];
        Ok(())
    }

    fn min_key_of(&self, node: NodeId) -> CResult<K> {
        let mut cur = node;
        loop {
            let n = self.node(cur)?;
            if n.is_leaf() {
                return Ok(n.keys[0].clone());
            }
            cur = n.children()?[0];
        }
    }
}

/// Read-only integrity checks. Kept in their own `impl` block, bounded on
/// `Hash`, since checksum comparison (the one thing here that needs it)
/// hashes key/value contents rather than requiring a byte representation.
impl<K: Hash, V: Hash> Tree<K, V> {
    /// Walks the tree asserting every invariant; when the `checksum`
    /// feature is enabled, also checks every node with a previously
    /// computed checksum (see [`Tree::recompute_checksums`]) against its
    /// current contents.
    pub fn verify(&self) -> CResult<()> {
        self.verify_node(self.root, true, None, None).inspect_err(|error| {
            log::error!("bptree verify failed: {error}");
        })
    }

    fn verify_node(&self, id: NodeId, is_root: bool, lower: Option<&K>, upper: Option<&K>) -> CResult<()> {
        let node = self.node(id)?;

        if !is_root && (node.item_count() < self.min_fill() || node.item_count() > self.capacity) {
            return Err(Error::InvalidNode);
        }
        for w in node.keys.windows(2) {
            if self.cmp(&w[0], &w[1]) != Ordering::Less {
                return Err(Error::InvalidKeyOrder);
            }
        }
        if let Some(lower) = lower {
            if let Some(first) = node.keys.first() {
                if self.cmp(first, lower) == Ordering::Less {
                    return Err(Error::InvalidKeyOrder);
                }
            }
        }
        if let Some(upper) = upper {
            if let Some(last) = node.keys.last() {
                if self.cmp(last, upper) != Ordering::Less {
                    return Err(Error::InvalidKeyOrder);
                }
            }
        }

        #[cfg(feature = "checksum")]
        self.verify_checksum(node)?;

        match &node.payload {
            Payload::Leaf { values, .. } => {
                if values.len() != node.keys.len() {
                    return Err(Error::InvalidNode);
                }
            }
            Payload::Branch { children } => {
                if children.len() != node.keys.len() + 1 {
                    return Err(Error::InvalidNode);
                }
                for (i, &child) in children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { Some(&node.keys[i - 1]) };
                    let hi = if i < node.keys.len() { Some(&node.keys[i]) } else { upper };
                    self.verify_node(child, false, lo, hi)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(feature = "checksum")]
impl<K: Hash, V: Hash> Tree<K, V> {
    /// Recomputes and stores a CRC32C over every live node's contents.
    /// Opt-in maintenance: nothing calls this automatically, matching the
    /// original's treatment of checksumming as a bug-triage aid rather
    /// than an always-on invariant.
    pub fn recompute_checksums(&mut self) -> CResult<()> {
        for slot in self.arena.iter_mut() {
            if let Some(node) = slot {
                node.checksum = Self::compute_checksum(node);
            }
        }
        Ok(())
    }

    fn compute_checksum(node: &Node<K, V>) -> u32 {
        use std::hash::Hasher;
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        node.level.hash(&mut hasher);
        for k in &node.keys {
            k.hash(&mut hasher);
        }
        match &node.payload {
            Payload::Leaf { values, sibling } => {
                for v in values {
                    v.hash(&mut hasher);
                }
                sibling.hash(&mut hasher);
            }
            Payload::Branch { children } => children.hash(&mut hasher),
        }
        crate::checksum::checksum_bytes(&hasher.finish().to_le_bytes())
    }

    /// A checksum of `0` means "never computed" and is skipped rather
    /// than treated as a mismatch -- `verify` is safe to call on a tree
    /// that never opted into `recompute_checksums`.
    fn verify_checksum(&self, node: &Node<K, V>) -> CResult<()> {
        if node.checksum != 0 && node.checksum != Self::compute_checksum(node) {
            return Err(Error::ChecksumFailure);
        }
        Ok(())
    }
}

/// A forward iterator over `(&K, &V)` pairs in ascending order, walking
/// the leaf sibling chain rather than re-searching from the root.
/// Used by map() and by the set operations.
pub(crate) struct LeafScan<'a, K, V> {
    tree: &'a Tree<K, V>,
    cur: Option<NodeId>,
    pos: usize,
}

impl<'a, K, V> Iterator for LeafScan<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.cur?;
            let node = self.tree.node(id).ok()?;
            let values = node.leaf_values().ok()?;
            if self.pos < node.keys.len() {
                let item = (&node.keys[self.pos], &values[self.pos]);
                self.pos += 1;
                return Some(item);
            }
            self.cur = node.sibling().ok()?;
            self.pos = 0;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callback::u64_comparator;

    fn fresh() -> Tree<u64, u64> {
        Tree::with_capacity(u64_comparator(), 3)
    }

    #[test]
    fn insert_search_retrieve_roundtrip() {
        let mut t = fresh();
        for k in [5u64, 2, 8, 1, 9, 3, 7, 4, 6] {
            t.insert(k, k * 10).unwrap();
        }
        t.verify().unwrap();
        for k in 1..=9u64 {
            assert_eq!(t.search(&k).unwrap(), Presence::Present);
            assert_eq!(t.retrieve(&k).unwrap(), Some(&(k * 10)));
        }
        assert_eq!(t.search(&42).unwrap(), Presence::NotPresent);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut t = fresh();
        t.insert(1u64, 1u64).unwrap();
        assert!(matches!(t.insert(1, 2), Err(Error::DuplicateKey)));
    }

    #[test]
    fn map_visits_in_ascending_order() {
        let mut t = fresh();
        for k in [5u64, 2, 8, 1, 9] {
            t.insert(k, k).unwrap();
        }
        let mut seen = Vec::new();
        t.map(|k, _| seen.push(*k)).unwrap();
        assert_eq!(seen, vec![1, 2, 5, 8, 9]);
    }

    #[test]
    fn delete_down_to_one_key_stays_verifiable() {
        let mut t = fresh();
        let n = 1000u64;
        for k in 0..n {
            t.insert(k, k).unwrap();
        }
        t.verify().unwrap();
        for k in 0..(n - 1) {
            assert_eq!(t.delete(&k).unwrap(), Presence::Present);
            if k % 97 == 0 {
                t.verify().unwrap();
            }
        }
        t.verify().unwrap();
        assert_eq!(t.search(&(n - 1)).unwrap(), Presence::Present);
        assert_eq!(t.status().unwrap().keys, 1);
    }

    #[test]
    fn delete_missing_key_is_a_no_op() {
        let mut t = fresh();
        t.insert(1u64, 1u64).unwrap();
        assert_eq!(t.delete(&2).unwrap(), Presence::NotPresent);
        t.verify().unwrap();
    }

    #[test]
    fn bulk_load_then_insert_then_search() {
        let mut t = fresh();
        let items: Vec<(u64, u64)> = (0..50u64).map(|k| (k, k)).collect();
        t.bulk_load(items).unwrap();
        t.verify().unwrap();
        t.insert(100, 100).unwrap();
        t.verify().unwrap();
        assert_eq!(t.search(&25).unwrap(), Presence::Present);
        assert_eq!(t.search(&100).unwrap(), Presence::Present);
    }

    #[test]
    fn bulk_load_rejects_unsorted_input() {
        let mut t = fresh();
        assert!(matches!(t.bulk_load(vec![(2u64, 2u64), (1, 1)]), Err(Error::InvalidKeyOrder)));
    }

    #[test]
    fn bulk_load_rejects_duplicate_keys() {
        let mut t = fresh();
        assert!(matches!(t.bulk_load(vec![(1u64, 1u64), (1, 1)]), Err(Error::InvalidKeyOrder)));
    }
}
