//! The recursive, copy-on-write tree algorithms: every mutating
//! operation returns a brand new root (sharing untouched subtrees with
//! the old one via `Arc` clones) instead of mutating in place, so a
//! concurrently running reader pinned to the old root sees a perfectly
//! consistent, unchanged snapshot.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::callback::Comparator;
use crate::error::{CResult, Error, Presence};

use super::node::{CowNode, CowPayload};

fn cmp<K>(comparator: &Comparator<K>, a: &K, b: &K) -> Ordering {
    comparator.compare(a, b)
}

fn locate<K, V>(node: &CowNode<K, V>, key: &K, comparator: &Comparator<K>) -> (usize, bool) {
    for (i, k) in node.keys.iter().enumerate() {
        match cmp(comparator, key, k) {
            Ordering::Less => return (i, false),
            Ordering::Equal => return (i, true),
            Ordering::Greater => {}
        }
    }
    (node.keys.len(), false)
}

fn branch_child_index<K, V>(node: &CowNode<K, V>, key: &K, comparator: &Comparator<K>) -> usize {
    let mut idx = 0;
    for (i, k) in node.keys.iter().enumerate() {
        if cmp(comparator, key, k) == Ordering::Less {
            break;
        }
        idx = i + 1;
    }
    idx
}

/// Read-only lookup over a pinned snapshot. Never allocates.
pub(crate) fn cow_search<K, V>(root: &Arc<CowNode<K, V>>, key: &K, comparator: &Comparator<K>) -> CResult<Presence> {
    let mut cur = root;
    loop {
        if cur.is_leaf() {
            let (_, found) = locate(cur, key, comparator);
            return Ok(if found { Presence::Present } else { Presence::NotPresent });
        }
        let idx = branch_child_index(cur, key, comparator);
        cur = &cur.children()?[idx];
    }
}

pub(crate) fn cow_retrieve<'a, K, V>(
    root: &'a Arc<CowNode<K, V>>,
    key: &K,
    comparator: &Comparator<K>,
) -> CResult<Option<&'a V>> {
    let mut cur = root;
    loop {
        if cur.is_leaf() {
            let (idx, found) = locate(cur, key, comparator);
            return if found { Ok(Some(&cur.leaf_values()?[idx])) } else { Ok(None) };
        }
        let idx = branch_child_index(cur, key, comparator);
        cur = &cur.children()?[idx];
    }
}

pub(crate) enum InsertResult<K, V> {
    Done(Arc<CowNode<K, V>>),
    Split { left: Arc<CowNode<K, V>>, separator: K, right: Arc<CowNode<K, V>> },
}

pub(crate) fn cow_insert<K: Clone, V: Clone>(
    node: &Arc<CowNode<K, V>>,
    txn_id: u64,
    capacity: usize,
    comparator: &Comparator<K>,
    key: K,
    value: V,
) -> CResult<InsertResult<K, V>> {
    if node.is_leaf() {
        let (idx, found) = locate(node, &key, comparator);
        if found {
            return Err(Error::DuplicateKey);
        }
        let mut keys = node.keys.clone();
        keys.insert(idx, key);
        let mut values = node.leaf_values()?.clone();
        values.insert(idx, value);
        let sibling = node.sibling()?;

        if keys.len() <= capacity {
            return Ok(InsertResult::Done(Arc::new(CowNode { level: 0, keys, payload: CowPayload::Leaf { values, sibling }, txn_id })));
        }

        let split_count = (capacity + 1) / 2;
        let split_at = keys.len() - split_count;
        let right_keys = keys.split_off(split_at);
        let right_values = values.split_off(split_at);
        let right = Arc::new(CowNode { level: 0, keys: right_keys, payload: CowPayload::Leaf { values: right_values, sibling }, txn_id });
        let separator = right.keys[0].clone();
        let left = Arc::new(CowNode { level: 0, keys, payload: CowPayload::Leaf { values, sibling: Some(right.clone()) }, txn_id });
        return Ok(InsertResult::Split { left, separator, right });
    }

    let children = node.children()?;
    let idx = branch_child_index(node, &key, comparator);
    let child_result = cow_insert(&children[idx], txn_id, capacity, comparator, key, value)?;

    match child_result {
        InsertResult::Done(new_child) => {
            let mut new_children = children.clone();
            new_children[idx] = new_child;
            Ok(InsertResult::Done(Arc::new(CowNode {
                level: node.level,
                keys: node.keys.clone(),
                payload: CowPayload::Branch { children: new_children },
                txn_id,
            })))
        }
        InsertResult::Split { left, separator, right } => {
            let mut new_keys = node.keys.clone();
            new_keys.insert(idx, separator);
            let mut new_children = children.clone();
            new_children[idx] = left;
            new_children.insert(idx + 1, right);

            if new_keys.len() <= capacity {
                return Ok(InsertResult::Done(Arc::new(CowNode {
                    level: node.level,
                    keys: new_keys,
                    payload: CowPayload::Branch { children: new_children },
                    txn_id,
                })));
            }

            let mid = new_keys.len() / 2;
            let promoted = new_keys.remove(mid);
            let right_keys = new_keys.split_off(mid);
            let right_children = new_children.split_off(mid + 1);
            let right = Arc::new(CowNode { level: node.level, keys: right_keys, payload: CowPayload::Branch { children: right_children }, txn_id });
            let left = Arc::new(CowNode { level: node.level, keys: new_keys, payload: CowPayload::Branch { children: new_children }, txn_id });
            Ok(InsertResult::Split { left, separator: promoted, right })
        }
    }
}

pub(crate) struct DeleteOutcome<K, V> {
    pub(crate) node: Arc<CowNode<K, V>>,
    pub(crate) underflow: bool,
}

enum Rebalanced<K, V> {
    Borrowed { left: Arc<CowNode<K, V>>, separator: K, right: Arc<CowNode<K, V>> },
    Merged { merged: Arc<CowNode<K, V>> },
}

fn rebalance_pair<K: Clone, V: Clone>(
    left: &Arc<CowNode<K, V>>,
    right: &Arc<CowNode<K, V>>,
    parent_separator: &K,
    min_fill: usize,
    txn_id: u64,
) -> CResult<Rebalanced<K, V>> {
    if left.is_leaf() {
        if left.item_count() > min_fill {
            let mut lk = left.keys.clone();
            let moved_k = lk.pop().unwrap();
            let mut lv = left.leaf_values()?.clone();
            let moved_v = lv.pop().unwrap();
            let mut rk = right.keys.clone();
            rk.insert(0, moved_k.clone());
            let mut rv = right.leaf_values()?.clone();
            rv.insert(0, moved_v);
            let new_right = Arc::new(CowNode { level: 0, keys: rk, payload: CowPayload::Leaf { values: rv, sibling: right.sibling()? }, txn_id });
            let new_left = Arc::new(CowNode { level: 0, keys: lk, payload: CowPayload::Leaf { values: lv, sibling: Some(new_right.clone()) }, txn_id });
            return Ok(Rebalanced::Borrowed { left: new_left, separator: moved_k, right: new_right });
        }
        if right.item_count() > min_fill {
            let mut rk = right.keys.clone();
            let moved_k = rk.remove(0);
            let mut rv = right.leaf_values()?.clone();
            let moved_v = rv.remove(0);
            let new_sep = rk[0].clone();
            let new_right = Arc::new(CowNode { level: 0, keys: rk, payload: CowPayload::Leaf { values: rv, sibling: right.sibling()? }, txn_id });
            let mut lk = left.keys.clone();
            lk.push(moved_k);
            let mut lv = left.leaf_values()?.clone();
            lv.push(moved_v);
            let new_left = Arc::new(CowNode { level: 0, keys: lk, payload: CowPayload::Leaf { values: lv, sibling: Some(new_right.clone()) }, txn_id });
            return Ok(Rebalanced::Borrowed { left: new_left, separator: new_sep, right: new_right });
        }
        let mut lk = left.keys.clone();
        lk.extend(right.keys.clone());
        let mut lv = left.leaf_values()?.clone();
        lv.extend(right.leaf_values()?.clone());
        let merged = Arc::new(CowNode { level: 0, keys: lk, payload: CowPayload::Leaf { values: lv, sibling: right.sibling()? }, txn_id });
        return Ok(Rebalanced::Merged { merged });
    }

    if left.item_count() > min_fill {
        let mut lk = left.keys.clone();
        let moved_sep = lk.pop().unwrap();
        let mut lc = left.children()?.clone();
        let moved_child = lc.pop().unwrap();
        let new_left = Arc::new(CowNode { level: left.level, keys: lk, payload: CowPayload::Branch { children: lc }, txn_id });
        let mut rk = right.keys.clone();
        rk.insert(0, parent_separator.clone());
        let mut rc = right.children()?.clone();
        rc.insert(0, moved_child);
        let new_right = Arc::new(CowNode { level: right.level, keys: rk, payload: CowPayload::Branch { children: rc }, txn_id });
        return Ok(Rebalanced::Borrowed { left: new_left, separator: moved_sep, right: new_right });
    }
    if right.item_count() > min_fill {
        let mut rk = right.keys.clone();
        let moved_sep = rk.remove(0);
        let mut rc = right.children()?.clone();
        let moved_child = rc.remove(0);
        let new_right = Arc::new(CowNode { level: right.level, keys: rk, payload: CowPayload::Branch { children: rc }, txn_id });
        let mut lk = left.keys.clone();
        lk.push(parent_separator.clone());
        let mut lc = left.children()?.clone();
        lc.push(moved_child);
        let new_left = Arc::new(CowNode { level: left.level, keys: lk, payload: CowPayload::Branch { children: lc }, txn_id });
        return Ok(Rebalanced::Borrowed { left: new_left, separator: moved_sep, right: new_right });
    }
    let mut lk = left.keys.clone();
    lk.push(parent_separator.clone());
    lk.extend(right.keys.clone());
    let mut lc = left.children()?.clone();
    lc.extend(right.children()?.clone());
    let merged = Arc::new(CowNode { level: left.level, keys: lk, payload: CowPayload::Branch { children: lc }, txn_id });
    Ok(Rebalanced::Merged { merged })
}

/// Returns `Ok(None)` if `key` was absent anywhere in this subtree.
pub(crate) fn cow_delete<K: Clone, V: Clone>(
    node: &Arc<CowNode<K, V>>,
    is_root: bool,
    min_fill: usize,
    comparator: &Comparator<K>,
    txn_id: u64,
    key: &K,
) -> CResult<Option<DeleteOutcome<K, V>>> {
    if node.is_leaf() {
        let (idx, found) = locate(node, key, comparator);
        if !found {
            return Ok(None);
        }
        let mut keys = node.keys.clone();
        keys.remove(idx);
        let mut values = node.leaf_values()?.clone();
        values.remove(idx);
        let underflow = !is_root && keys.len() < min_fill;
        let sibling = node.sibling()?;
        let new_leaf = Arc::new(CowNode { level: 0, keys, payload: CowPayload::Leaf { values, sibling }, txn_id });
        return Ok(Some(DeleteOutcome { node: new_leaf, underflow }));
    }

    let children = node.children()?;
    let idx = branch_child_index(node, key, comparator);
    let outcome = cow_delete(&children[idx], false, min_fill, comparator, txn_id, key)?;
    let Some(DeleteOutcome { node: new_child, underflow }) = outcome else {
        return Ok(None);
    };

    if !underflow {
        let mut new_children = children.clone();
        new_children[idx] = new_child;
        let new_branch = Arc::new(CowNode {
            level: node.level,
            keys: node.keys.clone(),
            payload: CowPayload::Branch { children: new_children },
            txn_id,
        });
        return Ok(Some(DeleteOutcome { node: new_branch, underflow: false }));
    }

    if idx > 0 {
        let rebalanced = rebalance_pair(&children[idx - 1], &new_child, &node.keys[idx - 1], min_fill, txn_id)?;
        return Ok(Some(finish_branch_rebalance(node, idx - 1, rebalanced, is_root, min_fill, txn_id)));
    }
    if idx + 1 < children.len() {
        let rebalanced = rebalance_pair(&new_child, &children[idx + 1], &node.keys[idx], min_fill, txn_id)?;
        return Ok(Some(finish_branch_rebalance(node, idx, rebalanced, is_root, min_fill, txn_id)));
    }

    // Only child: nothing to borrow from or merge with.
    let mut new_children = children.clone();
    new_children[idx] = new_child;
    let new_branch = Arc::new(CowNode { level: node.level, keys: node.keys.clone(), payload: CowPayload::Branch { children: new_children }, txn_id });
    Ok(Some(DeleteOutcome { node: new_branch, underflow: false }))
}

fn finish_branch_rebalance<K: Clone, V: Clone>(
    node: &Arc<CowNode<K, V>>,
    left_idx: usize,
    rebalanced: Rebalanced<K, V>,
    is_root: bool,
    min_fill: usize,
    txn_id: u64,
) -> DeleteOutcome<K, V> {
    let children = node.children().expect("branch");
    match rebalanced {
        Rebalanced::Borrowed { left, separator, right } => {
            let mut new_keys = node.keys.clone();
            new_keys[left_idx] = separator;
            let mut new_children = children.clone();
            new_children[left_idx] = left;
            new_children[left_idx + 1] = right;
            let new_branch = Arc::new(CowNode { level: node.level, keys: new_keys, payload: CowPayload::Branch { children: new_children }, txn_id });
            DeleteOutcome { node: new_branch, underflow: false }
        }
        Rebalanced::Merged { merged } => {
            let mut new_keys = node.keys.clone();
            new_keys.remove(left_idx);
            let mut new_children = children.clone();
            new_children.remove(left_idx + 1);
            new_children[left_idx] = merged;
            let underflow = !is_root && new_keys.len() < min_fill;
            let new_branch = Arc::new(CowNode { level: node.level, keys: new_keys, payload: CowPayload::Branch { children: new_children }, txn_id });
            DeleteOutcome { node: new_branch, underflow }
        }
    }
}

/// If `root` is a branch with zero keys, its single child is the new
/// root; repeats in case collapsing cascades.
pub(crate) fn collapse_root<K, V>(mut root: Arc<CowNode<K, V>>) -> CResult<Arc<CowNode<K, V>>> {
    loop {
        if root.is_leaf() || !root.keys.is_empty() {
            return Ok(root);
        }
        root = root.children()?[0].clone();
    }
}

/// Walks the whole tree checking the same structural invariants the
/// plain tree's `verify` checks.
pub(crate) fn cow_verify<K, V>(root: &Arc<CowNode<K, V>>, comparator: &Comparator<K>, capacity: usize, min_fill: usize) -> CResult<()> {
    verify_node(root, true, comparator, capacity, min_fill, None, None)
}

fn verify_node<K, V>(
    node: &Arc<CowNode<K, V>>,
    is_root: bool,
    comparator: &Comparator<K>,
    capacity: usize,
    min_fill: usize,
    lower: Option<&K>,
    upper: Option<&K>,
) -> CResult<()> {
    if !is_root && (node.item_count() < min_fill || node.item_count() > capacity) {
        return Err(Error::InvalidNode);
    }
    for w in node.keys.windows(2) {
        if cmp(comparator, &w[0], &w[1]) != Ordering::Less {
            return Err(Error::InvalidKeyOrder);
        }
    }
    if let Some(lower) = lower {
        if let Some(first) = node.keys.first() {
            if cmp(comparator, first, lower) == Ordering::Less {
                return Err(Error::InvalidKeyOrder);
            }
        }
    }
    if let Some(upper) = upper {
        if let Some(last) = node.keys.last() {
            if cmp(comparator, last, upper) != Ordering::Less {
                return Err(Error::InvalidKeyOrder);
            }
        }
    }
    match &node.payload {
        CowPayload::Leaf { values, .. } => {
            if values.len() != node.keys.len() {
                return Err(Error::InvalidNode);
            }
        }
        CowPayload::Branch { children } => {
            if children.len() != node.keys.len() + 1 {
                return Err(Error::InvalidNode);
            }
            for (i, child) in children.iter().enumerate() {
                let lo = if i == 0 { lower } else { Some(&node.keys[i - 1]) };
                let hi = if i < node.keys.len() { Some(&node.keys[i]) } else { upper };
                verify_node(child, false, comparator, capacity, min_fill, lo, hi)?;
            }
        }
    }
    Ok(())
}

/// In-order traversal via leaf sibling links.
pub(crate) fn cow_map<K, V>(root: &Arc<CowNode<K, V>>, mut f: impl FnMut(&K, &V)) -> CResult<()> {
    let mut cur = root.clone();
    loop {
        while !cur.is_leaf() {
            let next = cur.children()?[0].clone();
            cur = next;
        }
        for (k, v) in cur.keys.iter().zip(cur.leaf_values()?.iter()) {
            f(k, v);
        }
        match cur.sibling()? {
            Some(next) => cur = next,
            None => return Ok(()),
        }
    }
}
