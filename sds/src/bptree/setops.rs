//! Whole-tree set operations, implemented as a single left-to-right merge
//! scan over each instance's sibling-linked leaves.
//!
//! Every operation here rejects instances built with different
//! [`Comparator`](crate::callback::Comparator)s rather than silently
//! picking one side's ordering.

use std::cmp::Ordering;

use crate::callback::same_comparator;
use crate::error::{CResult, Error};

use super::tree::Tree;

fn require_compatible<K, V>(a: &Tree<K, V>, b: &Tree<K, V>) -> CResult<()> {
    if !same_comparator(&a.comparator, &b.comparator) {
        return Err(Error::IncompatibleInstance);
    }
    Ok(())
}

/// All keys present in either `a` or `b`. On a key present in both, `a`'s
/// value is kept.
pub fn union<K: Clone, V: Clone>(a: &Tree<K, V>, b: &Tree<K, V>) -> CResult<Tree<K, V>> {
    require_compatible(a, b)?;
    let mut out = Tree::with_capacity(a.comparator.clone(), a.capacity);
    let mut left = a.leaf_scan()?.peekable();
    let mut right = b.leaf_scan()?.peekable();
    loop {
        match (left.peek(), right.peek()) {
            (Some(&(lk, lv)), Some(&(rk, _))) => match a.comparator.compare(lk, rk) {
                Ordering::Less => {
                    out.insert(lk.clone(), lv.clone())?;
                    left.next();
                }
                Ordering::Greater => {
                    let (rk, rv) = right.next().unwrap();
                    out.insert(rk.clone(), rv.clone())?;
                }
                Ordering::Equal => {
                    out.insert(lk.clone(), lv.clone())?;
                    left.next();
                    right.next();
                }
            },
            (Some(&(lk, lv)), None) => {
                out.insert(lk.clone(), lv.clone())?;
                left.next();
            }
            (None, Some(&(rk, rv))) => {
                out.insert(rk.clone(), rv.clone())?;
                right.next();
            }
            (None, None) => break,
        }
    }
    Ok(out)
}

/// Keys present in both `a` and `b`, with `a`'s value.
pub fn intersect<K: Clone, V: Clone>(a: &Tree<K, V>, b: &Tree<K, V>) -> CResult<Tree<K, V>> {
    require_compatible(a, b)?;
    let mut out = Tree::with_capacity(a.comparator.clone(), a.capacity);
    let mut left = a.leaf_scan()?.peekable();
    let mut right = b.leaf_scan()?.peekable();
    loop {
        match (left.peek(), right.peek()) {
            (Some(&(lk, lv)), Some(&(rk, _))) => match a.comparator.compare(lk, rk) {
                Ordering::Less => {
                    left.next();
                }
                Ordering::Greater => {
                    right.next();
                }
                Ordering::Equal => {
                    out.insert(lk.clone(), lv.clone())?;
                    left.next();
                    right.next();
                }
            },
            _ => break,
        }
    }
    Ok(out)
}

/// Keys present in `a` but absent from `b`.
pub fn difference<K: Clone, V: Clone>(a: &Tree<K, V>, b: &Tree<K, V>) -> CResult<Tree<K, V>> {
    require_compatible(a, b)?;
    let mut out = Tree::with_capacity(a.comparator.clone(), a.capacity);
    let mut left = a.leaf_scan()?.peekable();
    let mut right = b.leaf_scan()?.peekable();
    loop {
        match (left.peek(), right.peek()) {
            (Some(&(lk, lv)), Some(&(rk, _))) => match a.comparator.compare(lk, rk) {
                Ordering::Less => {
                    out.insert(lk.clone(), lv.clone())?;
                    left.next();
                }
                Ordering::Greater => {
                    right.next();
                }
                Ordering::Equal => {
                    left.next();
                    right.next();
                }
            },
            (Some(&(lk, lv)), None) => {
                out.insert(lk.clone(), lv.clone())?;
                left.next();
            }
            _ => break,
        }
    }
    Ok(out)
}

/// Keys present in `b` but absent from `a` -- the complement of `a`
/// relative to `b`. `difference(a, b)` and `compliment(a, b)` together
/// partition the union of the two instances.
pub fn compliment<K: Clone, V: Clone>(a: &Tree<K, V>, b: &Tree<K, V>) -> CResult<Tree<K, V>> {
    difference(b, a)
}

/// A new instance holding only the entries of `a` for which `predicate`
/// returns `true`.
pub fn filter<K: Clone, V: Clone>(a: &Tree<K, V>, mut predicate: impl FnMut(&K, &V) -> bool) -> CResult<Tree<K, V>> {
    let mut out = Tree::with_capacity(a.comparator.clone(), a.capacity);
    for (k, v) in a.leaf_scan()? {
        if predicate(k, v) {
            out.insert(k.clone(), v.clone())?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::callback::u64_comparator;

    fn of(items: &[u64]) -> Tree<u64, u64> {
        let mut t = Tree::with_capacity(u64_comparator(), 3);
        for &k in items {
            t.insert(k, k).unwrap();
        }
        t
    }

    fn keys(t: &Tree<u64, u64>) -> Vec<u64> {
        let mut out = Vec::new();
        t.map(|k, _| out.push(*k)).unwrap();
        out
    }

    #[test]
    fn union_merges_and_dedups() {
        let a = of(&[1, 3, 5]);
        let b = of(&[3, 4, 5, 6]);
        assert_eq!(keys(&union(&a, &b).unwrap()), vec![1, 3, 4, 5, 6]);
    }

    #[test]
    fn intersect_keeps_shared_keys() {
        let a = of(&[1, 3, 5, 7]);
        let b = of(&[3, 4, 5, 6]);
        assert_eq!(keys(&intersect(&a, &b).unwrap()), vec![3, 5]);
    }

    #[test]
    fn difference_keeps_left_only_keys() {
        let a = of(&[1, 3, 5, 7]);
        let b = of(&[3, 4, 5, 6]);
        assert_eq!(keys(&difference(&a, &b).unwrap()), vec![1, 7]);
    }

    #[test]
    fn compliment_keeps_right_only_keys() {
        let a = of(&[1, 3, 5, 7]);
        let b = of(&[3, 4, 5, 6]);
        assert_eq!(keys(&compliment(&a, &b).unwrap()), vec![4, 6]);
    }

    #[test]
    fn filter_keeps_matching_entries() {
        let a = of(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(keys(&filter(&a, |k, _| k % 2 == 0).unwrap()), vec![2, 4, 6]);
    }

    #[test]
    fn set_ops_reject_incompatible_comparators() {
        let a = Tree::<u64, u64>::with_capacity(u64_comparator(), 3);
        let b = Tree::<u64, u64>::with_capacity(u64_comparator(), 3);
        assert!(matches!(union(&a, &b), Err(Error::IncompatibleInstance)));
    }
}
