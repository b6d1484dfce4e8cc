//! Key/value callback contract.
//!
//! Keys and values are plain generic types rather than type-erased
//! pointers: `Clone` already gives every type a duplication path, and
//! `Drop` already gives every type a free that runs exactly once --
//! there's no separate free-callback to register or to forget to call.
//! The one piece with no built-in Rust equivalent for non-`Ord` keys (or
//! for orderings other than a type's natural one) is comparison, so that
//! survives as the [`KeyComparator`] trait.

use std::cmp::Ordering;
use std::sync::Arc;

/// A total order over `K`. Implementations must be transitive,
/// antisymmetric, reflexive, and a pure function of key contents.
pub trait KeyComparator<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// A shared, type-erased comparator handle. Two instances are eligible
/// for set operations against each other iff their `Comparator`s point
/// at the same allocation -- see [`same_comparator`].
pub type Comparator<K> = Arc<dyn KeyComparator<K>>;

/// Returns `true` if the given comparators are the same instance --
/// used to reject set operations between incompatibly-configured trees.
pub fn same_comparator<K>(a: &Comparator<K>, b: &Comparator<K>) -> bool {
    Arc::ptr_eq(a, b)
}

/// The natural (`Ord`) comparator, the default for any `K: Ord`.
pub struct Natural;

impl<K: Ord> KeyComparator<K> for Natural {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Builds a shared [`Natural`] comparator.
pub fn natural<K: Ord>() -> Comparator<K> {
    Arc::new(Natural)
}

/// Wraps an arbitrary comparison closure as a `KeyComparator`, for
/// embedders who need an ordering other than `K`'s natural one (e.g.
/// case-insensitive byte-string keys).
pub struct FnComparator<F> {
    f: F,
}

impl<F> FnComparator<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<K, F> KeyComparator<K> for FnComparator<F>
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.f)(a, b)
    }
}

/// Convenience: a comparator over `u64` keys, one of the two
/// specializations Design Notes calls out explicitly.
pub fn u64_comparator() -> Comparator<u64> {
    natural::<u64>()
}

/// Convenience: a comparator over byte-slice keys (`Vec<u8>`), ordered
/// lexicographically -- the other specialization Design Notes calls out.
pub fn bytes_comparator() -> Comparator<Vec<u8>> {
    natural::<Vec<u8>>()
}
