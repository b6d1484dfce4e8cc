//! Checked allocation.
//!
//! Node splits and merges are not written to be resumable mid-allocation,
//! so rather than unwind through half-updated tree state, allocation
//! failure should abort the process outright. `Box::new` and
//! `Vec::with_capacity` already abort on allocation failure in Rust, so
//! this module is a thin, named wrapper rather than a reimplementation --
//! it exists so the allocation sites that back a tree/trie node
//! (`bptree::tree::Tree::bulk_load`, `trie::Entry::empty_branch`) read as
//! deliberate checked allocations, and as a single point to hook a
//! custom allocator later.

/// Boxes `value`, aborting the process if the allocator is exhausted.
///
/// This is what `Box::new` already does; the wrapper documents the
/// intent at call sites that stand in for a checked allocation.
#[inline]
pub(crate) fn checked_box<T>(value: T) -> Box<T> {
    Box::new(value)
}

/// Allocates a `Vec<T>` with the given capacity, aborting on exhaustion.
#[inline]
pub(crate) fn checked_vec_with_capacity<T>(capacity: usize) -> Vec<T> {
    Vec::with_capacity(capacity)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn checked_box_roundtrips() {
        let b = checked_box(42u64);
        assert_eq!(*b, 42);
    }

    #[test]
    fn checked_vec_has_requested_capacity() {
        let v: Vec<u64> = checked_vec_with_capacity(8);
        assert!(v.capacity() >= 8);
    }
}
