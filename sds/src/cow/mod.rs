//! A transactional, copy-on-write B+tree: the same shape as
//! [`crate::bptree`] but every write builds a new, structurally shared
//! tree instead of mutating one in place, so a reader pinned to an older
//! snapshot is unaffected by (and invisible to) a writer building the
//! next one.

mod instance;
mod node;
mod ops;
mod txn;

pub use instance::{CowInstance, ReadTxn, WriteTxn};

#[cfg(test)]
mod test {
    use super::*;
    use crate::callback::u64_comparator;

    #[test]
    fn write_commits_are_visible_to_new_read_transactions() {
        let instance: CowInstance<u64, &str> = CowInstance::new(u64_comparator());

        let mut wtxn = instance.wrtxn_begin();
        wtxn.insert(1, "one").unwrap();
        wtxn.insert(2, "two").unwrap();
        wtxn.wrtxn_commit().unwrap();

        let rtxn = instance.rotxn_begin();
        assert_eq!(rtxn.retrieve(&1).unwrap(), Some(&"one"));
        assert_eq!(rtxn.retrieve(&2).unwrap(), Some(&"two"));
        rtxn.verify().unwrap();
    }

    #[test]
    fn reader_pinned_before_commit_does_not_see_it() {
        let instance: CowInstance<u64, &str> = CowInstance::new(u64_comparator());

        let mut wtxn = instance.wrtxn_begin();
        wtxn.insert(1, "one").unwrap();
        wtxn.wrtxn_commit().unwrap();

        let rtxn = instance.rotxn_begin();
        assert_eq!(rtxn.retrieve(&1).unwrap(), Some(&"one"));

        let mut wtxn2 = instance.wrtxn_begin();
        wtxn2.insert(2, "two").unwrap();
        wtxn2.wrtxn_commit().unwrap();

        // rtxn was pinned before the second commit: it must not observe it.
        assert_eq!(rtxn.retrieve(&2).unwrap(), None);

        let rtxn2 = instance.rotxn_begin();
        assert_eq!(rtxn2.retrieve(&2).unwrap(), Some(&"two"));
    }

    #[test]
    fn aborted_write_is_never_visible() {
        let instance: CowInstance<u64, &str> = CowInstance::new(u64_comparator());
        let mut wtxn = instance.wrtxn_begin();
        wtxn.insert(1, "one").unwrap();
        wtxn.wrtxn_abort();

        let rtxn = instance.rotxn_begin();
        assert_eq!(rtxn.retrieve(&1).unwrap(), None);
    }

    #[test]
    fn old_versions_are_pruned_once_unreferenced() {
        let instance: CowInstance<u64, u64> = CowInstance::new(u64_comparator());
        for i in 0..50u64 {
            let mut wtxn = instance.wrtxn_begin();
            wtxn.insert(i, i).unwrap();
            wtxn.wrtxn_commit().unwrap();
        }
        // Nothing is pinning any historical snapshot, so only the active
        // version should remain reachable from the chain tail.
        assert_eq!(instance.retained_versions(), 1);
    }

    #[test]
    fn pinned_reader_keeps_its_version_reachable_until_closed() {
        let instance: CowInstance<u64, u64> = CowInstance::new(u64_comparator());
        let mut wtxn = instance.wrtxn_begin();
        wtxn.insert(1, 1).unwrap();
        wtxn.wrtxn_commit().unwrap();

        let rtxn = instance.rotxn_begin();
        for i in 2..20u64 {
            let mut wtxn = instance.wrtxn_begin();
            wtxn.insert(i, i).unwrap();
            wtxn.wrtxn_commit().unwrap();
        }
        assert!(instance.retained_versions() > 1);
        rtxn.rotxn_close();
        assert_eq!(instance.retained_versions(), 1);
    }

    #[test]
    fn delete_and_verify_large_tree() {
        let instance: CowInstance<u64, u64> = CowInstance::with_capacity(u64_comparator(), 4);
        let mut wtxn = instance.wrtxn_begin();
        for i in 0..500u64 {
            wtxn.insert(i, i * 10).unwrap();
        }
        wtxn.wrtxn_commit().unwrap();

        let mut wtxn = instance.wrtxn_begin();
        for i in 0..499u64 {
            assert_eq!(wtxn.delete(&i).unwrap(), crate::error::Presence::Present);
        }
        wtxn.wrtxn_commit().unwrap();

        let rtxn = instance.rotxn_begin();
        rtxn.verify().unwrap();
        assert_eq!(rtxn.retrieve(&499).unwrap(), Some(&4990));
        assert_eq!(rtxn.retrieve(&0).unwrap(), None);
    }
}
