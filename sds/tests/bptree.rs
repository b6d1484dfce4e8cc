//! Integration tests driving the plain B+tree only through its public
//! crate-level surface.

use pretty_assertions::assert_eq;

use sds::bptree::{compliment, difference, filter, intersect, union, Tree};
use sds::callback::{bytes_comparator, u64_comparator};
use sds::error::Presence;

/// Generates an insert/verify/search/delete sweep against a fresh `Tree`,
/// parameterized over the key type so the same sequence of operations
/// runs against both of the comparators Design Notes calls out by name.
macro_rules! test_bptree {
    ($suffix:ident, $key:ty, $make_key:expr, $comparator:expr) => {
        paste::paste! {
            #[test]
            fn [<insert_verify_search_delete_sweep_ $suffix>]() {
                let mut tree: Tree<$key, u64> = Tree::new($comparator);
                let make_key = $make_key;
                for i in 0u64..40 {
                    tree.insert(make_key(i), i).unwrap();
                    tree.verify().unwrap();
                }
                for i in 0u64..40 {
                    assert_eq!(tree.search(&make_key(i)).unwrap(), Presence::Present);
                    assert_eq!(tree.retrieve(&make_key(i)).unwrap(), Some(&i));
                }
                for i in (0u64..40).step_by(2) {
                    assert_eq!(tree.delete(&make_key(i)).unwrap(), Presence::Present);
                }
                tree.verify().unwrap();
                for i in (0u64..40).step_by(2) {
                    assert_eq!(tree.search(&make_key(i)).unwrap(), Presence::NotPresent);
                }
            }
        }
    };
}

test_bptree!(u64, u64, |i: u64| i, u64_comparator());
test_bptree!(bytes, Vec<u8>, |i: u64| i.to_be_bytes().to_vec(), bytes_comparator());

#[test]
fn nine_key_insert_verify_map_delete_retrieve_sequence() {
    let mut tree: Tree<u64, u64> = Tree::new(u64_comparator());
    let keys = [5u64, 3, 8, 1, 4, 7, 9, 2, 6];

    for &k in &keys {
        tree.insert(k, k * 100).unwrap();
        tree.verify().unwrap();
    }

    assert_eq!(tree.search(&5).unwrap(), Presence::Present);
    assert_eq!(tree.search(&42).unwrap(), Presence::NotPresent);

    let mut seen = Vec::new();
    tree.map(|k, v| seen.push((*k, *v))).unwrap();
    assert_eq!(seen, vec![(1, 100), (2, 200), (3, 300), (4, 400), (5, 500), (6, 600), (7, 700), (8, 800), (9, 900)]);

    for &k in &[3u64, 7, 1] {
        assert_eq!(tree.delete(&k).unwrap(), Presence::Present);
        tree.verify().unwrap();
    }
    assert_eq!(tree.retrieve(&3).unwrap(), None);
    assert_eq!(tree.retrieve(&8).unwrap(), Some(&800));
}

#[test]
fn bulk_load_then_insert_then_search() {
    let mut tree: Tree<u64, u64> = Tree::new(u64_comparator());
    let items: Vec<(u64, u64)> = (0..200u64).map(|i| (i, i * i)).collect();
    tree.bulk_load(items).unwrap();
    tree.verify().unwrap();

    tree.insert(1000, 999).unwrap();
    tree.verify().unwrap();

    assert_eq!(tree.retrieve(&150).unwrap(), Some(&22500));
    assert_eq!(tree.retrieve(&1000).unwrap(), Some(&999));
    assert_eq!(tree.search(&90909).unwrap(), Presence::NotPresent);
}

fn tree_of(comparator: &sds::callback::Comparator<u64>, pairs: &[(u64, u64)]) -> Tree<u64, u64> {
    let mut t = Tree::new(comparator.clone());
    for &(k, v) in pairs {
        t.insert(k, v).unwrap();
    }
    t
}

fn keys_of(tree: &Tree<u64, u64>) -> Vec<u64> {
    let mut out = Vec::new();
    tree.map(|k, _| out.push(*k)).unwrap();
    out
}

#[test]
fn whole_tree_set_operations_agree_with_plain_set_arithmetic() {
    let comparator = u64_comparator();
    let a = tree_of(&comparator, &[(1, 1), (2, 2), (3, 3), (4, 4)]);
    let b = tree_of(&comparator, &[(3, 30), (4, 40), (5, 50)]);

    assert_eq!(keys_of(&union(&a, &b).unwrap()), vec![1, 2, 3, 4, 5]);
    assert_eq!(keys_of(&intersect(&a, &b).unwrap()), vec![3, 4]);
    assert_eq!(keys_of(&difference(&a, &b).unwrap()), vec![1, 2]);
    assert_eq!(keys_of(&compliment(&a, &b).unwrap()), vec![5]);
    assert_eq!(keys_of(&filter(&a, |_, v| *v % 2 == 0).unwrap()), vec![2, 4]);
}

#[test]
fn incompatible_comparators_are_rejected() {
    let a: Tree<u64, u64> = Tree::new(u64_comparator());
    let b: Tree<u64, u64> = Tree::new(u64_comparator());
    assert!(union(&a, &b).is_err());
}

#[test]
fn random_insert_delete_sequence_matches_a_btreemap_model() {
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    #[derive(Debug)]
    enum Op {
        Insert,
        Delete,
        Search,
    }

    impl rand::distributions::Distribution<Op> for rand::distributions::Standard {
        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Op {
            match rng.gen_range(0..=2) {
                0 => Op::Insert,
                1 => Op::Delete,
                2 => Op::Search,
                _ => unreachable!(),
            }
        }
    }

    const NUM_OPS: u64 = 2000;
    let seed: u64 = rand::thread_rng().gen();
    println!("random_insert_delete_sequence_matches_a_btreemap_model seed = {seed}");
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut tree: Tree<u64, u64> = Tree::with_capacity(u64_comparator(), 4);
    let mut model: BTreeMap<u64, u64> = BTreeMap::new();

    for _ in 0..NUM_OPS {
        let key = rng.gen_range(0..200u64);
        match rng.gen::<Op>() {
            Op::Insert => {
                let result = tree.insert(key, key);
                assert_eq!(result.is_ok(), !model.contains_key(&key));
                model.insert(key, key);
            }
            Op::Delete => {
                let present = model.remove(&key).is_some();
                let expect = if present { Presence::Present } else { Presence::NotPresent };
                assert_eq!(tree.delete(&key).unwrap(), expect);
            }
            Op::Search => {
                let expect = if model.contains_key(&key) { Presence::Present } else { Presence::NotPresent };
                assert_eq!(tree.search(&key).unwrap(), expect);
            }
        }
    }

    tree.verify().unwrap();
    let mut seen = Vec::new();
    tree.map(|k, v| seen.push((*k, *v))).unwrap();
    let expected: Vec<(u64, u64)> = model.into_iter().collect();
    assert_eq!(seen, expected);
}
