//! `sds` is a small toolbox of concurrent data structures for servers
//! that need to share state across threads without a global lock:
//! a copy-on-write, MVCC B+tree (readers pin a snapshot and never block
//! a writer), a plain mutable B+tree it's layered on top of, a
//! lock-free MPMC queue, and an auxiliary hash trie.
//!
//! ## Getting started
//!
//! ```rust
//! use sds::bptree::Tree;
//! use sds::callback::u64_comparator;
//!
//! let mut tree: Tree<u64, &str> = Tree::new(u64_comparator());
//! tree.insert(1, "one").unwrap();
//! tree.insert(2, "two").unwrap();
//! assert_eq!(tree.retrieve(&1).unwrap(), Some(&"one"));
//! tree.verify().unwrap();
//! ```

pub mod bptree;
pub mod callback;
pub mod cow;
pub mod error;
pub mod queue;
pub mod trie;

mod alloc;
#[cfg(feature = "checksum")]
mod checksum;
mod siphash;

pub use error::{CResult, Error, Presence};
