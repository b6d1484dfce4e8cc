//! The plain, single-writer B+tree: one mutator at a time, no isolation
//! or versioning. [`crate::cow`] layers transactional copy-on-write
//! semantics on top of the same node shape.

mod node;
mod setops;
mod tree;

pub use node::NodeId;
pub use setops::{compliment, difference, filter, intersect, union};
pub use tree::{InstanceFlags, Status, Tree, DEFAULT_CAPACITY};
