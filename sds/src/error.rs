//! The single result-code surface of this crate.
//!
//! Every public operation returns a [`CResult`]. A lookup's two possible
//! successful outcomes -- [`Presence::Present`] and
//! [`Presence::NotPresent`] -- are a separate, non-error enum; callers
//! must branch on them explicitly rather than treating "not present" as
//! a failure.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type CResult<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unexpected internal error; carries a human-readable cause.
    Internal(String),

    /// A required pointer/handle was null (e.g. a transaction used after close).
    NullPointer,

    /// Insert rejected: the key is already present.
    DuplicateKey,

    /// A node's stored checksum did not match its recomputed checksum.
    ChecksumFailure,

    /// Verify-time: a node id referenced by a parent does not resolve.
    InvalidNodeId,

    /// Verify-time: a key violates an ordering or uniqueness invariant.
    InvalidKey,

    /// Verify-time: a value's recorded size does not match its payload.
    InvalidValueSize,

    /// Verify-time: an internal pointer (child/sibling/parent) is dangling.
    InvalidPointer,

    /// Verify-time: a node's item_count or child_count is out of range.
    InvalidNode,

    /// Verify-time: keys within a node are not strictly ascending.
    InvalidKeyOrder,

    /// A set operation was attempted on instances with incompatible comparators.
    IncompatibleInstance,

    /// The queue (or a scan) has no more elements.
    ListExhausted,

    /// A write operation was attempted against a read-only transaction, or
    /// the transaction is not in a valid state for the requested operation.
    InvalidTxn,

    /// Reserved for test harnesses.
    TestFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
            Error::NullPointer => write!(f, "null pointer"),
            Error::DuplicateKey => write!(f, "duplicate key"),
            Error::ChecksumFailure => write!(f, "checksum failure"),
            Error::InvalidNodeId => write!(f, "invalid node id"),
            Error::InvalidKey => write!(f, "invalid key"),
            Error::InvalidValueSize => write!(f, "invalid value size"),
            Error::InvalidPointer => write!(f, "invalid pointer"),
            Error::InvalidNode => write!(f, "invalid node"),
            Error::InvalidKeyOrder => write!(f, "invalid key order"),
            Error::IncompatibleInstance => write!(f, "incompatible instance"),
            Error::ListExhausted => write!(f, "list exhausted"),
            Error::InvalidTxn => write!(f, "invalid transaction"),
            Error::TestFailed => write!(f, "test failed"),
        }
    }
}

impl std::error::Error for Error {}

/// The two successful outcomes of a lookup (`search`/`delete`). Both are
/// `Ok` -- never conflate a [`Presence::NotPresent`] with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    NotPresent,
}

impl Presence {
    pub fn is_present(self) -> bool {
        matches!(self, Presence::Present)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_non_empty_for_every_variant() {
        let variants = [
            Error::Internal("x".into()),
            Error::NullPointer,
            Error::DuplicateKey,
            Error::ChecksumFailure,
            Error::InvalidNodeId,
            Error::InvalidKey,
            Error::InvalidValueSize,
            Error::InvalidPointer,
            Error::InvalidNode,
            Error::InvalidKeyOrder,
            Error::IncompatibleInstance,
            Error::ListExhausted,
            Error::InvalidTxn,
            Error::TestFailed,
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
