//! SipHash-1-3 keying for the auxiliary hash trie.
//!
//! The trie fans a key out into a sequence of 4-bit (16-way) slot indices
//! derived from this hash; SipHash-1-3 is a reduced-round variant, chosen
//! for throughput over DoS-resistance margin since this index is
//! in-memory and never exposed to untrusted network input.

use std::hash::Hasher;
use siphasher::sip::SipHasher13;

/// A fixed key pair so that hashing is deterministic across calls within
/// a process. The trie is an in-memory auxiliary index, not a hash table
/// exposed to untrusted input, so a process-wide fixed key (rather than a
/// randomized one) is appropriate.
const SIP_KEY0: u64 = 0x5344_5f48_5431_3333;
const SIP_KEY1: u64 = 0x6b65_795f_7472_6965;

pub(crate) fn siphash13(bytes: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(SIP_KEY0, SIP_KEY1);
    hasher.write(bytes);
    hasher.finish()
}

/// Splits a 64-bit hash into 16-way (4-bit) slot indices, most significant
/// nibble first, for use as successive levels of the hash trie.
pub(crate) fn nibbles(hash: u64) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 60 - (i as u32) * 4;
        *slot = ((hash >> shift) & 0xf) as u8;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deterministic_within_process() {
        assert_eq!(siphash13(b"hello"), siphash13(b"hello"));
    }

    #[test]
    fn distinct_inputs_usually_differ() {
        assert_ne!(siphash13(b"hello"), siphash13(b"world"));
    }

    #[test]
    fn nibbles_are_in_range() {
        for n in nibbles(siphash13(b"probe")) {
            assert!(n < 16);
        }
    }

    #[test]
    fn nibbles_reconstruct_the_hash() {
        let h = siphash13(b"reconstruct-me");
        let ns = nibbles(h);
        let mut rebuilt = 0u64;
        for n in ns {
            rebuilt = (rebuilt << 4) | n as u64;
        }
        assert_eq!(rebuilt, h);
    }
}
