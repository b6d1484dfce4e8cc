//! CRC32C debug checksums over node contents.
//!
//! Only compiled in behind the `checksum` feature: it exists solely for
//! bug triage during verify, not for correctness, so it's kept off the
//! hot insert/delete path by default.

#[cfg(feature = "checksum")]
pub(crate) fn checksum_bytes(bytes: &[u8]) -> u32 {
    crc32c::crc32c(bytes)
}

#[cfg(test)]
#[cfg(feature = "checksum")]
mod test {
    use super::*;

    #[test]
    fn same_bytes_checksum_equal() {
        let a = checksum_bytes(b"sds");
        let b = checksum_bytes(b"sds");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_checksum_differ() {
        assert_ne!(checksum_bytes(b"sds"), checksum_bytes(b"sdt"));
    }
}
