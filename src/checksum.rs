//! Single-byte fold checksum
//!
//! The digest is the low byte of the two's-complement negation of the sum of
//! all byte values, reduced modulo 256. Addition is commutative, so any
//! permutation of the same bytes yields the same value and a collision is one
//! in 256 for unrelated content. It is a weak equality signal, used only by the
//! `--checksum` staleness policy, and must stay bit-for-bit as defined here.

use crate::error::{Result, SyncError};
use compio::io::AsyncReadAt;
use std::fmt;
use std::path::Path;

/// Read size for streaming a file through the accumulator
const CHUNK_SIZE: usize = 64 * 1024;

/// Fold checksum of some content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FoldChecksum(u8);

impl FoldChecksum {
    /// Fold an unbounded byte sum into the checksum byte
    #[must_use]
    pub const fn from_sum(sum: u64) -> Self {
        Self(((sum % 256) as u8).wrapping_neg())
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for FoldChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// Incremental byte-sum accumulator
///
/// The sum wraps at 2^64, which is a multiple of 256, so the folded result is
/// the same as with an unbounded accumulator.
#[derive(Debug, Default, Clone, Copy)]
pub struct FoldAccumulator {
    sum: u64,
}

impl FoldAccumulator {
    pub fn update(&mut self, data: &[u8]) {
        self.sum = data
            .iter()
            .fold(self.sum, |acc, &b| acc.wrapping_add(u64::from(b)));
    }

    #[must_use]
    pub const fn finish(self) -> FoldChecksum {
        FoldChecksum::from_sum(self.sum)
    }
}

/// Checksum of in-memory data
#[must_use]
pub fn fold_bytes(data: &[u8]) -> FoldChecksum {
    let mut acc = FoldAccumulator::default();
    acc.update(data);
    acc.finish()
}

/// Checksum of a file's full content
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a read fails.
pub async fn checksum(path: &Path) -> Result<FoldChecksum> {
    let file = compio::fs::File::open(path)
        .await
        .map_err(|e| SyncError::open("checksum", path, e))?;

    let mut acc = FoldAccumulator::default();
    let mut offset = 0u64;
    let mut buffer = Vec::with_capacity(CHUNK_SIZE);

    loop {
        buffer.clear();
        let buf_result = file.read_at(buffer, offset).await;
        let bytes_read = buf_result
            .0
            .map_err(|e| SyncError::io("checksum read", path, e))?;
        buffer = buf_result.1;

        if bytes_read == 0 {
            break;
        }
        acc.update(&buffer[..bytes_read]);
        offset += bytes_read as u64;
    }

    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(fold_bytes(b"").value(), 0x00);
        assert_eq!(fold_bytes(b"").to_string(), "00");
    }

    #[test]
    fn test_known_vectors() {
        // "hello" sums to 532; 532 % 256 = 20; -20 & 0xFF = 0xEC
        assert_eq!(fold_bytes(b"hello").value(), 0xEC);
        assert_eq!(fold_bytes(b"hello").to_string(), "EC");
        // a single 0x01 byte folds to 0xFF
        assert_eq!(fold_bytes(&[1]).value(), 0xFF);
        // multiples of 256 fold back to zero
        assert_eq!(fold_bytes(&[128, 128]).value(), 0x00);
    }

    #[test]
    fn test_order_insensitive() {
        assert_eq!(fold_bytes(b"ab"), fold_bytes(b"ba"));
        assert_eq!(fold_bytes(b"stressed"), fold_bytes(b"desserts"));
    }

    #[test]
    fn test_large_sum_matches_unbounded_arithmetic() {
        let data = vec![0xFFu8; 100_003];
        let expected = ((100_003u64 * 255) % 256) as u8;
        assert_eq!(fold_bytes(&data).value(), expected.wrapping_neg());
    }

    #[test]
    fn test_display_pads_single_digit() {
        assert_eq!(FoldChecksum::from_sum(256 - 0x0A).to_string(), "0A");
    }

    #[compio::test]
    async fn test_file_checksum_matches_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        let data: Vec<u8> = (0..(2 * CHUNK_SIZE + 5)).map(|i| (i * 7 % 256) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(checksum(&path).await.unwrap(), fold_bytes(&data));
    }

    #[compio::test]
    async fn test_file_checksum_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = checksum(&temp_dir.path().join("absent")).await.unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }
}
