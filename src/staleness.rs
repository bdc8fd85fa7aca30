//! Staleness decisions: does a destination need to be refreshed?
//!
//! One [`StalenessPolicy`] is chosen per run and applied to every top-level
//! file pair. The default "quick check" compares modification time and size
//! for exact equality, so sub-second truncation or clock skew between the two
//! sides always counts as a change. It is also fooled by content that changed
//! without touching either attribute; that is accepted behavior.

use crate::checksum::checksum;
use crate::error::Result;
use crate::probe::{EntryKind, EntryMetadata};
use std::path::Path;
use tracing::trace;

/// How file content is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    /// Equal modification time and size mean equal content
    #[default]
    ModTimeAndSize,
    /// Equal fold checksums mean equal content
    Checksum,
}

/// Rule deciding whether a destination entry is out of date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StalenessPolicy {
    pub comparison: Comparison,
    /// Leave the destination alone when it is newer than the source
    pub skip_if_destination_newer: bool,
}

impl StalenessPolicy {
    #[must_use]
    pub const fn new(comparison: Comparison, skip_if_destination_newer: bool) -> Self {
        Self {
            comparison,
            skip_if_destination_newer,
        }
    }

    /// Decide whether `destination` must be re-materialized from `source`
    ///
    /// Both metadata values must come from probes taken just before the call.
    /// A missing destination (`None`) always needs an update. Under the
    /// checksum comparison, a pair that is not two regular files is treated as
    /// changed rather than read.
    ///
    /// # Errors
    ///
    /// Returns an error if a checksum cannot be computed.
    pub async fn needs_update(
        &self,
        source: &Path,
        source_meta: &EntryMetadata,
        destination: &Path,
        destination_meta: Option<&EntryMetadata>,
    ) -> Result<bool> {
        let Some(dest_meta) = destination_meta else {
            return Ok(true);
        };

        if self.skip_if_destination_newer && dest_meta.modified > source_meta.modified {
            trace!("{} is newer than its source", destination.display());
            return Ok(false);
        }

        match self.comparison {
            Comparison::ModTimeAndSize => Ok(!quick_check_matches(source_meta, dest_meta)),
            Comparison::Checksum => {
                if source_meta.kind != EntryKind::Regular || dest_meta.kind != EntryKind::Regular {
                    return Ok(true);
                }
                let (src_sum, dst_sum) = (checksum(source).await?, checksum(destination).await?);
                trace!(
                    "checksum {} = {}, {} = {}",
                    source.display(),
                    src_sum,
                    destination.display(),
                    dst_sum
                );
                Ok(src_sum != dst_sum)
            }
        }
    }
}

/// Exact equality of modification time and size
#[must_use]
pub fn quick_check_matches(source: &EntryMetadata, destination: &EntryMetadata) -> bool {
    source.modified == destination.modified && source.size == destination.size
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::probe::{probe, Follow};
    use filetime::FileTime;
    use tempfile::TempDir;

    fn meta(size: u64, mtime_secs: i64, mtime_nanos: u32) -> EntryMetadata {
        let t = FileTime::from_unix_time(mtime_secs, mtime_nanos);
        EntryMetadata {
            kind: EntryKind::Regular,
            size,
            modified: t,
            accessed: t,
            mode: 0o644,
            nlink: 1,
            dev: 1,
            ino: 1,
        }
    }

    #[compio::test]
    async fn test_quick_check_equal_is_fresh() {
        let policy = StalenessPolicy::default();
        let m = meta(5, 1_000, 0);
        let stale = policy
            .needs_update(Path::new("a"), &m, Path::new("b"), Some(&m))
            .await
            .unwrap();
        assert!(!stale);
    }

    #[compio::test]
    async fn test_quick_check_subsecond_difference_is_stale() {
        let policy = StalenessPolicy::default();
        let stale = policy
            .needs_update(
                Path::new("a"),
                &meta(5, 1_000, 1),
                Path::new("b"),
                Some(&meta(5, 1_000, 0)),
            )
            .await
            .unwrap();
        assert!(stale);
    }

    #[compio::test]
    async fn test_quick_check_size_difference_is_stale() {
        let policy = StalenessPolicy::default();
        let stale = policy
            .needs_update(
                Path::new("a"),
                &meta(5, 1_000, 0),
                Path::new("b"),
                Some(&meta(6, 1_000, 0)),
            )
            .await
            .unwrap();
        assert!(stale);
    }

    #[compio::test]
    async fn test_missing_destination_is_stale() {
        for policy in [
            StalenessPolicy::default(),
            StalenessPolicy::new(Comparison::Checksum, true),
        ] {
            let stale = policy
                .needs_update(Path::new("a"), &meta(5, 1, 0), Path::new("b"), None)
                .await
                .unwrap();
            assert!(stale);
        }
    }

    #[compio::test]
    async fn test_newer_destination_wins_when_gated() {
        let src = meta(5, 1_000, 0);
        let dst = meta(9, 2_000, 0);

        let gated = StalenessPolicy::new(Comparison::ModTimeAndSize, true);
        assert!(!gated
            .needs_update(Path::new("a"), &src, Path::new("b"), Some(&dst))
            .await
            .unwrap());

        let ungated = StalenessPolicy::default();
        assert!(ungated
            .needs_update(Path::new("a"), &src, Path::new("b"), Some(&dst))
            .await
            .unwrap());

        // an older destination is still compared normally
        assert!(gated
            .needs_update(Path::new("b"), &dst, Path::new("a"), Some(&src))
            .await
            .unwrap());
    }

    #[compio::test]
    async fn test_checksum_policy_reads_content() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        let c = temp_dir.path().join("c");
        std::fs::write(&a, b"ab").unwrap();
        std::fs::write(&b, b"ba").unwrap(); // same fold checksum, different bytes
        std::fs::write(&c, b"abc").unwrap();

        let policy = StalenessPolicy::new(Comparison::Checksum, false);
        let ma = probe(&a, Follow::No).await.unwrap();
        let mb = probe(&b, Follow::No).await.unwrap();
        let mc = probe(&c, Follow::No).await.unwrap();

        assert!(!policy.needs_update(&a, &ma, &b, Some(&mb)).await.unwrap());
        assert!(policy.needs_update(&a, &ma, &c, Some(&mc)).await.unwrap());
    }

    #[compio::test]
    async fn test_same_file_is_fresh_under_both_comparisons() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        std::fs::write(&a, b"content").unwrap();
        let m = probe(&a, Follow::No).await.unwrap();

        for comparison in [Comparison::ModTimeAndSize, Comparison::Checksum] {
            let policy = StalenessPolicy::new(comparison, false);
            assert!(!policy.needs_update(&a, &m, &a, Some(&m)).await.unwrap());
        }
    }

    #[compio::test]
    async fn test_checksum_policy_non_regular_is_stale() {
        let policy = StalenessPolicy::new(Comparison::Checksum, false);
        let mut link = meta(5, 1_000, 0);
        link.kind = EntryKind::Symlink;
        let file = meta(5, 1_000, 0);

        assert!(policy
            .needs_update(Path::new("l"), &link, Path::new("f"), Some(&file))
            .await
            .unwrap());
    }
}
