//! Filesystem metadata probing
//!
//! Every comparison reads metadata fresh from the filesystem; nothing here is
//! cached, since entries can change between two probes of the same run.
//!
//! Two flavors exist, mirroring `lstat(2)` and `stat(2)`:
//!
//! - [`Follow::No`] describes the entry itself, so a symlink reports as
//!   [`EntryKind::Symlink`] with the link's own timestamps.
//! - [`Follow::Yes`] describes whatever the final symlink points at.

use crate::error::{Result, SyncError};
use compio_fs_extended::{lstatx, statx, StatxMetadata};
use filetime::FileTime;
use std::fmt;
use std::path::Path;

/// Whether a probe follows a final symlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Follow {
    /// `stat` semantics
    Yes,
    /// `lstat` semantics
    No,
}

/// Filesystem category of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Regular,
    Directory,
    Symlink,
    /// FIFO, socket or device node
    Other,
    Missing,
}

impl EntryKind {
    fn from_statx(meta: &StatxMetadata) -> Self {
        if meta.is_file() {
            Self::Regular
        } else if meta.is_dir() {
            Self::Directory
        } else if meta.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regular => "regular file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "special file",
            Self::Missing => "missing",
        })
    }
}

/// Metadata of one entry, as read by a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub kind: EntryKind,
    /// Size in bytes (a symlink's size is the length of its target)
    pub size: u64,
    pub modified: FileTime,
    pub accessed: FileTime,
    /// Permission bits, including setuid, setgid and sticky
    pub mode: u32,
    /// Hard link count
    pub nlink: u64,
    pub dev: u64,
    pub ino: u64,
}

impl EntryMetadata {
    /// Whether both probes describe the same inode
    #[must_use]
    pub fn same_file(&self, other: &Self) -> bool {
        self.dev == other.dev && self.ino == other.ino
    }
}

impl From<StatxMetadata> for EntryMetadata {
    fn from(meta: StatxMetadata) -> Self {
        Self {
            kind: EntryKind::from_statx(&meta),
            size: meta.size,
            modified: meta.modified,
            accessed: meta.accessed,
            mode: meta.permissions(),
            nlink: meta.nlink,
            dev: meta.dev,
            ino: meta.ino,
        }
    }
}

/// Read metadata for `path`
///
/// # Errors
///
/// - [`SyncError::NotFound`] if nothing exists at `path` (or, with
///   [`Follow::Yes`], the symlink dangles)
/// - [`SyncError::Io`] for any other probe failure
pub async fn probe(path: &Path, follow: Follow) -> Result<EntryMetadata> {
    try_probe(path, follow)
        .await?
        .ok_or_else(|| SyncError::NotFound {
            path: path.to_path_buf(),
        })
}

/// Read metadata for `path`, returning `None` when it does not exist
///
/// # Errors
///
/// Returns [`SyncError::Io`] for failures other than absence (for example
/// permission denied on a parent directory).
pub async fn try_probe(path: &Path, follow: Follow) -> Result<Option<EntryMetadata>> {
    let result = match follow {
        Follow::Yes => statx(path).await,
        Follow::No => lstatx(path).await,
    };

    match result {
        Ok(meta) => Ok(Some(meta.into())),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => {
            let op = match follow {
                Follow::Yes => "stat",
                Follow::No => "link_stat",
            };
            Err(SyncError::io(op, path, e))
        }
    }
}

/// Kind of `path`, [`EntryKind::Missing`] when absent
///
/// # Errors
///
/// Returns [`SyncError::Io`] for failures other than absence.
pub async fn probe_kind(path: &Path, follow: Follow) -> Result<EntryKind> {
    Ok(try_probe(path, follow)
        .await?
        .map_or(EntryKind::Missing, |meta| meta.kind))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[compio::test]
    async fn test_probe_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o604)).unwrap();

        let meta = probe(&path, Follow::No).await.unwrap();
        assert_eq!(meta.kind, EntryKind::Regular);
        assert_eq!(meta.size, 5);
        assert_eq!(meta.mode, 0o604);
        assert_eq!(meta.nlink, 1);
        assert!(meta.same_file(&probe(&path, Follow::Yes).await.unwrap()));
    }

    #[compio::test]
    async fn test_probe_distinguishes_symlink_from_target() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("dir")).unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink("dir", &link).unwrap();

        assert_eq!(probe_kind(&link, Follow::No).await.unwrap(), EntryKind::Symlink);
        assert_eq!(probe_kind(&link, Follow::Yes).await.unwrap(), EntryKind::Directory);
    }

    #[compio::test]
    async fn test_probe_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope");

        let err = probe(&path, Follow::No).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
        assert_eq!(probe_kind(&path, Follow::No).await.unwrap(), EntryKind::Missing);
        // a path below a regular file is absent too (ENOTDIR)
        std::fs::write(&path, b"").unwrap();
        assert_eq!(
            probe_kind(&path.join("child"), Follow::No).await.unwrap(),
            EntryKind::Missing
        );
    }

    #[compio::test]
    async fn test_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("dangling");
        std::os::unix::fs::symlink("nowhere", &link).unwrap();

        assert_eq!(probe_kind(&link, Follow::No).await.unwrap(), EntryKind::Symlink);
        assert_eq!(probe_kind(&link, Follow::Yes).await.unwrap(), EntryKind::Missing);
    }

    #[cfg(unix)]
    #[compio::test]
    async fn test_fifo_is_other() {
        let temp_dir = TempDir::new().unwrap();
        let fifo = temp_dir.path().join("fifo");
        let c_path = std::ffi::CString::new(fifo.to_str().unwrap()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);

        assert_eq!(probe_kind(&fifo, Follow::No).await.unwrap(), EntryKind::Other);
    }
}
