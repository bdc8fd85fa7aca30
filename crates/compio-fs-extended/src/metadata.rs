//! File metadata updates: permissions, truncation and timestamps
//!
//! Calls run in a blocking closure scheduled via the compio runtime, since
//! native io_uring opcodes for chmod/ftruncate/utimensat are not available.
//!
//! # Operations
//!
//! - **fchmod**: Change permissions of an open file descriptor
//! - **chmod**: Change permissions by path (follows symlinks)
//! - **ftruncate**: Set the length of an open file descriptor
//! - **set_file_times**: Set access and modification times (follows symlinks)
//! - **set_symlink_times**: Set access and modification times of a symlink itself

use crate::error::{spawn_join_error, Result};
use filetime::FileTime;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::RawFd;
use std::path::Path;

/// Change file permissions using a file descriptor
///
/// # Errors
///
/// This function will return an error if:
/// - Invalid file descriptor
/// - The caller does not own the file
pub async fn fchmod(fd: RawFd, mode: u32) -> Result<()> {
    compio::runtime::spawn_blocking(move || {
        // SAFETY: fchmod only reads its integer arguments.
        if unsafe { libc::fchmod(fd, mode as libc::mode_t) } == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    })
    .await
    .map_err(spawn_join_error)??;
    Ok(())
}

/// Change file permissions by path
///
/// # Errors
///
/// This function will return an error if:
/// - The file doesn't exist
/// - The caller does not own the file
pub async fn chmod(path: &Path, mode: u32) -> Result<()> {
    let path = path.to_path_buf();
    compio::runtime::spawn_blocking(move || {
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
    })
    .await
    .map_err(spawn_join_error)??;
    Ok(())
}

/// Truncate or extend an open file to `len` bytes
///
/// # Errors
///
/// This function will return an error if:
/// - Invalid file descriptor or not opened for writing
/// - `len` does not fit in `off_t`
pub async fn ftruncate(fd: RawFd, len: u64) -> Result<()> {
    let len = libc::off_t::try_from(len).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "length exceeds off_t")
    })?;
    compio::runtime::spawn_blocking(move || {
        // SAFETY: ftruncate only reads its integer arguments.
        if unsafe { libc::ftruncate(fd, len) } == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    })
    .await
    .map_err(spawn_join_error)??;
    Ok(())
}

/// Change file timestamps, following a final symlink
///
/// # Errors
///
/// This function will return an error if:
/// - The file doesn't exist
/// - Permission is denied
pub async fn set_file_times(path: &Path, accessed: FileTime, modified: FileTime) -> Result<()> {
    let path = path.to_path_buf();
    compio::runtime::spawn_blocking(move || filetime::set_file_times(&path, accessed, modified))
        .await
        .map_err(spawn_join_error)??;
    Ok(())
}

/// Change the timestamps of a symlink itself (`utimensat` with `AT_SYMLINK_NOFOLLOW`)
///
/// # Errors
///
/// This function will return an error if:
/// - The link doesn't exist
/// - Permission is denied
pub async fn set_symlink_times(path: &Path, accessed: FileTime, modified: FileTime) -> Result<()> {
    let path = path.to_path_buf();
    compio::runtime::spawn_blocking(move || {
        filetime::set_symlink_file_times(&path, accessed, modified)
    })
    .await
    .map_err(spawn_join_error)??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use tempfile::TempDir;

    #[compio::test]
    async fn test_fchmod_and_ftruncate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        std::fs::write(&path, b"0123456789").unwrap();

        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        fchmod(file.as_raw_fd(), 0o600).await.unwrap();
        ftruncate(file.as_raw_fd(), 4).await.unwrap();
        drop(file);

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o7777, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123");
    }

    #[compio::test]
    async fn test_set_file_times() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        std::fs::write(&path, b"x").unwrap();

        let atime = FileTime::from_unix_time(1_000_000_000, 123);
        let mtime = FileTime::from_unix_time(1_100_000_000, 456_789);
        set_file_times(&path, atime, mtime).await.unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
        assert_eq!(FileTime::from_last_access_time(&meta), atime);
    }

    #[compio::test]
    async fn test_set_symlink_times_leaves_target_alone() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        let link = temp_dir.path().join("link");
        std::fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink("target", &link).unwrap();
        let before = FileTime::from_last_modification_time(&std::fs::metadata(&target).unwrap());

        let stamp = FileTime::from_unix_time(1_200_000_000, 0);
        set_symlink_times(&link, stamp, stamp).await.unwrap();

        let link_meta = std::fs::symlink_metadata(&link).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&link_meta), stamp);
        let after = FileTime::from_last_modification_time(&std::fs::metadata(&target).unwrap());
        assert_eq!(before, after);
    }

    #[compio::test]
    async fn test_chmod_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        std::fs::write(&path, b"x").unwrap();

        chmod(&path, 0o751).await.unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o7777, 0o751);
    }
}
