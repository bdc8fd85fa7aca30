//! statx operations for nanosecond precision metadata
//!
//! This module provides statx operations using spawn_blocking for efficient
//! file metadata retrieval with nanosecond precision timestamps.
//!
//! # Operations
//!
//! - **statx**: Follows a final symlink and reports the pointed-to file
//! - **lstatx**: Reports the entry itself, even when it is a symlink
//!
//! # Usage
//!
//! ```rust,no_run
//! use compio_fs_extended::statx::{lstatx, statx};
//! use std::path::Path;
//!
//! # async fn example() -> compio_fs_extended::Result<()> {
//! let link = lstatx(Path::new("link")).await?;
//! assert!(link.is_symlink());
//!
//! let target = statx(Path::new("link")).await?;
//! println!("Size: {}, modified: {:?}", target.size, target.modified);
//! # Ok(())
//! # }
//! ```

use crate::error::{spawn_join_error, ExtendedError, Result};
use filetime::FileTime;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// File metadata with nanosecond precision timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatxMetadata {
    /// Full `st_mode`: file type bits and permission bits
    pub mode: u32,
    /// File size in bytes
    pub size: u64,
    /// Access time with nanosecond precision
    pub accessed: FileTime,
    /// Modification time with nanosecond precision
    pub modified: FileTime,
    /// Number of hard links
    pub nlink: u64,
    /// Device ID
    pub dev: u64,
    /// Inode number
    pub ino: u64,
}

impl StatxMetadata {
    /// File type bits (`S_IFMT` portion of the mode)
    #[must_use]
    pub const fn file_type(&self) -> u32 {
        self.mode & libc::S_IFMT
    }

    /// Permission bits including setuid, setgid and sticky
    #[must_use]
    pub const fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.file_type() == libc::S_IFREG
    }

    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.file_type() == libc::S_IFDIR
    }

    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.file_type() == libc::S_IFLNK
    }
}

/// Get file metadata using statx, following a final symlink
///
/// # Errors
///
/// This function will return an error if:
/// - The path (or the symlink's target) doesn't exist
/// - Permission is denied on a path component
/// - The path contains a NUL byte
pub async fn statx(path: &Path) -> Result<StatxMetadata> {
    statx_with_flags(path, 0).await
}

/// Get file metadata using statx without following a final symlink
///
/// # Errors
///
/// This function will return an error if:
/// - The path doesn't exist
/// - Permission is denied on a path component
/// - The path contains a NUL byte
pub async fn lstatx(path: &Path) -> Result<StatxMetadata> {
    statx_with_flags(path, libc::AT_SYMLINK_NOFOLLOW).await
}

async fn statx_with_flags(path: &Path, flags: libc::c_int) -> Result<StatxMetadata> {
    let path_cstr = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| ExtendedError::InvalidPath(format!("{}: {e}", path.display())))?;

    let buf = compio::runtime::spawn_blocking(move || {
        // SAFETY: path_cstr is NUL-terminated and outlives the call; statx
        // only writes into the zeroed buffer we own.
        unsafe {
            let mut statx_buf = std::mem::zeroed::<libc::statx>();
            let result = libc::statx(
                libc::AT_FDCWD,
                path_cstr.as_ptr(),
                flags,
                libc::STATX_BASIC_STATS,
                &mut statx_buf,
            );

            if result == 0 {
                Ok(statx_buf)
            } else {
                Err(std::io::Error::last_os_error())
            }
        }
    })
    .await
    .map_err(spawn_join_error)??;

    Ok(StatxMetadata {
        mode: u32::from(buf.stx_mode),
        size: buf.stx_size,
        accessed: FileTime::from_unix_time(buf.stx_atime.tv_sec, buf.stx_atime.tv_nsec),
        modified: FileTime::from_unix_time(buf.stx_mtime.tv_sec, buf.stx_mtime.tv_nsec),
        nlink: u64::from(buf.stx_nlink),
        dev: (u64::from(buf.stx_dev_major) << 32) | u64::from(buf.stx_dev_minor),
        ino: buf.stx_ino,
    })
}
