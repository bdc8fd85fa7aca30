//! Entry materialization
//!
//! Turns one destination path into a copy of one source entry, according to
//! the source's kind:
//!
//! - **symlink**: recreated with the literal target string, never resolved
//! - **hard-linked file** (link count > 1): linked to the source inode, so the
//!   destination shares the source's identity
//! - **regular file**: content copied with `copy_file_range(2)`, then
//!   permissions and timestamps mirrored
//!
//! Regular-file permissions are applied to the open destination before any
//! content is written, so an interrupted copy never leaves old permission bits
//! on new bytes.

use crate::error::{Result, SyncError};
use crate::probe::{probe, try_probe, EntryKind, EntryMetadata, Follow};
use compio::fs::{File, OpenOptions};
use compio_fs_extended::{
    chmod, copy_file_range_all, create_hardlink, create_symlink, fchmod, ftruncate,
    read_symlink, set_file_times, set_symlink_times,
};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tracing::debug;

/// What a successful [`sync_entry`] wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transferred {
    /// Regular file content, in bytes
    Content(u64),
    Symlink,
    Hardlink,
}

impl Transferred {
    /// Bytes of file content written
    #[must_use]
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Content(bytes) => bytes,
            Self::Symlink | Self::Hardlink => 0,
        }
    }
}

/// Create an empty regular file at `path` if nothing exists there
///
/// Existing entries of any kind, including dangling symlinks, are left exactly
/// as they are. Returns whether a file was created.
///
/// # Errors
///
/// Returns an error if the file cannot be created for a reason other than
/// already existing.
pub async fn ensure_placeholder(path: &Path) -> Result<bool> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(_file) => {
            debug!("created placeholder {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(SyncError::open("recv_generator", path, e)),
    }
}

/// Remove whatever non-directory entry sits at `path`
async fn remove_existing(path: &Path) -> Result<()> {
    match try_probe(path, Follow::No).await? {
        None => Ok(()),
        Some(meta) if meta.kind == EntryKind::Directory => Err(SyncError::DirectoryCollision {
            path: path.to_path_buf(),
        }),
        Some(_) => unlink(path).await,
    }
}

async fn unlink(path: &Path) -> Result<()> {
    match compio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::io("unlink", path, e)),
    }
}

/// Recreate the symlink at `source` as `destination`
///
/// The target is copied byte for byte; relative targets stay relative.
///
/// # Errors
///
/// Returns an error if the link cannot be read, the destination is a
/// directory, or the new link cannot be created.
pub async fn copy_symlink(source: &Path, destination: &Path) -> Result<()> {
    let target = read_symlink(source)
        .await
        .map_err(|e| SyncError::io("readlink", source, e))?;

    remove_existing(destination).await?;
    create_symlink(&target, destination)
        .await
        .map_err(|e| SyncError::io("symlink", destination, e))?;

    debug!("{} -> {}", destination.display(), target.display());
    Ok(())
}

/// Make `destination` another name for the inode of `source`
///
/// When the two paths live on different filesystems the content is copied
/// instead, with permissions and timestamps preserved.
///
/// # Errors
///
/// Returns an error if the destination is a directory, cannot be removed, or
/// the link (or fallback copy) fails.
pub async fn copy_hardlink(source: &Path, destination: &Path) -> Result<Transferred> {
    remove_existing(destination).await?;

    match create_hardlink(source, destination).await {
        Ok(()) => {
            debug!("hard linked {} => {}", destination.display(), source.display());
            Ok(Transferred::Hardlink)
        }
        Err(e) if e.raw_os_error() == Some(libc::EXDEV) => {
            debug!(
                "{} is on another filesystem, copying content instead of linking",
                destination.display()
            );
            let bytes = copy_regular(source, destination).await?;
            preserve_metadata(source, destination).await?;
            Ok(Transferred::Content(bytes))
        }
        Err(e) => Err(SyncError::io("link", destination, e)),
    }
}

/// Open the destination for writing, creating it if needed, without
/// truncating
///
/// A destination left read-only by an earlier sync is made owner-writable and
/// opened again; the caller restores the final mode right after.
async fn open_destination(destination: &Path, mode: u32) -> Result<File> {
    let options = {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        options
    };

    match options.open(destination).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            if chmod(destination, mode | 0o200).await.is_err() {
                return Err(SyncError::open("recv_generator", destination, e));
            }
            options
                .open(destination)
                .await
                .map_err(|e| SyncError::open("recv_generator", destination, e))
        }
        Err(e) => Err(SyncError::open("recv_generator", destination, e)),
    }
}

/// Get `destination` ready to receive content in place
///
/// Symlinks and special files are removed so writes never go through them. A
/// regular file with other names is unlinked so those names keep their content.
async fn prepare_regular_destination(destination: &Path) -> Result<()> {
    match try_probe(destination, Follow::No).await? {
        None => Ok(()),
        Some(meta) => match meta.kind {
            EntryKind::Directory => Err(SyncError::DirectoryCollision {
                path: destination.to_path_buf(),
            }),
            EntryKind::Regular if meta.nlink <= 1 => Ok(()),
            _ => unlink(destination).await,
        },
    }
}

/// Replace the content of `destination` with the content of `source`
///
/// Returns the number of bytes copied. Timestamps are not touched; see
/// [`preserve_metadata`].
///
/// # Errors
///
/// - [`SyncError::PermissionDenied`] if the source cannot be read or the
///   destination cannot be written
/// - [`SyncError::DirectoryCollision`] if the destination is a directory
/// - [`SyncError::Io`] if the transfer fails
pub async fn copy_regular(source: &Path, destination: &Path) -> Result<u64> {
    let src_file = File::open(source)
        .await
        .map_err(|e| SyncError::open("send_files", source, e))?;
    let src_meta = probe(source, Follow::Yes).await?;

    prepare_regular_destination(destination).await?;
    let dst_file = open_destination(destination, src_meta.mode).await?;
    let dst_fd = dst_file.as_raw_fd();

    fchmod(dst_fd, src_meta.mode)
        .await
        .map_err(|e| SyncError::io("chmod", destination, e))?;

    let copied = copy_file_range_all(src_file.as_raw_fd(), dst_fd)
        .await
        .map_err(|e| SyncError::io("write", destination, e))?;

    ftruncate(dst_fd, copied)
        .await
        .map_err(|e| SyncError::io("ftruncate", destination, e))?;

    debug!(
        "copied {} bytes {} => {}",
        copied,
        source.display(),
        destination.display()
    );
    Ok(copied)
}

/// Mirror the timestamps and permission bits of `source` onto `destination`
///
/// For a symlink source only the link's own timestamps are set; Linux cannot
/// change a symlink's permission bits.
///
/// # Errors
///
/// Returns an error if the source cannot be probed or an update fails.
pub async fn preserve_metadata(source: &Path, destination: &Path) -> Result<()> {
    let meta = probe(source, Follow::No).await?;
    apply_metadata(&meta, destination).await
}

async fn apply_metadata(meta: &EntryMetadata, destination: &Path) -> Result<()> {
    if meta.kind == EntryKind::Symlink {
        return set_symlink_times(destination, meta.accessed, meta.modified)
            .await
            .map_err(|e| SyncError::io("utimes", destination, e));
    }

    chmod(destination, meta.mode)
        .await
        .map_err(|e| SyncError::io("chmod", destination, e))?;
    set_file_times(destination, meta.accessed, meta.modified)
        .await
        .map_err(|e| SyncError::io("utimes", destination, e))
}

/// Materialize one non-directory source entry at `destination`
///
/// Dispatch, in order: symlink, hard-linked file (link count > 1), regular
/// file. The caller decides whether the entry is stale; this always writes.
///
/// # Errors
///
/// - [`SyncError::NotFound`] if the source vanished
/// - [`SyncError::NonRegularSource`] for FIFOs, sockets and device nodes
/// - any error of the selected copy operation
pub async fn sync_entry(source: &Path, destination: &Path) -> Result<Transferred> {
    let meta = probe(source, Follow::No).await?;

    match meta.kind {
        EntryKind::Symlink => {
            copy_symlink(source, destination).await?;
            preserve_metadata(source, destination).await?;
            Ok(Transferred::Symlink)
        }
        EntryKind::Regular if meta.nlink > 1 => copy_hardlink(source, destination).await,
        EntryKind::Regular => {
            let bytes = copy_regular(source, destination).await?;
            preserve_metadata(source, destination).await?;
            Ok(Transferred::Content(bytes))
        }
        EntryKind::Directory => Err(SyncError::io(
            "send_files",
            source,
            io::Error::from_raw_os_error(libc::EISDIR),
        )),
        EntryKind::Other => Err(SyncError::NonRegularSource {
            path: source.to_path_buf(),
        }),
        EntryKind::Missing => Err(SyncError::NotFound {
            path: source.to_path_buf(),
        }),
    }
}
