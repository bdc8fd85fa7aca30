//! Error handling and types
//!
//! The `Display` output of every variant is the one-line diagnostic the CLI
//! prints for a failed entry, in the shapes rsync users already recognize:
//!
//! ```text
//! link_stat "/missing" failed: No such file or directory (2)
//! send_files failed to open "/secret": Permission denied (13)
//! ```

use std::ffi::CStr;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Synchronization and file operation errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// Source path does not exist
    #[error("link_stat \"{}\" failed: No such file or directory (2)", .path.display())]
    NotFound { path: PathBuf },

    /// Source unreadable or destination unwritable when opening it
    #[error(
        "{op} failed to open \"{}\": {} ({})",
        .path.display(),
        os_reason(.source),
        os_code(.source)
    )]
    PermissionDenied {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// Destination exists as neither a regular file nor a directory
    #[error("destination \"{}\" is neither a regular file nor a directory", .path.display())]
    UnsupportedDestinationKind { path: PathBuf },

    /// A non-directory would replace an existing destination directory
    #[error("could not make way for new non-directory: \"{}\" is a directory", .path.display())]
    DirectoryCollision { path: PathBuf },

    /// Source is a FIFO, socket or device node
    #[error("skipping non-regular file \"{}\"", .path.display())]
    NonRegularSource { path: PathBuf },

    /// Any other failed filesystem operation
    #[error(
        "{op} \"{}\" failed: {} ({})",
        .path.display(),
        os_reason(.source),
        os_code(.source)
    )]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Classify a failure to open `path`
    pub fn open(op: &'static str, path: &Path, err: impl Into<io::Error>) -> Self {
        let source = err.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                op,
                path: path.to_path_buf(),
                source,
            }
        } else {
            Self::Io {
                op,
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Wrap a failed operation on `path`
    pub fn io(op: &'static str, path: &Path, err: impl Into<io::Error>) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source: err.into(),
        }
    }
}

/// Raw errno of an I/O error, or 0 when it did not come from the OS
fn os_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(0)
}

/// C library description of the errno (no "(os error N)" suffix)
fn os_reason(err: &io::Error) -> String {
    match err.raw_os_error() {
        // SAFETY: strerror returns a pointer to a NUL-terminated string that
        // stays valid until the next strerror call on this thread; we copy it
        // out immediately.
        Some(code) => unsafe { CStr::from_ptr(libc::strerror(code)) }
            .to_string_lossy()
            .into_owned(),
        None => err.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
