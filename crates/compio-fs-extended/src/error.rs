//! Error types for compio-fs-extended operations

use thiserror::Error;

/// Result type for compio-fs-extended operations
pub type Result<T> = std::result::Result<T, ExtendedError>;

/// Extended error types for filesystem operations
#[derive(Error, Debug)]
pub enum ExtendedError {
    /// Standard I/O error, carrying the original errno
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path could not be handed to a syscall (interior NUL byte)
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The blocking task running the syscall panicked or was cancelled
    #[error("blocking task failed: {0}")]
    SpawnJoin(String),
}

impl ExtendedError {
    /// Raw OS error code, if the failure came from a syscall
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// Check if error is "no such file or directory" (or a non-directory path prefix)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.raw_os_error(), Some(libc::ENOENT | libc::ENOTDIR))
    }
}

impl From<ExtendedError> for std::io::Error {
    fn from(err: ExtendedError) -> Self {
        match err {
            ExtendedError::Io(e) => e,
            ExtendedError::InvalidPath(msg) => {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, msg)
            }
            ExtendedError::SpawnJoin(msg) => std::io::Error::other(msg),
        }
    }
}

/// Helper for mapping a failed `spawn_blocking` join into an `ExtendedError`
pub(crate) fn spawn_join_error<E: std::fmt::Debug>(err: E) -> ExtendedError {
    ExtendedError::SpawnJoin(format!("{err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = ExtendedError::from(std::io::Error::from_raw_os_error(libc::ENOENT));
        assert!(err.is_not_found());
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));

        let err = ExtendedError::from(std::io::Error::from_raw_os_error(libc::EACCES));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_into_io_error_keeps_errno() {
        let err = ExtendedError::from(std::io::Error::from_raw_os_error(libc::EXDEV));
        let io: std::io::Error = err.into();
        assert_eq!(io.raw_os_error(), Some(libc::EXDEV));

        let io: std::io::Error = ExtendedError::InvalidPath("a\0b".into()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
    }
}
