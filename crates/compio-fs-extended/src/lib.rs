//! # compio-fs-extended
//!
//! Extended filesystem operations for compio with support for:
//! - `statx` probing with and without following the final symlink
//! - `copy_file_range` whole-file transfers with a user-space fallback
//! - Symlink operations (read the literal target, create)
//! - Hardlink creation
//! - Permission, truncation and timestamp updates (including on symlinks)
//! - Directory listing
//!
//! Each operation runs its blocking syscall through
//! `compio::runtime::spawn_blocking`, since io_uring has no opcodes for most of
//! them and the rest are not exposed by compio.
//!
//! ## Example
//!
//! ```rust,no_run
//! use compio_fs_extended::{copy_file_range_all, fchmod, lstatx};
//! use compio::fs::{File, OpenOptions};
//! use std::os::unix::io::AsRawFd;
//! use std::path::Path;
//!
//! # async fn example() -> compio_fs_extended::Result<()> {
//! let meta = lstatx(Path::new("source.txt")).await?;
//! let src = File::open("source.txt").await?;
//! let dst = OpenOptions::new().write(true).create(true).open("destination.txt").await?;
//!
//! fchmod(dst.as_raw_fd(), meta.permissions()).await?;
//! let copied = copy_file_range_all(src.as_raw_fd(), dst.as_raw_fd()).await?;
//! println!("Copied {} bytes", copied);
//! # Ok(())
//! # }
//! ```

pub mod copy;
pub mod directory;
pub mod error;
pub mod hardlink;
pub mod metadata;
pub mod statx;
pub mod symlink;

// Re-export main types
pub use error::{ExtendedError, Result};

// Re-export specific operations
pub use copy::copy_file_range_all;
pub use directory::read_dir_names;
pub use hardlink::create_hardlink;
pub use metadata::{chmod, fchmod, ftruncate, set_file_times, set_symlink_times};
pub use statx::{lstatx, statx, StatxMetadata};
pub use symlink::{create_symlink, read_symlink};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
