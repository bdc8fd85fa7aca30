//! resync: local one-way file synchronization
//!
//! Mirrors source files and directory trees into a destination, deciding per
//! entry whether the destination is stale and rewriting it with
//! `copy_file_range` while preserving permissions, timestamps, symlinks and
//! hard links. Everything runs on the compio async runtime.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod copy;
pub mod directory;
pub mod error;
pub mod probe;
pub mod progress;
pub mod staleness;
pub mod sync;

// Re-export commonly used types
pub use checksum::{checksum, fold_bytes, FoldChecksum};
pub use config::SyncConfig;
pub use copy::{ensure_placeholder, sync_entry, Transferred};
pub use directory::sync_tree;
pub use error::{Result, SyncError};
pub use probe::{probe, EntryKind, EntryMetadata, Follow};
pub use progress::ProgressTracker;
pub use staleness::{Comparison, StalenessPolicy};
pub use sync::{sync_paths, EntryOutcome, SyncContext, SyncOutcome, SyncReport, SyncStats};
