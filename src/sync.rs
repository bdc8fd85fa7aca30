//! Main synchronization logic
//!
//! The orchestrator classifies each top-level source and the destination by
//! entry kind and dispatches:
//!
//! | source    | destination         | action                                        |
//! |-----------|---------------------|-----------------------------------------------|
//! | file      | missing             | placeholder, then materialize                 |
//! | file      | file                | materialize only if the staleness policy says |
//! | file      | directory           | placeholder and materialize `dest/name`       |
//! | file      | other               | fail: destination unusable                    |
//! | directory | missing             | create `dest`, walk the tree into it          |
//! | directory | directory or file   | walk the tree into `dest/name`                |
//! | missing   | anything            | fail: source does not exist                   |
//!
//! "File" covers regular files and symlinks. A destination symlink is
//! followed at the top level, so a link to a directory counts as a directory.
//!
//! Failures never escape as `Err`: each one becomes a
//! [`SyncOutcome::Failed`] entry in the [`SyncReport`], and every source is
//! attempted regardless of how earlier ones went.
//!
//! # Usage
//!
//! ```rust,no_run
//! use resync::{sync_paths, SyncConfig};
//! use std::path::{Path, PathBuf};
//!
//! #[compio::main]
//! async fn main() -> resync::Result<()> {
//!     let config = SyncConfig::default();
//!     let report = sync_paths(&config, &[PathBuf::from("src")], Path::new("dst")).await?;
//!     for failure in report.failures() {
//!         if let Some(err) = failure.outcome.error() {
//!             eprintln!("{err}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::config::SyncConfig;
use crate::copy::{ensure_placeholder, sync_entry, Transferred};
use crate::directory::{ensure_directory, sync_tree};
use crate::error::{Result, SyncError};
use crate::probe::{probe, try_probe, EntryKind, EntryMetadata, Follow};
use crate::progress::ProgressTracker;
use compio_sync::Semaphore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of syncing one entry
#[derive(Debug)]
pub enum SyncOutcome {
    /// Destination was already fresh
    Skipped,
    /// An existing destination was rewritten
    Updated,
    /// The destination did not exist before
    Created,
    Failed(SyncError),
}

impl SyncOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub const fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Outcome for one source/destination pair
#[derive(Debug)]
pub struct EntryOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Kind of the source entry ([`EntryKind::Missing`] if it could not be probed)
    pub kind: EntryKind,
    pub outcome: SyncOutcome,
    /// File content bytes written
    pub bytes: u64,
}

impl EntryOutcome {
    #[must_use]
    pub fn new(source: &Path, destination: &Path, kind: EntryKind, outcome: SyncOutcome) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            kind,
            outcome,
            bytes: 0,
        }
    }

    #[must_use]
    pub fn failed(source: &Path, destination: &Path, kind: EntryKind, err: SyncError) -> Self {
        Self::new(source, destination, kind, SyncOutcome::Failed(err))
    }

    /// Outcome of a materialization, created or rewritten
    #[must_use]
    pub fn transferred(
        source: &Path,
        destination: &Path,
        kind: EntryKind,
        created: bool,
        transferred: Transferred,
    ) -> Self {
        let outcome = if created {
            SyncOutcome::Created
        } else {
            SyncOutcome::Updated
        };
        Self {
            bytes: transferred.bytes(),
            ..Self::new(source, destination, kind, outcome)
        }
    }
}

/// Statistics for a synchronization operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Non-directory entries that did not exist before
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub directories_created: u64,
    /// Total file content bytes written
    pub bytes_copied: u64,
    pub duration: Duration,
}

/// Every outcome of a run, in completion order
#[derive(Debug, Default)]
pub struct SyncReport {
    pub entries: Vec<EntryOutcome>,
    pub duration: Duration,
}

impl SyncReport {
    #[must_use]
    pub fn single(entry: EntryOutcome) -> Self {
        Self {
            entries: vec![entry],
            duration: Duration::ZERO,
        }
    }

    pub fn push(&mut self, entry: EntryOutcome) {
        self.entries.push(entry);
    }

    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| e.outcome.is_failed())
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Outcome recorded for `destination`, if any
    #[must_use]
    pub fn find(&self, destination: &Path) -> Option<&EntryOutcome> {
        self.entries.iter().find(|e| e.destination == destination)
    }

    #[must_use]
    pub fn stats(&self) -> SyncStats {
        let mut stats = SyncStats {
            duration: self.duration,
            ..SyncStats::default()
        };
        for entry in &self.entries {
            stats.bytes_copied += entry.bytes;
            match (&entry.outcome, entry.kind) {
                (SyncOutcome::Failed(_), _) => stats.failed += 1,
                (SyncOutcome::Skipped, _) => stats.skipped += 1,
                (SyncOutcome::Created, EntryKind::Directory) => stats.directories_created += 1,
                (SyncOutcome::Created, _) => stats.created += 1,
                (SyncOutcome::Updated, _) => stats.updated += 1,
            }
        }
        stats
    }
}

/// State shared by every entry of one run
pub struct SyncContext {
    pub config: SyncConfig,
    semaphore: Semaphore,
    progress: Option<ProgressTracker>,
    /// `(dev, ino)` of every top-level directory target of this run
    targets: Mutex<HashSet<(u64, u64)>>,
}

impl SyncContext {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if the configuration is out of bounds.
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let progress = config.progress.then(ProgressTracker::new);
        Ok(Self {
            semaphore: Semaphore::new(config.max_files_in_flight),
            config,
            progress,
            targets: Mutex::new(HashSet::new()),
        })
    }

    /// Permit pool bounding concurrent materializations
    #[must_use]
    pub const fn semaphore(&self) -> &Semaphore {
        &self.semaphore
    }

    /// Remember a directory the run writes into
    pub(crate) fn claim_target(&self, meta: &EntryMetadata) {
        if let Ok(mut targets) = self.targets.lock() {
            targets.insert((meta.dev, meta.ino));
        }
    }

    /// Whether `meta` is a directory the run writes into
    ///
    /// A walk must not descend into one of these: when the destination lies
    /// inside the source, it would keep listing its own output.
    pub(crate) fn is_target(&self, meta: &EntryMetadata) -> bool {
        self.targets
            .lock()
            .is_ok_and(|targets| targets.contains(&(meta.dev, meta.ino)))
    }

    /// Log and count one finished entry
    pub fn record(&self, entry: &EntryOutcome) {
        match &entry.outcome {
            SyncOutcome::Failed(err) => debug!("failed {}: {}", entry.source.display(), err),
            outcome => debug!(
                "{:?} {} => {}",
                outcome,
                entry.source.display(),
                entry.destination.display()
            ),
        }
        if let Some(progress) = &self.progress {
            progress.record(entry);
        }
    }

    fn finish(&self) {
        if let Some(progress) = &self.progress {
            progress.finish();
        }
    }
}

/// Synchronize every source into `destination`
///
/// Sources are processed one after another, each independently.
///
/// # Errors
///
/// Only an invalid configuration is returned as `Err`; per-entry failures are
/// in the report.
#[allow(clippy::future_not_send)]
pub async fn sync_paths(
    config: &SyncConfig,
    sources: &[PathBuf],
    destination: &Path,
) -> Result<SyncReport> {
    let start_time = Instant::now();
    let ctx = SyncContext::new(config.clone())?;

    let mut report = SyncReport::default();
    for source in sources {
        info!(
            "Starting synchronization from {} to {}",
            source.display(),
            destination.display()
        );
        report.merge(sync_source(&ctx, source, destination).await);
    }
    ctx.finish();

    report.duration = start_time.elapsed();
    let stats = report.stats();
    info!(
        "Synchronization completed in {:?}: {} created, {} updated, {} skipped, {} failed, {} directories, {} bytes",
        stats.duration,
        stats.created,
        stats.updated,
        stats.skipped,
        stats.failed,
        stats.directories_created,
        stats.bytes_copied
    );
    Ok(report)
}

/// Synchronize one top-level source into `destination`
#[allow(clippy::future_not_send)]
pub async fn sync_source(ctx: &SyncContext, source: &Path, destination: &Path) -> SyncReport {
    let src_meta = match probe(source, Follow::No).await {
        Ok(meta) => meta,
        Err(err) => {
            return finished(
                ctx,
                EntryOutcome::failed(source, destination, EntryKind::Missing, err),
            )
        }
    };

    match src_meta.kind {
        EntryKind::Directory => sync_directory_source(ctx, source, destination).await,
        EntryKind::Regular | EntryKind::Symlink => {
            let entry = sync_file_source(ctx, source, &src_meta, destination).await;
            finished(ctx, entry)
        }
        EntryKind::Other => finished(
            ctx,
            EntryOutcome::failed(
                source,
                destination,
                src_meta.kind,
                SyncError::NonRegularSource {
                    path: source.to_path_buf(),
                },
            ),
        ),
        EntryKind::Missing => finished(
            ctx,
            EntryOutcome::failed(
                source,
                destination,
                src_meta.kind,
                SyncError::NotFound {
                    path: source.to_path_buf(),
                },
            ),
        ),
    }
}

fn finished(ctx: &SyncContext, entry: EntryOutcome) -> SyncReport {
    ctx.record(&entry);
    SyncReport::single(entry)
}

/// Destination kind for a top-level sync, following a final symlink
///
/// Returns the followed metadata, or `None` when nothing exists.
async fn resolve_destination(destination: &Path) -> Result<Option<EntryMetadata>> {
    let Some(meta) = try_probe(destination, Follow::No).await? else {
        return Ok(None);
    };
    if meta.kind != EntryKind::Symlink {
        return Ok(Some(meta));
    }
    try_probe(destination, Follow::Yes)
        .await?
        .map(Some)
        .ok_or_else(|| SyncError::UnsupportedDestinationKind {
            path: destination.to_path_buf(),
        })
}

async fn sync_file_source(
    ctx: &SyncContext,
    source: &Path,
    src_meta: &EntryMetadata,
    destination: &Path,
) -> EntryOutcome {
    let kind = src_meta.kind;
    let dest_meta = match resolve_destination(destination).await {
        Ok(meta) => meta,
        Err(err) => return EntryOutcome::failed(source, destination, kind, err),
    };

    let result = match dest_meta.as_ref().map(|m| m.kind) {
        None => materialize(source, destination).await,
        Some(EntryKind::Regular) => {
            let dest_meta = dest_meta.as_ref();
            if dest_meta.is_some_and(|d| d.same_file(src_meta)) {
                Ok(None)
            } else {
                match ctx
                    .config
                    .policy
                    .needs_update(source, src_meta, destination, dest_meta)
                    .await
                {
                    Ok(true) => materialize(source, destination).await,
                    Ok(false) => Ok(None),
                    Err(err) => Err(err),
                }
            }
        }
        Some(EntryKind::Directory) => {
            let Some(name) = source.file_name() else {
                return EntryOutcome::failed(
                    source,
                    destination,
                    kind,
                    SyncError::DirectoryCollision {
                        path: destination.to_path_buf(),
                    },
                );
            };
            let target = destination.join(name);
            let result = match try_probe(&target, Follow::No).await {
                Ok(Some(existing)) if existing.same_file(src_meta) => Ok(None),
                Ok(_) => materialize(source, &target).await,
                Err(err) => Err(err),
            };
            return outcome_for(source, &target, kind, result);
        }
        Some(_) => Err(SyncError::UnsupportedDestinationKind {
            path: destination.to_path_buf(),
        }),
    };

    outcome_for(source, destination, kind, result)
}

/// Placeholder then full materialization; `Some` carries whether the
/// placeholder was new
pub(crate) async fn materialize(
    source: &Path,
    destination: &Path,
) -> Result<Option<(bool, Transferred)>> {
    let created = ensure_placeholder(destination).await?;
    let transferred = sync_entry(source, destination).await?;
    Ok(Some((created, transferred)))
}

pub(crate) fn outcome_for(
    source: &Path,
    destination: &Path,
    kind: EntryKind,
    result: Result<Option<(bool, Transferred)>>,
) -> EntryOutcome {
    match result {
        Ok(Some((created, transferred))) => {
            EntryOutcome::transferred(source, destination, kind, created, transferred)
        }
        Ok(None) => EntryOutcome::new(source, destination, kind, SyncOutcome::Skipped),
        Err(err) => EntryOutcome::failed(source, destination, kind, err),
    }
}

async fn sync_directory_source(ctx: &SyncContext, source: &Path, destination: &Path) -> SyncReport {
    let dest_meta = match resolve_destination(destination).await {
        Ok(meta) => meta,
        Err(err) => {
            return finished(
                ctx,
                EntryOutcome::failed(source, destination, EntryKind::Directory, err),
            )
        }
    };

    let target = match (dest_meta.as_ref().map(|m| m.kind), source.file_name()) {
        (None, _) => destination.to_path_buf(),
        (Some(EntryKind::Directory | EntryKind::Regular), Some(name)) => destination.join(name),
        // "." or "/" has no name of its own; its contents go straight in
        (Some(EntryKind::Directory), None) => destination.to_path_buf(),
        _ => {
            return finished(
                ctx,
                EntryOutcome::failed(
                    source,
                    destination,
                    EntryKind::Directory,
                    SyncError::UnsupportedDestinationKind {
                        path: destination.to_path_buf(),
                    },
                ),
            )
        }
    };

    let mut report = SyncReport::default();
    let claimed = match ensure_directory(&target).await {
        Ok(created) => probe(&target, Follow::No).await.map(|meta| (created, meta)),
        Err(err) => Err(err),
    };
    let outcome = match claimed {
        Ok((created, meta)) => {
            ctx.claim_target(&meta);
            if created {
                SyncOutcome::Created
            } else {
                SyncOutcome::Skipped
            }
        }
        Err(err) => {
            return finished(
                ctx,
                EntryOutcome::failed(source, &target, EntryKind::Directory, err),
            )
        }
    };
    let entry = EntryOutcome::new(source, &target, EntryKind::Directory, outcome);
    ctx.record(&entry);
    report.push(entry);

    report.merge(sync_tree(ctx, source, &target).await);
    report
}
