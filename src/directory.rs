//! Directory tree synchronization
//!
//! Traversal is always driven by the source listing. Destination entries with
//! no source counterpart are left alone; this is a one-way mirror, not a
//! deletion sync.
//!
//! Unlike a top-level file, a file inside a tree is re-materialized on every
//! run without consulting the staleness policy.
//!
//! Siblings are driven concurrently, but every blocking step (listing a
//! directory, probing a child, creating a directory, materializing a leaf)
//! holds a permit from the run's semaphore, so `max_files_in_flight` bounds
//! the filesystem work in progress. No permit is held across a recursion. A
//! directory is created before any of its children is scheduled, and symlinks
//! are never descended into, on either side.
//!
//! A source directory that is one of the run's own top-level targets is
//! skipped, which keeps `resync dir dir/backup` from copying its output into
//! itself.

use crate::error::{Result, SyncError};
use crate::probe::{probe, probe_kind, try_probe, EntryKind, EntryMetadata, Follow};
use crate::sync::{materialize, outcome_for, EntryOutcome, SyncContext, SyncOutcome, SyncReport};
use async_recursion::async_recursion;
use compio_fs_extended::read_dir_names;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Make sure `path` is a directory, returning whether it had to be created
///
/// A non-directory in the way (including a symlink to a directory) is
/// unlinked first. An existing directory is left untouched.
///
/// # Errors
///
/// Returns an error if the path cannot be probed, cleared or created.
pub async fn ensure_directory(path: &Path) -> Result<bool> {
    match probe_kind(path, Follow::No).await? {
        EntryKind::Directory => return Ok(false),
        EntryKind::Missing => {}
        kind => {
            debug!("replacing {} {} with a directory", kind, path.display());
            compio::fs::remove_file(path)
                .await
                .map_err(|e| SyncError::io("unlink", path, e))?;
        }
    }

    compio::fs::create_dir(path)
        .await
        .map_err(|e| SyncError::io("mkdir", path, e))?;
    Ok(true)
}

/// Mirror every entry of `source_dir` into the existing directory `dest_dir`
///
/// Never fails as a whole: an unreadable directory or a failed child shows up
/// as a failed entry and the rest of the tree is still attempted.
#[async_recursion(?Send)]
pub async fn sync_tree(ctx: &SyncContext, source_dir: &Path, dest_dir: &Path) -> SyncReport {
    let listing = {
        let _permit = ctx.semaphore().acquire().await;
        read_dir_names(source_dir).await
    };
    let names = match listing {
        Ok(names) => names,
        Err(e) => {
            let entry = EntryOutcome::failed(
                source_dir,
                dest_dir,
                EntryKind::Directory,
                SyncError::open("opendir", source_dir, e),
            );
            ctx.record(&entry);
            return SyncReport::single(entry);
        }
    };
    trace!("{}: {} entries", source_dir.display(), names.len());

    let children = names
        .iter()
        .map(|name| sync_child(ctx, source_dir.join(name), dest_dir.join(name)));

    let mut report = SyncReport::default();
    for child in join_all(children).await {
        report.merge(child);
    }
    report
}

async fn sync_child(ctx: &SyncContext, source: PathBuf, destination: PathBuf) -> SyncReport {
    let permit = ctx.semaphore().acquire().await;
    let meta = match probe(&source, Follow::No).await {
        Ok(meta) => meta,
        Err(err) => {
            return recorded(
                ctx,
                EntryOutcome::failed(&source, &destination, EntryKind::Missing, err),
            )
        }
    };

    match meta.kind {
        EntryKind::Directory if ctx.is_target(&meta) => {
            debug!("not descending into destination {}", source.display());
            recorded(
                ctx,
                EntryOutcome::new(&source, &destination, meta.kind, SyncOutcome::Skipped),
            )
        }
        EntryKind::Directory => {
            let outcome = match ensure_directory(&destination).await {
                Ok(true) => SyncOutcome::Created,
                Ok(false) => SyncOutcome::Skipped,
                Err(err) => {
                    return recorded(
                        ctx,
                        EntryOutcome::failed(&source, &destination, meta.kind, err),
                    )
                }
            };
            drop(permit);
            let mut report = recorded(
                ctx,
                EntryOutcome::new(&source, &destination, meta.kind, outcome),
            );
            report.merge(sync_tree(ctx, &source, &destination).await);
            report
        }
        EntryKind::Other => recorded(
            ctx,
            EntryOutcome::failed(
                &source,
                &destination,
                meta.kind,
                SyncError::NonRegularSource {
                    path: source.clone(),
                },
            ),
        ),
        _ => {
            let entry = sync_leaf(&source, &destination, &meta).await;
            drop(permit);
            recorded(ctx, entry)
        }
    }
}

/// Placeholder then unconditional materialization of one file or symlink
async fn sync_leaf(source: &Path, destination: &Path, meta: &EntryMetadata) -> EntryOutcome {
    let result = match try_probe(destination, Follow::No).await {
        // syncing a tree onto itself
        Ok(Some(existing)) if existing.same_file(meta) => Ok(None),
        Ok(_) => materialize(source, destination).await,
        Err(err) => Err(err),
    };
    outcome_for(source, destination, meta.kind, result)
}

fn recorded(ctx: &SyncContext, entry: EntryOutcome) -> SyncReport {
    ctx.record(&entry);
    SyncReport::single(entry)
}
