//! Shared helpers for integration tests

#![allow(dead_code)]

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

pub struct TestTimeoutGuard {
    cancelled: Arc<AtomicBool>,
}

impl Drop for TestTimeoutGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Abort the test process if the guard is still alive after `duration`
pub fn test_timeout_guard(duration: Duration) -> TestTimeoutGuard {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        if !cancelled_clone.load(Ordering::SeqCst) {
            eprintln!("Test timeout exceeded ({}s). Aborting.", duration.as_secs());
            std::process::abort();
        }
    });
    TestTimeoutGuard { cancelled }
}

/// Write `content` to `path` with the given mode and modification time
pub fn write_file(path: &Path, content: &[u8], mode: u32, mtime: FileTime) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    filetime::set_file_mtime(path, mtime).unwrap();
}

/// What a test cares about for one entry of a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File {
        content: Vec<u8>,
        mode: u32,
        mtime: FileTime,
    },
    Symlink {
        target: PathBuf,
    },
    Dir,
}

/// Every entry under `root`, keyed by relative path, symlinks not followed
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Node> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let path = entry.path();
            let meta = fs::symlink_metadata(path).unwrap();
            let node = if meta.file_type().is_symlink() {
                Node::Symlink {
                    target: fs::read_link(path).unwrap(),
                }
            } else if meta.is_dir() {
                Node::Dir
            } else {
                Node::File {
                    content: fs::read(path).unwrap(),
                    mode: meta.mode() & 0o7777,
                    mtime: FileTime::from_last_modification_time(&meta),
                }
            };
            (path.strip_prefix(root).unwrap().to_path_buf(), node)
        })
        .collect()
}
