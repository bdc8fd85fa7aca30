//! Simple integration tests for compio-fs-extended
//!
//! These tests chain several operations on real files the way a sync engine
//! uses them.

use compio::fs::{File, OpenOptions};
use compio_fs_extended::*;
use filetime::FileTime;
use std::fs;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use tempfile::TempDir;

/// Mirror content, permissions and timestamps of one file onto another
#[compio::test]
async fn test_mirror_regular_file() {
    let temp_dir = TempDir::new().unwrap();
    let src_path = temp_dir.path().join("source.txt");
    let dst_path = temp_dir.path().join("destination.txt");

    fs::write(&src_path, "fresh").unwrap();
    fs::write(&dst_path, "a much longer stale payload").unwrap();
    filetime::set_file_mtime(&src_path, FileTime::from_unix_time(1_500_000_000, 42)).unwrap();
    compio_fs_extended::chmod(&src_path, 0o640).await.unwrap();

    let meta = statx(&src_path).await.unwrap();
    let src = File::open(&src_path).await.unwrap();
    let dst = OpenOptions::new()
        .write(true)
        .create(true)
        .open(&dst_path)
        .await
        .unwrap();

    fchmod(dst.as_raw_fd(), meta.permissions()).await.unwrap();
    let copied = copy_file_range_all(src.as_raw_fd(), dst.as_raw_fd())
        .await
        .unwrap();
    ftruncate(dst.as_raw_fd(), copied).await.unwrap();
    drop(src);
    drop(dst);
    set_file_times(&dst_path, meta.accessed, meta.modified)
        .await
        .unwrap();

    let mirrored = statx(&dst_path).await.unwrap();
    assert_eq!(fs::read_to_string(&dst_path).unwrap(), "fresh");
    assert_eq!(mirrored.permissions(), 0o640);
    assert_eq!(mirrored.modified, meta.modified);
    assert_eq!(mirrored.size, 5);
}

/// Replace a symlink with a new one carrying the same literal target
#[compio::test]
async fn test_symlink_copy_and_timestamps() {
    let temp_dir = TempDir::new().unwrap();
    let src_link = temp_dir.path().join("src_link");
    let dst_link = temp_dir.path().join("dst_link");
    std::os::unix::fs::symlink("does/not/exist", &src_link).unwrap();

    let target = read_symlink(&src_link).await.unwrap();
    create_symlink(&target, &dst_link).await.unwrap();

    let meta = lstatx(&src_link).await.unwrap();
    set_symlink_times(&dst_link, meta.accessed, meta.modified)
        .await
        .unwrap();

    assert_eq!(
        fs::read_link(&dst_link).unwrap(),
        Path::new("does/not/exist")
    );
    assert_eq!(lstatx(&dst_link).await.unwrap().modified, meta.modified);
}

/// Hard link bumps the link count seen by statx
#[compio::test]
async fn test_hardlink_link_count() {
    let temp_dir = TempDir::new().unwrap();
    let original = temp_dir.path().join("original");
    fs::write(&original, "x").unwrap();
    assert_eq!(statx(&original).await.unwrap().nlink, 1);

    create_hardlink(&original, &temp_dir.path().join("second"))
        .await
        .unwrap();

    let meta = statx(&original).await.unwrap();
    assert_eq!(meta.nlink, 2);
    let names = read_dir_names(temp_dir.path()).await.unwrap();
    assert_eq!(names.len(), 2);
}
