//! Directory listing

use crate::error::{spawn_join_error, Result};
use std::ffi::OsString;
use std::path::Path;

/// List the names of the immediate children of a directory
///
/// `.` and `..` are never included. Names are returned sorted bytewise so a
/// traversal driven by this listing is deterministic.
///
/// # Errors
///
/// This function will return an error if:
/// - The path doesn't exist or is not a directory
/// - Permission to read the directory is denied
/// - Reading an entry fails midway
pub async fn read_dir_names(path: &Path) -> Result<Vec<OsString>> {
    let path = path.to_path_buf();
    let names = compio::runtime::spawn_blocking(move || -> std::io::Result<Vec<OsString>> {
        let mut names = std::fs::read_dir(&path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    })
    .await
    .map_err(spawn_join_error)??;
    Ok(names)
}
