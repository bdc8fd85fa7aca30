//! Hardlink operations for creating hard links

use crate::error::{spawn_join_error, Result};
use std::path::Path;

/// Create a hard link at `link_path` sharing the inode of `original_path`
///
/// # Errors
///
/// This function will return an error if:
/// - The link path already exists
/// - The original and link are on different filesystems (`EXDEV`)
/// - Permission is denied
pub async fn create_hardlink(original_path: &Path, link_path: &Path) -> Result<()> {
    let original = original_path.to_path_buf();
    let link = link_path.to_path_buf();
    compio::runtime::spawn_blocking(move || std::fs::hard_link(&original, &link))
        .await
        .map_err(spawn_join_error)??;
    Ok(())
}
