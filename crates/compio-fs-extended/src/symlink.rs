//! Symlink operations for creating and reading symbolic links
//!
//! Targets are treated as opaque byte strings: what `readlink(2)` returns is
//! exactly what `symlink(2)` receives, never canonicalized or made absolute.

use crate::error::{spawn_join_error, Result};
use std::path::{Path, PathBuf};

/// Read the literal target recorded in a symbolic link
///
/// # Errors
///
/// This function will return an error if:
/// - The path doesn't exist
/// - The path is not a symbolic link (`EINVAL`)
pub async fn read_symlink(path: &Path) -> Result<PathBuf> {
    let path = path.to_path_buf();
    let target = compio::runtime::spawn_blocking(move || std::fs::read_link(&path))
        .await
        .map_err(spawn_join_error)??;
    Ok(target)
}

/// Create a symbolic link at `link_path` whose content is `target`
///
/// # Errors
///
/// This function will return an error if:
/// - Something already exists at `link_path`
/// - The parent directory is missing or not writable
pub async fn create_symlink(target: &Path, link_path: &Path) -> Result<()> {
    let target = target.to_path_buf();
    let link_path = link_path.to_path_buf();
    compio::runtime::spawn_blocking(move || std::os::unix::fs::symlink(&target, &link_path))
        .await
        .map_err(spawn_join_error)??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn test_symlink_roundtrip_keeps_relative_target() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");

        create_symlink(Path::new("../elsewhere/x.txt"), &link)
            .await
            .unwrap();
        let target = read_symlink(&link).await.unwrap();
        assert_eq!(target, PathBuf::from("../elsewhere/x.txt"));
    }

    #[compio::test]
    async fn test_create_symlink_over_existing_fails() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("link");
        std::fs::write(&link, b"occupied").unwrap();

        let err = create_symlink(Path::new("x"), &link).await.unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EEXIST));
    }

    #[compio::test]
    async fn test_read_symlink_on_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file");
        std::fs::write(&file, b"data").unwrap();

        let err = read_symlink(&file).await.unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }
}
