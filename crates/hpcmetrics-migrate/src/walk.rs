// SPDX-License-Identifier: Apache-2.0

//! Locates every `meta.json` under an archive root.

use std::path::{Path, PathBuf};

use crate::error::MigrateError;

/// Collects the path of every file named `meta.json` anywhere under `root`, in the order
/// `walkdir` discovers them (depth-first, lexicographic within a directory). The whole tree is
/// walked eagerly into memory; archive trees are large but a list of paths is cheap relative to
/// the documents themselves.
///
/// # Errors
///
/// Returns [`MigrateError::InvalidRoot`] if `root` is not a directory, or
/// [`MigrateError::Walk`] if traversal hits an unreadable entry.
pub fn find_meta_files(root: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    if !root.is_dir() {
        return Err(MigrateError::InvalidRoot { root: root.to_path_buf() });
    }

    let mut paths = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|source| MigrateError::Walk { root: root.to_path_buf(), source })?;
        if entry.file_type().is_file() && entry.file_name() == "meta.json" {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_meta_json_nested_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job_a = dir.path().join("fritz/0/042/1700000000");
        let job_b = dir.path().join("fritz/0/043/1700000100");
        std::fs::create_dir_all(&job_a).unwrap();
        std::fs::create_dir_all(&job_b).unwrap();
        std::fs::write(job_a.join("meta.json"), "{}").unwrap();
        std::fs::write(job_a.join("data.json"), "{}").unwrap();
        std::fs::write(job_b.join("meta.json"), "{}").unwrap();

        let found = find_meta_files(dir.path()).expect("walk should succeed");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.file_name().unwrap() == "meta.json"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = find_meta_files(Path::new("/does/not/exist")).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidRoot { .. }));
    }
}
