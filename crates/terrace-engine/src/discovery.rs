use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::DiscoveryError;

/// Resolve `root` to the config documents it names.
///
/// A file is returned as-is. A directory is walked recursively for `*.json`
/// files, skipping hidden entries. Paths are canonicalized and sorted.
///
/// # Errors
///
/// Returns an error if `root` does not exist, directory walking fails, or a
/// document path cannot be canonicalized.
pub fn discover_configs(root: &Path) -> std::result::Result<Vec<PathBuf>, DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::RootDoesNotExist {
            root: root.to_path_buf(),
        });
    }
    if root.is_file() {
        return Ok(vec![canonicalize(root)?]);
    }

    let mut configs = Vec::new();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|source| DiscoveryError::Walk { source })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().is_none_or(|extension| extension != "json") {
            continue;
        }
        configs.push(canonicalize(entry.path())?);
    }

    configs.sort();
    tracing::debug!(root = %root.display(), count = configs.len(), "discovered config documents");
    Ok(configs)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn canonicalize(path: &Path) -> std::result::Result<PathBuf, DiscoveryError> {
    fs::canonicalize(path).map_err(|source| DiscoveryError::CanonicalizePath {
        path: path.to_path_buf(),
        source,
    })
}
