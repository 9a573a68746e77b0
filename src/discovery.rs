//! Media file discovery

use crate::error::{Error, Result};
use crate::media::{ExtensionSet, MediaFile};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Recursively collect files under `root` whose extension is in `allowed`
///
/// Any directory read error aborts the walk. The returned paths are absolute
/// and carry no ordering.
pub fn find_media_files(root: &Path, allowed: &ExtensionSet) -> Result<HashSet<PathBuf>> {
    let root = expand_tilde(root);
    let root = std::path::absolute(&root)?;
    let mut files = HashSet::new();

    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = entry.map_err(|e| Error::Discovery {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
            source: e,
        })?;

        if entry.file_type().is_file() && allowed.matches(entry.path()) {
            files.insert(entry.into_path());
        }
    }

    debug!(?root, count = files.len(), "Discovered media files");
    Ok(files)
}

/// Discover media files sorted by path
pub fn discover(root: &Path, allowed: &ExtensionSet) -> Result<Vec<MediaFile>> {
    let mut files: Vec<MediaFile> = find_media_files(root, allowed)?
        .into_iter()
        .map(MediaFile::new)
        .collect();
    files.sort();
    Ok(files)
}
