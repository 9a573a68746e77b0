//! Media file and extension allow-list types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A discovered media file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaFile {
    path: PathBuf,
    name: String,
    extension: String,
}

impl MediaFile {
    /// Build a media file from a path; the extension is lower-cased and keeps its leading dot
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        Self {
            path,
            name,
            extension,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased extension with leading dot, empty when the file has none
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl fmt::Display for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Normalize an extension to lower case with a single leading dot
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

/// Extension allow-list
///
/// Entries are stored normalized, so `"JPG"`, `"jpg"` and `".jpg"` are the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExtensionSet(HashSet<String>);

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ext: &str) {
        self.0.insert(normalize_extension(ext));
    }

    /// Check membership of an extension in any spelling
    pub fn contains(&self, ext: &str) -> bool {
        !ext.is_empty() && self.0.contains(&normalize_extension(ext))
    }

    /// Check membership of a path's extension
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.contains(e))
    }

    /// Union of two sets
    pub fn union(&self, other: &ExtensionSet) -> ExtensionSet {
        ExtensionSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ExtensionSet::new();
        for ext in iter {
            set.insert(ext.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for ExtensionSet {
    fn from(v: Vec<String>) -> Self {
        v.into_iter().collect()
    }
}

impl From<ExtensionSet> for Vec<String> {
    fn from(set: ExtensionSet) -> Self {
        let mut v: Vec<String> = set.0.into_iter().collect();
        v.sort();
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_file_fields() {
        let file = MediaFile::new("/photos/trip/IMG_0001.JPG");
        assert_eq!(file.name(), "IMG_0001.JPG");
        assert_eq!(file.extension(), ".jpg");
        assert_eq!(file.path(), Path::new("/photos/trip/IMG_0001.JPG"));

        let bare = MediaFile::new("/photos/README");
        assert_eq!(bare.extension(), "");
    }

    #[test]
    fn test_extension_set_normalizes() {
        let set: ExtensionSet = ["JPG", ".jpeg", "png"].into_iter().collect();
        assert!(set.contains(".jpg"));
        assert!(set.contains("JPEG"));
        assert!(set.contains(".PNG"));
        assert!(!set.contains("gif"));
        assert!(!set.contains(""));
        assert_eq!(set.len(), 3);

        assert!(set.matches(Path::new("a/b/photo.Jpg")));
        assert!(!set.matches(Path::new("a/b/photo")));
    }
}
