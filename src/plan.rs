//! Destination folder and file name planning

use crate::aspect::AspectCategory;
use crate::error::{Error, Result};
use crate::time::date_key;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Highest numeric suffix tried before giving up
const MAX_SUFFIX: u32 = 9999;

/// What a file is grouped by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// `{YYYYMMDD}_{project}`
    Date { date: NaiveDate, project: String },
    /// `Landscape`, `Portrait` or `Square`
    Aspect(AspectCategory),
}

impl GroupKey {
    pub fn folder_name(&self) -> String {
        match self {
            GroupKey::Date { date, project } => format!("{}_{}", date_key(*date), project),
            GroupKey::Aspect(category) => category.folder_name().to_string(),
        }
    }
}

/// Plans collision-free destinations within one run
///
/// A name counts as taken if it exists on disk or was already handed out by
/// this planner, so planning and placing one file at a time never lets two
/// files claim the same destination.
#[derive(Debug, Default)]
pub struct PlacementPlanner {
    claimed: HashSet<PathBuf>,
    dry_run: bool,
}

impl PlacementPlanner {
    pub fn new(dry_run: bool) -> Self {
        Self {
            claimed: HashSet::new(),
            dry_run,
        }
    }

    /// Create the group folder under `base_dir` if needed; idempotent
    pub fn ensure_folder(&self, base_dir: &Path, key: &GroupKey) -> Result<PathBuf> {
        let folder = base_dir.join(key.folder_name());
        if !self.dry_run {
            fs::create_dir_all(&folder)?;
        }
        debug!(?folder, "Created/accessed folder");
        Ok(folder)
    }

    /// Pick a free destination for `original_name` in the group folder
    pub fn plan_destination(
        &mut self,
        base_dir: &Path,
        key: &GroupKey,
        rename: bool,
        original_name: &str,
    ) -> Result<PathBuf> {
        let folder = self.ensure_folder(base_dir, key)?;
        let (stem, extension) = split_name(original_name);

        let prefix = if rename {
            format!("{}_", key.folder_name())
        } else {
            String::new()
        };

        let mut candidate = folder.join(format!("{}{}", prefix, original_name));
        let mut counter = 1;
        while self.is_taken(&candidate) {
            if counter > MAX_SUFFIX {
                return Err(Error::NameExhausted { path: candidate });
            }
            candidate = folder.join(format!("{}{}_{}{}", prefix, stem, counter, extension));
            counter += 1;
        }

        self.claimed.insert(candidate.clone());
        Ok(candidate)
    }

    /// Whether `path` already sits in its group folder under its final name
    ///
    /// True for files left by an earlier run into the same destination.
    pub fn already_placed(&self, base_dir: &Path, key: &GroupKey, rename: bool, path: &Path) -> bool {
        let folder_name = key.folder_name();
        if path.parent() != Some(base_dir.join(&folder_name).as_path()) {
            return false;
        }
        if !rename {
            return true;
        }
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&format!("{}_", folder_name)))
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.claimed.contains(path) || path.exists()
    }
}

/// Split a file name into stem and extension (with its dot)
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
