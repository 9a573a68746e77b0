//! Date to project name assignments

use crate::error::{Error, Result};
use crate::time::date_key;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// Name given to dates that have no project name
pub const DEFAULT_PROJECT_NAME: &str = "Untitled";

/// Characters that cannot appear in a folder name on common file systems
static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

fn invalid_chars() -> &'static Regex {
    INVALID_CHARS.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap())
}

/// Validate and sanitize a project name for use in a folder name
pub fn clean_project_name(name: &str, max_len: usize) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidProjectName {
            name: name.to_string(),
            reason: "name cannot be empty".into(),
        });
    }
    if trimmed.chars().count() > max_len {
        return Err(Error::InvalidProjectName {
            name: name.to_string(),
            reason: format!("name is longer than {} characters", max_len),
        });
    }

    let cleaned = invalid_chars().replace_all(trimmed, "_");
    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        return Err(Error::InvalidProjectName {
            name: name.to_string(),
            reason: "name has no usable characters".into(),
        });
    }
    Ok(cleaned.to_string())
}

fn check_date_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if NaiveDate::parse_from_str(key, "%Y%m%d").is_err() {
        return Err(Error::Config(format!("'{}' is not a YYYYMMDD date", key)));
    }
    Ok(key)
}

/// Mapping from `YYYYMMDD` to project name, supplied before organizing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMapping {
    names: BTreeMap<String, String>,
}

impl ProjectMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a project name to a date key, validating the name
    pub fn insert(&mut self, key: &str, name: &str, max_len: usize) -> Result<()> {
        let key = check_date_key(key)?;
        let name = clean_project_name(name, max_len)?;
        self.names.insert(key.to_string(), name);
        Ok(())
    }

    /// One name for every date
    pub fn uniform(dates: &BTreeSet<NaiveDate>, name: &str, max_len: usize) -> Result<Self> {
        let name = clean_project_name(name, max_len)?;
        let names = dates.iter().map(|d| (date_key(*d), name.clone())).collect();
        Ok(Self { names })
    }

    /// Generated names for every date
    pub fn auto(dates: &BTreeSet<NaiveDate>) -> Self {
        let names = dates
            .iter()
            .map(|d| (date_key(*d), DEFAULT_PROJECT_NAME.to_string()))
            .collect();
        Self { names }
    }

    /// Load a JSON object of `{"YYYYMMDD": "project name"}`
    ///
    /// Dates whose name is `null` or blank are left out, so their files are skipped.
    pub fn load_json(path: &Path, max_len: usize) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let raw: BTreeMap<String, Option<String>> =
            serde_json::from_str(&content).map_err(|e| Error::Mapping {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mapping_error = |e: Error| Error::Mapping {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut mapping = Self::new();
        for (key, name) in &raw {
            match name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => {
                    mapping.insert(key, name, max_len).map_err(mapping_error)?;
                }
                _ => {
                    let key = check_date_key(key).map_err(mapping_error)?;
                    warn!(?path, date = key, "No project name for date, its files will be skipped");
                }
            }
        }
        Ok(mapping)
    }

    /// Project name assigned to a date
    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.names.get(&date_key(date)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_clean_project_name() {
        assert_eq!(clean_project_name("  Trip  ", 50).unwrap(), "Trip");
        assert_eq!(clean_project_name("Paris/Lyon", 50).unwrap(), "Paris_Lyon");
        assert_eq!(clean_project_name("What?", 50).unwrap(), "What_");
        assert_eq!(clean_project_name("Beach...", 50).unwrap(), "Beach");

        assert!(clean_project_name("   ", 50).is_err());
        assert!(clean_project_name("...", 50).is_err());
        assert!(clean_project_name(&"x".repeat(51), 50).is_err());
        assert!(clean_project_name(&"é".repeat(50), 50).is_ok());
    }

    #[test]
    fn test_insert_rejects_bad_keys() {
        let mut mapping = ProjectMapping::new();
        assert!(mapping.insert("2024-03-15", "Trip", 50).is_err());
        assert!(mapping.insert("20241345", "Trip", 50).is_err());
        mapping.insert("20240315", "Trip", 50).unwrap();
        assert_eq!(mapping.get(date(2024, 3, 15)), Some("Trip"));
        assert_eq!(mapping.get(date(2024, 3, 16)), None);
    }

    #[test]
    fn test_uniform_and_auto() {
        let dates: BTreeSet<NaiveDate> = [date(2024, 1, 1), date(2024, 1, 2)].into_iter().collect();

        let uniform = ProjectMapping::uniform(&dates, "Holiday", 50).unwrap();
        assert_eq!(uniform.len(), 2);
        assert_eq!(uniform.get(date(2024, 1, 2)), Some("Holiday"));

        let auto = ProjectMapping::auto(&dates);
        assert_eq!(auto.get(date(2024, 1, 1)), Some(DEFAULT_PROJECT_NAME));
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(&path, r#"{"20240315": "Trip", "20240316": "Museum"}"#).unwrap();

        let mapping = ProjectMapping::load_json(&path, 50).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(date(2024, 3, 16)), Some("Museum"));

        fs::write(&path, r#"["not", "an", "object"]"#).unwrap();
        assert!(matches!(
            ProjectMapping::load_json(&path, 50),
            Err(Error::Mapping { .. })
        ));

        fs::write(&path, r#"{"2024-03-15": "Trip"}"#).unwrap();
        assert!(ProjectMapping::load_json(&path, 50).is_err());
    }

    #[test]
    fn test_load_json_leaves_out_blank_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(
            &path,
            r#"{"20240315": "Trip", "20240316": "", "20240317": null, "20240318": "   "}"#,
        )
        .unwrap();

        let mapping = ProjectMapping::load_json(&path, 50).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get(date(2024, 3, 15)), Some("Trip"));
        assert_eq!(mapping.get(date(2024, 3, 16)), None);
        assert_eq!(mapping.get(date(2024, 3, 17)), None);

        // Keys are still checked when the name is blank
        fs::write(&path, r#"{"March 16": null}"#).unwrap();
        assert!(matches!(
            ProjectMapping::load_json(&path, 50),
            Err(Error::Mapping { .. })
        ));
    }
}
