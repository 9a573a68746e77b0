//! RAW metadata extraction via ExifTool

use super::{HEIGHT_KEY, MetadataFields, MetadataProvider, Probe, WIDTH_KEY};
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

/// Tags requested from exiftool
const REQUESTED_TAGS: &[&str] = &["-DateTimeOriginal", "-ImageWidth", "-ImageHeight"];

/// Cached ExifTool availability check
static EXIFTOOL_AVAILABLE: OnceLock<bool> = OnceLock::new();

fn is_exiftool_available() -> bool {
    *EXIFTOOL_AVAILABLE.get_or_init(|| {
        let available = Command::new("exiftool").arg("-ver").output().is_ok();
        if !available {
            warn!("exiftool not found, RAW files will fall back to file system dates");
        }
        available
    })
}

/// Reads RAW camera metadata through the `exiftool` program
#[derive(Debug, Clone, Copy, Default)]
pub struct ExiftoolProvider;

impl MetadataProvider for ExiftoolProvider {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    fn probe(&self, path: &Path) -> Probe {
        match read_raw_fields(path) {
            Ok(fields) if fields.is_empty() => Probe::NoData,
            Ok(fields) => Probe::Found(fields),
            Err(Error::ToolNotFound { tool }) => Probe::ToolNotFound(tool),
            Err(e) => {
                debug!(?path, error = %e, "No RAW metadata");
                Probe::NoData
            }
        }
    }
}

/// Run exiftool on a file and collect the requested tags
pub fn read_raw_fields(path: &Path) -> Result<MetadataFields> {
    if !is_exiftool_available() {
        return Err(Error::ToolNotFound { tool: "exiftool" });
    }

    let output = Command::new("exiftool")
        .args(["-json", "-n"])
        .args(REQUESTED_TAGS)
        .arg(path)
        .output()
        .map_err(|e| Error::RawMetadata {
            path: path.to_path_buf(),
            message: format!("Failed to execute exiftool: {}", e),
        })?;

    // exiftool exits non-zero when the file is unreadable but may still print JSON
    let json_str = String::from_utf8_lossy(&output.stdout);
    trace!(?path, "ExifTool output: {}", json_str);

    if json_str.trim().is_empty() {
        return Err(Error::RawMetadata {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let json: Value = serde_json::from_str(&json_str).map_err(|e| Error::RawMetadata {
        path: path.to_path_buf(),
        message: format!("Failed to parse exiftool JSON: {}", e),
    })?;

    Ok(fields_from_exiftool_json(&json))
}

/// Flatten the first object of exiftool's JSON array into fields
pub fn fields_from_exiftool_json(json: &Value) -> MetadataFields {
    let mut fields = MetadataFields::new();

    let Some(object) = json
        .as_array()
        .and_then(|items| items.first())
        .and_then(Value::as_object)
    else {
        return fields;
    };

    if let Some(value) = object.get("DateTimeOriginal").and_then(Value::as_str) {
        fields.insert("DateTimeOriginal", value);
    }

    for (source, key) in [("ImageWidth", WIDTH_KEY), ("ImageHeight", HEIGHT_KEY)] {
        match object.get(source) {
            Some(Value::Number(n)) => fields.insert(key, n.to_string()),
            Some(Value::String(s)) => fields.insert(key, s.as_str()),
            _ => {}
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    #[test]
    fn test_exiftool_json() {
        let json = json!([{
            "SourceFile": "DSCF0001.RAF",
            "DateTimeOriginal": "2023:08:02 07:45:12",
            "ImageWidth": 6240,
            "ImageHeight": 4160
        }]);

        let fields = fields_from_exiftool_json(&json);
        let (_, ts) = fields.first_timestamp(&["DateTimeOriginal"]).unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 8, 2));

        let dims = fields.dimensions().unwrap();
        assert_eq!((dims.width(), dims.height()), (6240, 4160));
    }

    #[test]
    fn test_missing_tags() {
        let fields = fields_from_exiftool_json(&json!([{ "SourceFile": "x.nef" }]));
        assert!(fields.is_empty());
        assert!(fields_from_exiftool_json(&json!({})).is_empty());
    }
}
