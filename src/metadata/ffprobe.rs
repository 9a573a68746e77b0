//! Video metadata extraction via FFprobe

use super::{HEIGHT_KEY, MetadataFields, MetadataProvider, Probe, WIDTH_KEY};
use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

/// Metadata keys to try for the creation date, in priority order
pub const CREATION_DATE_KEYS: &[&str] = &["creation_time", "date", "date_created", "date_modified"];

/// Cached FFprobe availability check
static FFPROBE_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if ffprobe is available (cached)
fn is_ffprobe_available() -> bool {
    *FFPROBE_AVAILABLE.get_or_init(|| {
        let available = Command::new("ffprobe").arg("-version").output().is_ok();
        if !available {
            warn!("ffprobe not found, video files will fall back to file system dates");
        }
        available
    })
}

/// Reads container and stream tags through the `ffprobe` program
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProvider;

impl MetadataProvider for FfprobeProvider {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Probe {
        match read_video_fields(path) {
            Ok(fields) if fields.is_empty() => Probe::NoData,
            Ok(fields) => Probe::Found(fields),
            Err(Error::ToolNotFound { tool }) => Probe::ToolNotFound(tool),
            Err(e) => {
                debug!(?path, error = %e, "No video metadata");
                Probe::NoData
            }
        }
    }
}

/// Run ffprobe on a file and collect its tags
pub fn read_video_fields(path: &Path) -> Result<MetadataFields> {
    if !is_ffprobe_available() {
        return Err(Error::ToolNotFound { tool: "ffprobe" });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!("Failed to execute ffprobe: {}", e),
        })?;

    if !output.status.success() {
        return Err(Error::VideoMetadata {
            path: path.to_path_buf(),
            message: format!(
                "FFprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    trace!(?path, "FFprobe output: {}", json_str);

    let json: Value = serde_json::from_str(&json_str).map_err(|e| Error::VideoMetadata {
        path: path.to_path_buf(),
        message: format!("Failed to parse FFprobe JSON: {}", e),
    })?;

    Ok(fields_from_ffprobe_json(&json))
}

/// Flatten ffprobe JSON into fields
///
/// Format-level tags win over stream tags; the first video stream supplies
/// the pixel dimensions.
pub fn fields_from_ffprobe_json(json: &Value) -> MetadataFields {
    let mut fields = MetadataFields::new();

    if let Some(tags) = json.pointer("/format/tags").and_then(Value::as_object) {
        for (key, value) in tags {
            if let Some(value) = value.as_str() {
                fields.insert(key, value);
            }
        }
    }

    if let Some(streams) = json.get("streams").and_then(Value::as_array) {
        for stream in streams {
            if let Some(tags) = stream.get("tags").and_then(Value::as_object) {
                for (key, value) in tags {
                    if let Some(value) = value.as_str() {
                        fields.insert(key, value);
                    }
                }
            }

            if stream.get("codec_type").and_then(Value::as_str) == Some("video")
                && let (Some(width), Some(height)) = (
                    stream.get("width").and_then(Value::as_u64),
                    stream.get("height").and_then(Value::as_u64),
                )
            {
                fields.insert(WIDTH_KEY, width.to_string());
                fields.insert(HEIGHT_KEY, height.to_string());
            }
        }
    }

    fields
}
