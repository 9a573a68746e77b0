//! Metadata provider adapters
//!
//! Each provider wraps one way of reading metadata out of a file:
//! - EXIF embedded in JPEG and TIFF-based images (kamadak-exif)
//! - RAW metadata through the external `exiftool` program
//! - Video container metadata through the external `ffprobe` program
//!
//! Providers normalize what they find into [`MetadataFields`], a flat map of
//! tag name to string value. Pixel dimensions are always exposed under the
//! `ImageWidth` / `ImageHeight` keys.

pub mod exif;
pub mod exiftool;
pub mod ffprobe;

use crate::aspect::ImageDimensions;
use crate::time::datetime::parse_timestamp;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use self::exif::ExifProvider;
pub use self::exiftool::ExiftoolProvider;
pub use self::ffprobe::FfprobeProvider;

/// Normalized key for the pixel width
pub const WIDTH_KEY: &str = "ImageWidth";
/// Normalized key for the pixel height
pub const HEIGHT_KEY: &str = "ImageHeight";

/// Flat tag map; lookups are case-insensitive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFields {
    fields: HashMap<String, String>,
}

impl MetadataFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, keeping the first one seen for a key
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim().trim_matches('"').trim();
        if value.is_empty() {
            return;
        }
        self.fields
            .entry(key.to_lowercase())
            .or_insert_with(|| value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First well-formed timestamp among `keys`, in priority order
    pub fn first_timestamp<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, NaiveDateTime)> {
        keys.iter().find_map(|key| {
            self.get(key)
                .and_then(parse_timestamp)
                .map(|ts| (*key, ts))
        })
    }

    /// Pixel dimensions when both normalized keys hold positive integers
    pub fn dimensions(&self) -> Option<ImageDimensions> {
        let width = self.get(WIDTH_KEY)?.parse::<u32>().ok()?;
        let height = self.get(HEIGHT_KEY)?.parse::<u32>().ok()?;
        ImageDimensions::new(width, height)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MetadataFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = MetadataFields::new();
        for (k, v) in iter {
            fields.insert(k.as_ref(), v);
        }
        fields
    }
}

/// Outcome of asking a provider about one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The provider read the file and found these fields
    Found(MetadataFields),
    /// The file had nothing usable (or could not be parsed)
    NoData,
    /// The external tool backing this provider is not installed
    ToolNotFound(&'static str),
}

impl Probe {
    /// Fields if any were found; a missing tool counts as no data
    pub fn into_fields(self) -> Option<MetadataFields> {
        match self {
            Probe::Found(fields) if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}

/// A source of per-file metadata
pub trait MetadataProvider: Send + Sync {
    /// Short name used in log events
    fn name(&self) -> &'static str;

    /// Read metadata for a single file
    fn probe(&self, path: &Path) -> Probe;
}

/// One provider per role
#[derive(Clone)]
pub struct Providers {
    /// Embedded EXIF reader used for JPEG and other still images
    pub embedded: Arc<dyn MetadataProvider>,
    /// RAW metadata tool
    pub raw: Arc<dyn MetadataProvider>,
    /// Video probe tool
    pub video: Arc<dyn MetadataProvider>,
}

impl Providers {
    /// Production providers: kamadak-exif, exiftool and ffprobe
    pub fn system() -> Self {
        Self {
            embedded: Arc::new(ExifProvider),
            raw: Arc::new(ExiftoolProvider),
            video: Arc::new(FfprobeProvider),
        }
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers")
            .field("embedded", &self.embedded.name())
            .field("raw", &self.raw.name())
            .field("video", &self.video.name())
            .finish()
    }
}
