//! Date resolution
//!
//! Resolves a calendar date for every media file using, in order:
//! 1. Embedded EXIF capture time (JPEG)
//! 2. RAW metadata via exiftool
//! 3. Video metadata via ffprobe
//! 4. File system creation time

pub mod datetime;

use crate::config::Config;
use crate::media::MediaFile;
use crate::metadata::exif::DATE_TAGS;
use crate::metadata::ffprobe::CREATION_DATE_KEYS;
use crate::metadata::{MetadataProvider, Probe, Providers};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Source of the resolved date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Extracted from embedded EXIF metadata
    Exif,
    /// Extracted from RAW metadata via exiftool
    RawMetadata,
    /// Extracted from video metadata via ffprobe
    VideoMetadata,
    /// From file system creation (or modification) time
    FileSystem,
}

/// Timestamp found by one of the metadata sources
#[derive(Debug, Clone)]
pub struct ExtractedTime {
    pub timestamp: NaiveDateTime,
    pub source: TimeSource,
}

/// Calendar date attached to a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub source: TimeSource,
}

impl ResolvedDate {
    /// `YYYYMMDD`, the grouping key and folder prefix
    pub fn key(&self) -> String {
        date_key(self.date)
    }
}

/// Format a date as `YYYYMMDD`
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// One step of the fallback chain
type DateSource = fn(&DateResolver<'_>, &MediaFile) -> Option<ExtractedTime>;

/// Metadata sources in priority order; the file system is the final fallback
const DATE_SOURCES: &[DateSource] = &[embedded_time, raw_time, video_time];

/// Resolves a date for each file; never fails
pub struct DateResolver<'a> {
    config: &'a Config,
    providers: &'a Providers,
}

impl<'a> DateResolver<'a> {
    pub fn new(config: &'a Config, providers: &'a Providers) -> Self {
        Self { config, providers }
    }

    /// Resolve a calendar date, first metadata source wins
    pub fn resolve(&self, file: &MediaFile) -> ResolvedDate {
        let extracted = DATE_SOURCES
            .iter()
            .find_map(|source| source(self, file))
            .unwrap_or_else(|| filesystem_time(file.path()));

        debug!(
            path = ?file.path(),
            source = ?extracted.source,
            timestamp = %extracted.timestamp,
            "Resolved date"
        );

        ResolvedDate {
            date: extracted.timestamp.date(),
            source: extracted.source,
        }
    }
}

/// Ask a provider for the first parseable timestamp among `keys`
fn probe_timestamp(
    provider: &dyn MetadataProvider,
    path: &Path,
    keys: &[&str],
) -> Option<NaiveDateTime> {
    match provider.probe(path) {
        Probe::Found(fields) => {
            let (key, timestamp) = fields.first_timestamp(keys)?;
            debug!(?path, provider = provider.name(), key, "Found metadata timestamp");
            Some(timestamp)
        }
        Probe::NoData => None,
        Probe::ToolNotFound(tool) => {
            debug!(?path, tool, "Metadata tool missing");
            None
        }
    }
}

fn embedded_time(resolver: &DateResolver<'_>, file: &MediaFile) -> Option<ExtractedTime> {
    if !resolver.config.is_jpeg(file.extension()) {
        return None;
    }
    let keys: Vec<&str> = DATE_TAGS.iter().map(|(_, name)| *name).collect();
    probe_timestamp(resolver.providers.embedded.as_ref(), file.path(), &keys).map(|timestamp| {
        ExtractedTime {
            timestamp,
            source: TimeSource::Exif,
        }
    })
}

fn raw_time(resolver: &DateResolver<'_>, file: &MediaFile) -> Option<ExtractedTime> {
    if !resolver.config.is_raw(file.extension()) {
        return None;
    }
    probe_timestamp(resolver.providers.raw.as_ref(), file.path(), &["DateTimeOriginal"]).map(
        |timestamp| ExtractedTime {
            timestamp,
            source: TimeSource::RawMetadata,
        },
    )
}

fn video_time(resolver: &DateResolver<'_>, file: &MediaFile) -> Option<ExtractedTime> {
    if !resolver.config.is_video(file.extension()) {
        return None;
    }
    probe_timestamp(resolver.providers.video.as_ref(), file.path(), CREATION_DATE_KEYS).map(
        |timestamp| ExtractedTime {
            timestamp,
            source: TimeSource::VideoMetadata,
        },
    )
}

/// File system creation time in local time
///
/// Falls back to the modification time where creation time is unsupported,
/// and to the current time if the file cannot be inspected at all.
fn filesystem_time(path: &Path) -> ExtractedTime {
    let system_time = fs::metadata(path).and_then(|m| m.created().or_else(|_| m.modified()));

    let timestamp = match system_time {
        Ok(time) => DateTime::<Local>::from(time).naive_local(),
        Err(e) => {
            warn!(?path, error = %e, "Could not read file times, using current time");
            Local::now().naive_local()
        }
    };

    debug!(?path, "Using file system time as fallback");

    ExtractedTime {
        timestamp,
        source: TimeSource::FileSystem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::testing::{FakeProvider, empty_providers, fields};
    use chrono::Datelike;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> MediaFile {
        let path = dir.join(name);
        fs::write(&path, b"not really media").unwrap();
        MediaFile::new(path)
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn test_jpeg_priority_order() {
        let dir = tempdir().unwrap();
        let file = touch(dir.path(), "IMG_0001.jpg");

        let mut providers = empty_providers();
        providers.embedded = Arc::new(FakeProvider::new().with(
            "IMG_0001.jpg",
            fields(&[
                ("DateTime", "2024:05:01 08:00:00"),
                ("DateTimeDigitized", "2024:04:01 08:00:00"),
                ("DateTimeOriginal", "2024:03:15 10:00:00"),
            ]),
        ));

        let config = Config::default();
        let resolved = DateResolver::new(&config, &providers).resolve(&file);
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(resolved.source, TimeSource::Exif);
        assert_eq!(resolved.key(), "20240315");
    }

    #[test]
    fn test_malformed_exif_falls_through_to_next_field() {
        let dir = tempdir().unwrap();
        let file = touch(dir.path(), "IMG_0002.JPEG");

        let mut providers = empty_providers();
        providers.embedded = Arc::new(FakeProvider::new().with(
            "IMG_0002.JPEG",
            fields(&[
                ("DateTimeOriginal", "0000:00:00 00:00:00"),
                ("DateTimeDigitized", "2022:11:30 23:59:59"),
            ]),
        ));

        let config = Config::default();
        let resolved = DateResolver::new(&config, &providers).resolve(&file);
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2022, 11, 30).unwrap());
    }

    #[test]
    fn test_raw_and_video_sources() {
        let dir = tempdir().unwrap();
        let raw = touch(dir.path(), "DSCF0001.RAF");
        let video = touch(dir.path(), "clip.mov");

        let mut providers = empty_providers();
        providers.raw = Arc::new(FakeProvider::new().with(
            "DSCF0001.RAF",
            fields(&[("DateTimeOriginal", "2023:08:02 07:45:12")]),
        ));
        providers.video = Arc::new(FakeProvider::new().with(
            "clip.mov",
            fields(&[("date_created", "2021-06-01T12:00:00Z")]),
        ));

        let config = Config::default();
        let resolver = DateResolver::new(&config, &providers);

        let resolved = resolver.resolve(&raw);
        assert_eq!(resolved.source, TimeSource::RawMetadata);
        assert_eq!(resolved.date.year(), 2023);

        let resolved = resolver.resolve(&video);
        assert_eq!(resolved.source, TimeSource::VideoMetadata);
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2021, 6, 1).unwrap());
    }

    #[test]
    fn test_providers_only_asked_for_their_type() {
        let dir = tempdir().unwrap();
        let png = touch(dir.path(), "screen.png");

        let embedded = Arc::new(FakeProvider::new());
        let mut providers = empty_providers();
        providers.embedded = embedded.clone();

        let config = Config::default();
        let resolved = DateResolver::new(&config, &providers).resolve(&png);
        assert_eq!(resolved.source, TimeSource::FileSystem);
        assert_eq!(embedded.call_count(), 0);
    }

    #[test]
    fn test_missing_tool_falls_back_to_filesystem() {
        let dir = tempdir().unwrap();
        let video = touch(dir.path(), "clip.mp4");

        let mut providers = empty_providers();
        providers.video = Arc::new(
            FakeProvider::new().with("clip.mp4", Probe::ToolNotFound("ffprobe")),
        );

        let config = Config::default();
        let resolved = DateResolver::new(&config, &providers).resolve(&video);
        assert_eq!(resolved.source, TimeSource::FileSystem);
        assert_eq!(resolved.date, today());
    }

    #[test]
    fn test_corrupt_and_missing_files_still_resolve() {
        let dir = tempdir().unwrap();
        let corrupt = touch(dir.path(), "corrupt.jpg");
        let missing = MediaFile::new(dir.path().join("gone.jpg"));

        let providers = Providers::system();
        let config = Config::default();
        let resolver = DateResolver::new(&config, &providers);

        assert_eq!(resolver.resolve(&corrupt).source, TimeSource::FileSystem);
        assert_eq!(resolver.resolve(&missing).date, today());
    }

    #[test]
    fn test_real_exif_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trip.jpg");
        fs::write(
            &path,
            crate::metadata::exif::fixtures::jpeg_with_date_time_original("2024:03:15 10:00:00"),
        )
        .unwrap();

        let providers = Providers::system();
        let config = Config::default();
        let resolved = DateResolver::new(&config, &providers).resolve(&MediaFile::new(path));
        assert_eq!(resolved.source, TimeSource::Exif);
        assert_eq!(resolved.key(), "20240315");
    }
}
