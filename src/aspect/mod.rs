//! Aspect ratio resolution and classification
//!
//! Dimensions come from the first method that yields a positive width and
//! height:
//! 1. Embedded metadata
//! 2. JPEG/PNG/GIF header parsing
//! 3. An estimate from the file size
//!
//! If every method fails, 1920×1080 is assumed.

pub mod header;

use crate::config::Config;
use crate::media::MediaFile;
use crate::metadata::Providers;
use serde::Serialize;
use std::fmt;
use std::fs;
use tracing::{debug, warn};

/// Ratios within this distance of 1.0 are square
pub const SQUARE_TOLERANCE: f64 = 0.1;

/// Used when no method produced usable dimensions
pub const FALLBACK_DIMENSIONS: ImageDimensions = ImageDimensions {
    width: 1920,
    height: 1080,
};

/// Positive pixel width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDimensions {
    width: u32,
    height: u32,
}

impl ImageDimensions {
    /// `None` unless both sides are positive
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn category(&self) -> AspectCategory {
        AspectCategory::from_dimensions(*self)
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Orientation class of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AspectCategory {
    Landscape,
    Portrait,
    Square,
}

impl AspectCategory {
    pub const ALL: [AspectCategory; 3] = [
        AspectCategory::Landscape,
        AspectCategory::Portrait,
        AspectCategory::Square,
    ];

    /// Classify exactly: square iff `|w - h| * 10 <= h`, i.e. `|w/h - 1| <= 0.1`
    pub fn from_dimensions(dims: ImageDimensions) -> Self {
        let width = u64::from(dims.width);
        let height = u64::from(dims.height);
        if width.abs_diff(height) * 10 <= height {
            AspectCategory::Square
        } else if width > height {
            AspectCategory::Landscape
        } else {
            AspectCategory::Portrait
        }
    }

    /// Classify a width/height ratio; values at 0.9 and 1.1 count as square
    pub fn from_ratio(ratio: f64) -> Self {
        if (ratio - 1.0).abs() <= SQUARE_TOLERANCE + 1e-9 {
            AspectCategory::Square
        } else if ratio > 1.0 {
            AspectCategory::Landscape
        } else {
            AspectCategory::Portrait
        }
    }

    /// Folder name for this category
    pub fn folder_name(&self) -> &'static str {
        match self {
            AspectCategory::Landscape => "Landscape",
            AspectCategory::Portrait => "Portrait",
            AspectCategory::Square => "Square",
        }
    }
}

impl fmt::Display for AspectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder_name())
    }
}

/// Which method produced the dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionSource {
    Metadata,
    Header,
    SizeEstimate,
    Fallback,
}

/// Dimensions and where they came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDimensions {
    pub dimensions: ImageDimensions,
    pub source: DimensionSource,
}

impl ResolvedDimensions {
    pub fn category(&self) -> AspectCategory {
        self.dimensions.category()
    }
}

/// One step of the fallback chain
type DimensionMethod = fn(&AspectResolver<'_>, &MediaFile) -> Option<ImageDimensions>;

const DIMENSION_METHODS: &[(DimensionSource, DimensionMethod)] = &[
    (DimensionSource::Metadata, embedded_dimensions as DimensionMethod),
    (DimensionSource::Header, header_dimensions as DimensionMethod),
    (DimensionSource::SizeEstimate, size_estimate as DimensionMethod),
];

/// Resolves pixel dimensions for images; never fails
pub struct AspectResolver<'a> {
    config: &'a Config,
    providers: &'a Providers,
}

impl<'a> AspectResolver<'a> {
    pub fn new(config: &'a Config, providers: &'a Providers) -> Self {
        Self { config, providers }
    }

    pub fn resolve(&self, file: &MediaFile) -> ResolvedDimensions {
        let resolved = DIMENSION_METHODS
            .iter()
            .find_map(|(source, method)| {
                method(self, file).map(|dimensions| ResolvedDimensions {
                    dimensions,
                    source: *source,
                })
            })
            .unwrap_or_else(|| {
                warn!(path = ?file.path(), "No usable dimensions, assuming {}", FALLBACK_DIMENSIONS);
                ResolvedDimensions {
                    dimensions: FALLBACK_DIMENSIONS,
                    source: DimensionSource::Fallback,
                }
            });

        debug!(
            path = ?file.path(),
            source = ?resolved.source,
            dimensions = %resolved.dimensions,
            category = %resolved.category(),
            "Resolved dimensions"
        );

        resolved
    }
}

fn embedded_dimensions(resolver: &AspectResolver<'_>, file: &MediaFile) -> Option<ImageDimensions> {
    let provider = if resolver.config.is_raw(file.extension()) {
        &resolver.providers.raw
    } else {
        &resolver.providers.embedded
    };
    provider.probe(file.path()).into_fields()?.dimensions()
}

fn header_dimensions(_resolver: &AspectResolver<'_>, file: &MediaFile) -> Option<ImageDimensions> {
    match header::read_dimensions(file.path()) {
        Ok(dims) => dims,
        Err(e) => {
            debug!(path = ?file.path(), error = %e, "Could not read image header");
            None
        }
    }
}

fn size_estimate(_resolver: &AspectResolver<'_>, file: &MediaFile) -> Option<ImageDimensions> {
    let size = fs::metadata(file.path()).ok()?.len();
    estimate_from_size(size)
}

/// Rough guess assuming ~3 bytes per pixel and a 16:9 frame
pub fn estimate_from_size(size: u64) -> Option<ImageDimensions> {
    let estimate = (size as f64 / 3.0).sqrt();
    let width = (estimate * 16.0 / 9.0).round() as u32;
    let height = estimate.round() as u32;
    ImageDimensions::new(width, height)
}
