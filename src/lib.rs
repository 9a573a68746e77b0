//! Photo Grouper - A CLI tool for sorting photos and videos into folders
//!
//! This library groups media files with support for:
//! - EXIF metadata extraction for JPEG images
//! - exiftool-based metadata extraction for RAW images
//! - FFprobe-based metadata extraction for videos
//! - Aspect ratio classification from metadata or image headers
//! - Collision-free copy/move with disk space and permission checks
//! - Parallel metadata resolution with Rayon

pub mod aspect;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod media;
pub mod metadata;
pub mod organize;
pub mod place;
pub mod plan;
pub mod project;
pub mod time;

pub use aspect::{AspectCategory, AspectResolver, ImageDimensions};
pub use cli::Cli;
pub use config::{Config, ConfigError, FileOperation};
pub use discovery::find_media_files;
pub use error::{Error, Result};
pub use media::{ExtensionSet, MediaFile};
pub use metadata::{MetadataProvider, Probe, Providers};
pub use organize::{CategoryCounts, OrganizationResult, Organizer};
pub use project::ProjectMapping;
pub use time::{DateResolver, ResolvedDate, date_key};
