//! Configuration types for the photo grouper

use crate::media::ExtensionSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Copy files to destination
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

impl FileOperation {
    pub fn verb(&self) -> &'static str {
        match self {
            FileOperation::Copy => "copy",
            FileOperation::Move => "move",
        }
    }
}

/// Configuration for the photo grouper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder scanned (recursively) for media files
    pub source_folder: PathBuf,

    /// Folder that receives the grouped folders, may equal the source
    pub destination_folder: PathBuf,

    /// Copy or move
    pub operation: FileOperation,

    /// Prefix placed files with their folder name (date grouping only)
    pub rename_files: bool,

    /// Name used for every date when no mapping is supplied
    pub project_name: Option<String>,

    /// Maximum length of a project name
    pub max_project_name_length: usize,

    /// Number of threads for metadata resolution (0 = auto)
    pub threads: usize,

    /// Dry run mode - don't actually move/copy files
    pub dry_run: bool,

    /// JPEG extensions, read through embedded EXIF
    pub jpeg_extensions: ExtensionSet,

    /// Other still image extensions
    pub image_extensions: ExtensionSet,

    /// RAW extensions, read through exiftool
    pub raw_extensions: ExtensionSet,

    /// Video extensions, read through ffprobe
    pub video_extensions: ExtensionSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::new(),
            destination_folder: PathBuf::new(),
            operation: FileOperation::default(),
            rename_files: true,
            project_name: None,
            max_project_name_length: 50,
            threads: 0,
            dry_run: false,
            jpeg_extensions: ["jpg", "jpeg"].into_iter().collect(),
            image_extensions: ["png", "gif", "bmp", "webp", "tif", "tiff", "heic"]
                .into_iter()
                .collect(),
            raw_extensions: ["raf", "raw", "cr2", "nef", "arw", "gpr", "dng", "orf", "rw2"]
                .into_iter()
                .collect(),
            video_extensions: ["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "m4v"]
                .into_iter()
                .collect(),
        }
    }
}

impl Config {
    /// Build a configuration for a source/destination pair with defaults elsewhere
    pub fn new(source_folder: impl Into<PathBuf>, destination_folder: impl Into<PathBuf>) -> Self {
        Self {
            source_folder: source_folder.into(),
            destination_folder: destination_folder.into(),
            ..Self::default()
        }
    }

    /// Check if a file extension is a JPEG-type image
    pub fn is_jpeg(&self, ext: &str) -> bool {
        self.jpeg_extensions.contains(ext)
    }

    /// Check if a file extension is a supported RAW format
    pub fn is_raw(&self, ext: &str) -> bool {
        self.raw_extensions.contains(ext)
    }

    /// Check if a file extension is a supported video format
    pub fn is_video(&self, ext: &str) -> bool {
        self.video_extensions.contains(ext)
    }

    /// Allow-list for the aspect ratio workflow: still images only
    pub fn image_allow_list(&self) -> ExtensionSet {
        self.jpeg_extensions
            .union(&self.image_extensions)
            .union(&self.raw_extensions)
    }

    /// Allow-list for the date workflow: every supported media type
    pub fn media_allow_list(&self) -> ExtensionSet {
        self.image_allow_list().union(&self.video_extensions)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Location of the "last used" snapshot, if the platform has a config directory
    pub fn last_used_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("photo-grouper").join("last_used.toml"))
    }

    /// Load the last used configuration, `None` when no snapshot exists
    pub fn load_last_used() -> Result<Option<Self>, ConfigError> {
        match Self::last_used_path() {
            Some(path) if path.exists() => Self::load_from_file(path).map(Some),
            _ => Ok(None),
        }
    }

    /// Store this configuration verbatim as the last used snapshot
    pub fn save_last_used(&self) -> Result<(), ConfigError> {
        match Self::last_used_path() {
            Some(path) => self.save_to_file(path),
            None => Ok(()),
        }
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Grouper Configuration File
# This file uses TOML format (https://toml.io)

# Folder scanned recursively for photos and videos
source_folder = "~/Pictures/Import"

# Folder that receives the grouped folders (may be the same as the source)
destination_folder = "~/Pictures/Sorted"

# File operation: "copy" or "move"
operation = "copy"

# Date grouping: prefix each file with its folder name,
# e.g. 20240315_Trip/20240315_Trip_IMG_0001.jpg
# Aspect ratio grouping never renames.
rename_files = true

# Project name used for every date when no mapping file is given
# project_name = "Trip"

# Maximum length of a project name
max_project_name_length = 50

# Number of threads for metadata extraction (0 = auto-detect)
threads = 0

# Dry run mode - show what would be done without actually doing it
dry_run = false

# Supported file extensions (customize as needed)
jpeg_extensions = ["jpg", "jpeg"]
image_extensions = ["png", "gif", "bmp", "webp", "tif", "tiff", "heic"]
raw_extensions = ["raf", "raw", "cr2", "nef", "arw", "gpr", "dng", "orf", "rw2"]
video_extensions = ["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm", "m4v"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
