//! CLI argument parsing with clap

use crate::config::{Config, FileOperation};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Photo Grouper - Sort photos and videos into project folders
///
/// Groups media files by capture date into `YYYYMMDD_Project` folders, or
/// still images into Landscape/Portrait/Square folders, using EXIF, RAW and
/// video metadata with file system timestamps as the last resort.
#[derive(Parser, Debug)]
#[command(name = "photo-grouper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Start from the configuration of the last successful run
    #[arg(long, global = true, conflicts_with = "config")]
    pub last: bool,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Number of threads for metadata extraction (0 = auto)
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long, global = true)]
    pub json_log: bool,

    /// Directory for run logs (defaults to `Log` next to the executable)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the distinct capture dates found in a folder as JSON
    Dates {
        /// Folder to scan
        source: Option<PathBuf>,
    },

    /// Group files into `YYYYMMDD_Project` folders by capture date
    Group(GroupArgs),

    /// Group still images into Landscape, Portrait and Square folders
    Aspect(TransferArgs),

    /// Print a commented sample configuration file
    SampleConfig,
}

/// Folders and operation shared by the grouping commands
#[derive(Args, Debug)]
pub struct TransferArgs {
    /// Folder scanned recursively for media files
    pub source: Option<PathBuf>,

    /// Folder that receives the grouped folders
    pub destination: Option<PathBuf>,

    /// File operation mode
    #[arg(short = 'O', long, value_enum)]
    pub operation: Option<FileOperation>,

    /// Shorthand for `--operation move`
    #[arg(long = "move", conflicts_with = "operation")]
    pub move_files: bool,
}

impl TransferArgs {
    fn operation(&self) -> Option<FileOperation> {
        if self.move_files {
            Some(FileOperation::Move)
        } else {
            self.operation
        }
    }
}

#[derive(Args, Debug)]
pub struct GroupArgs {
    #[command(flatten)]
    pub transfer: TransferArgs,

    /// JSON file mapping `YYYYMMDD` dates to project names
    #[arg(short, long, conflicts_with = "name")]
    pub mapping: Option<PathBuf>,

    /// One project name for every date
    #[arg(long)]
    pub name: Option<String>,

    /// Keep original file names instead of prefixing the folder name
    #[arg(long)]
    pub no_rename: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Whether this command moves or copies files and so deserves a snapshot
    pub fn is_grouping(&self) -> bool {
        matches!(self.command, Command::Group(_) | Command::Aspect(_))
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.dry_run {
            config.dry_run = true;
        }

        match &self.command {
            Command::Dates { source } => {
                if let Some(source) = source {
                    config.source_folder = source.clone();
                }
            }
            Command::Group(args) => {
                apply_transfer(&args.transfer, &mut config);
                if let Some(ref name) = args.name {
                    config.project_name = Some(name.clone());
                }
                if args.no_rename {
                    config.rename_files = false;
                }
            }
            Command::Aspect(args) => apply_transfer(args, &mut config),
            Command::SampleConfig => {}
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}

fn apply_transfer(args: &TransferArgs, config: &mut Config) {
    if let Some(ref source) = args.source {
        config.source_folder = source.clone();
    }
    if let Some(ref destination) = args.destination {
        config.destination_folder = destination.clone();
    }
    if let Some(operation) = args.operation() {
        config.operation = operation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("photo-grouper").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_group_arguments() {
        let cli = parse(&["group", "in", "out", "--move", "--name", "Trip", "--no-rename", "-n"]);
        let config = cli.to_config();

        assert_eq!(config.source_folder, PathBuf::from("in"));
        assert_eq!(config.destination_folder, PathBuf::from("out"));
        assert_eq!(config.operation, FileOperation::Move);
        assert_eq!(config.project_name.as_deref(), Some("Trip"));
        assert!(!config.rename_files);
        assert!(config.dry_run);
        assert!(cli.is_grouping());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut file_config = Config::new("from-file", "dest-from-file");
        file_config.threads = 8;
        file_config.operation = FileOperation::Move;

        let cli = parse(&["aspect", "from-cli", "-O", "copy", "-t", "2"]);
        let config = cli.merge_with_config(file_config);

        assert_eq!(config.source_folder, PathBuf::from("from-cli"));
        assert_eq!(config.destination_folder, PathBuf::from("dest-from-file"));
        assert_eq!(config.operation, FileOperation::Copy);
        assert_eq!(config.threads, 2);
    }

    #[test]
    fn test_dates_and_global_flags() {
        let cli = parse(&["dates", "~/Pictures", "--verbose", "--log-dir", "/tmp/logs"]);
        assert!(cli.verbose);
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert!(!cli.is_grouping());
        assert_eq!(cli.to_config().source_folder, PathBuf::from("~/Pictures"));
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        let bad = [
            vec!["photo-grouper", "group", "a", "b", "--move", "-O", "copy"],
            vec!["photo-grouper", "group", "a", "b", "--mapping", "m.json", "--name", "x"],
            vec!["photo-grouper", "--last", "-C", "c.toml", "aspect"],
        ];
        for args in bad {
            assert!(Cli::try_parse_from(args).is_err());
        }
    }

    #[test]
    fn test_config_name() {
        let cli = parse(&["-C", "configs/holiday.toml", "sample-config"]);
        assert_eq!(cli.config_name().as_deref(), Some("holiday"));
    }
}
