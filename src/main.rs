//! Photo Grouper - Sort photos and videos into project folders
//!
//! A CLI tool that groups media files by capture date or aspect ratio,
//! reading EXIF, RAW and video metadata with file system timestamps as the
//! last resort.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use photo_grouper::cli::{Command, GroupArgs};
use photo_grouper::{Cli, Config, OrganizationResult, Organizer, ProjectMapping, Providers, date_key};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Print a centered title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold(),
            title.bold(),
            "╗".bold(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_success(msg: &str) {
        let _ = stdout().execute(Print(style("✓ ").with(CliTheme::SUCCESS).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Print a labelled count
    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::SampleConfig = cli.command {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Photo Grouper starting");

    let config = load_config(&cli, &exe_dir)?;
    if cli.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let organizer = Organizer::new(config, Providers::system());

    let result = match &cli.command {
        Command::Dates { .. } => return print_dates(&organizer),
        Command::Group(args) => {
            let mapping = select_mapping(&organizer, args)?;
            organizer.group_by_date(&mapping)
        }
        Command::Aspect(_) => organizer.group_by_aspect_ratio(),
        Command::SampleConfig => return Ok(()),
    };

    print_summary(&result, &log_path);

    if !result.success {
        anyhow::bail!("{}", result.message);
    }

    if cli.is_grouping()
        && let Err(e) = organizer.config().save_last_used()
    {
        warn!(error = %e, "Could not save last used configuration");
    }

    info!(log_file = %log_path.display(), "Processing complete. Log saved to");
    Ok(())
}

/// `dates`: print sorted distinct dates as a JSON array
fn print_dates(organizer: &Organizer) -> Result<()> {
    match organizer.scan_dates() {
        Ok(dates) => {
            let keys: Vec<String> = dates.into_iter().map(date_key).collect();
            println!("{}", serde_json::to_string_pretty(&keys)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Date scan failed");
            Err(e.into())
        }
    }
}

/// Project names for `group`: a mapping file, one shared name, or generated names
fn select_mapping(organizer: &Organizer, args: &GroupArgs) -> Result<ProjectMapping> {
    let config = organizer.config();
    let max_len = config.max_project_name_length;

    if let Some(ref path) = args.mapping {
        info!(mapping = %path.display(), "Loading project mapping");
        return ProjectMapping::load_json(path, max_len)
            .with_context(|| format!("cannot use mapping file {}", path.display()));
    }

    // Mapping entries are needed per date, so dates are scanned first
    let dates = match organizer.scan_dates() {
        Ok(dates) => dates,
        Err(e) => {
            // Let the grouping run report the failure
            warn!(error = %e, "Could not scan dates");
            return Ok(ProjectMapping::new());
        }
    };

    match config.project_name {
        Some(ref name) => Ok(ProjectMapping::uniform(&dates, name, max_len)?),
        None => Ok(ProjectMapping::auto(&dates)),
    }
}

fn print_summary(result: &OrganizationResult, log_path: &Path) {
    use cli_output::*;

    print_separator();
    print_title("Processing Complete");
    print_separator();

    print_blank();
    if result.success {
        print_success(&result.message);
    } else {
        print_error(&result.message);
    }
    print_blank();
    print_stat("Processed", &result.processed_files.to_string(), CliTheme::SUCCESS);
    print_stat("Skipped", &result.skipped_files.to_string(), CliTheme::WARNING);
    print_stat("Failed", &result.failed_files.to_string(), CliTheme::ERROR);

    if let Some(counts) = result.categories {
        print_blank();
        print_stat("Landscape", &counts.landscape.to_string(), CliTheme::ACCENT);
        print_stat("Portrait", &counts.portrait.to_string(), CliTheme::ACCENT);
        print_stat("Square", &counts.square.to_string(), CliTheme::ACCENT);
    }
    print_blank();

    if result.skipped_files > 0 {
        print_warning("Files without a project name for their date were skipped");
    }

    print_separator();
    print_log_path(&log_path.display().to_string());
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = cli.log_dir.clone().unwrap_or_else(|| exe_dir.join("Log"));
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("CLIRun_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax
///
/// `-C holiday` finds `holiday`, `holiday.toml`, or `Config/holiday.toml`
/// next to the executable.
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file, last used snapshot, or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else if cli.last {
        match Config::load_last_used()? {
            Some(last) => {
                info!("Loading last used configuration");
                cli.merge_with_config(last)
            }
            None => {
                warn!("No last used configuration found, using defaults");
                cli.to_config()
            }
        }
    } else {
        cli.to_config()
    };

    if config.source_folder.as_os_str().is_empty() {
        anyhow::bail!("No source folder given. Pass one on the command line or in a config file.");
    }
    if cli.is_grouping() && config.destination_folder.as_os_str().is_empty() {
        anyhow::bail!("No destination folder given. Pass one on the command line or in a config file.");
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(Some(guard))
}
