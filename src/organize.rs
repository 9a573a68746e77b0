//! Run orchestration
//!
//! Handles the core logic of:
//! - Validating the configured folders
//! - Discovering media files
//! - Resolving dates or aspect categories in parallel
//! - Placing files one at a time in path order

use crate::aspect::{AspectCategory, AspectResolver};
use crate::config::Config;
use crate::discovery::{discover, expand_tilde};
use crate::error::{Error, Result};
use crate::media::{ExtensionSet, MediaFile};
use crate::metadata::Providers;
use crate::place::FileExecutor;
use crate::plan::{GroupKey, PlacementPlanner};
use crate::project::ProjectMapping;
use crate::time::{DateResolver, ResolvedDate};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, error, info, span};

/// Number of placed files per aspect category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub landscape: usize,
    pub portrait: usize,
    pub square: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: AspectCategory) -> usize {
        match category {
            AspectCategory::Landscape => self.landscape,
            AspectCategory::Portrait => self.portrait,
            AspectCategory::Square => self.square,
        }
    }

    fn increment(&mut self, category: AspectCategory) {
        match category {
            AspectCategory::Landscape => self.landscape += 1,
            AspectCategory::Portrait => self.portrait += 1,
            AspectCategory::Square => self.square += 1,
        }
    }
}

/// Outcome of a grouping run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationResult {
    pub success: bool,
    pub message: String,
    pub processed_files: usize,
    pub skipped_files: usize,
    pub failed_files: usize,
    /// Only set by aspect ratio grouping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<CategoryCounts>,
}

impl OrganizationResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            processed_files: 0,
            skipped_files: 0,
            failed_files: 0,
            categories: None,
        }
    }
}

/// Per-run counters, only touched by the sequential placement loop
#[derive(Debug, Default)]
struct RunStats {
    processed: usize,
    skipped: usize,
    failed: usize,
}

impl RunStats {
    fn summary(&self) -> String {
        format!(
            "Processed: {}, Skipped: {}, Failed: {}",
            self.processed, self.skipped, self.failed
        )
    }

    fn into_result(self, message: String, categories: Option<CategoryCounts>) -> OrganizationResult {
        OrganizationResult {
            success: true,
            message,
            processed_files: self.processed,
            skipped_files: self.skipped,
            failed_files: self.failed,
            categories,
        }
    }
}

/// What happened to one file
enum Placement {
    Placed,
    /// Left by an earlier run in its group folder under its final name
    AlreadyInPlace,
}

/// Groups the media files of one source folder into a destination folder
pub struct Organizer {
    config: Config,
    providers: Providers,
}

impl Organizer {
    pub fn new(config: Config, providers: Providers) -> Self {
        Self { config, providers }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Distinct dates of every media file in the source folder, sorted
    pub fn scan_dates(&self) -> Result<BTreeSet<NaiveDate>> {
        let _span = span!(Level::INFO, "scan_dates").entered();

        let source = self.source_folder()?;
        let files = self.discover(&source, &self.config.media_allow_list())?;
        let dates = self.resolve_dates(&files)?;

        let distinct: BTreeSet<NaiveDate> = dates.iter().map(|d| d.date).collect();
        info!(files = files.len(), dates = distinct.len(), "Scanned dates");
        Ok(distinct)
    }

    /// Place every media file in `{YYYYMMDD}_{project}` folders
    ///
    /// Files whose date has no entry in `mapping` are skipped.
    pub fn group_by_date(&self, mapping: &ProjectMapping) -> OrganizationResult {
        let _span = span!(Level::INFO, "group_by_date").entered();

        self.try_group_by_date(mapping).unwrap_or_else(|e| {
            error!(error = %e, "Date grouping failed");
            OrganizationResult::failure(e.to_string())
        })
    }

    /// Place every still image in `Landscape`, `Portrait` or `Square`
    pub fn group_by_aspect_ratio(&self) -> OrganizationResult {
        let _span = span!(Level::INFO, "group_by_aspect_ratio").entered();

        self.try_group_by_aspect_ratio().unwrap_or_else(|e| {
            error!(error = %e, "Aspect ratio grouping failed");
            OrganizationResult::failure(e.to_string())
        })
    }

    fn try_group_by_date(&self, mapping: &ProjectMapping) -> Result<OrganizationResult> {
        let source = self.source_folder()?;
        let destination = self.destination_folder()?;

        let files = self.discover(&source, &self.config.media_allow_list())?;
        if files.is_empty() {
            return Ok(RunStats::default().into_result(
                format!("No media files found in {}", source.display()),
                None,
            ));
        }
        let dates = self.resolve_dates(&files)?;

        let mut planner = PlacementPlanner::new(self.config.dry_run);
        let mut executor = FileExecutor::new(self.config.dry_run);
        let mut stats = RunStats::default();

        for (file, resolved) in files.iter().zip(&dates) {
            let Some(project) = mapping.get(resolved.date) else {
                debug!(path = ?file.path(), date = %resolved.key(), "No project for date, skipping");
                stats.skipped += 1;
                continue;
            };

            let key = GroupKey::Date {
                date: resolved.date,
                project: project.to_string(),
            };
            match self.place_file(
                &mut planner,
                &mut executor,
                &destination,
                &key,
                self.config.rename_files,
                file,
            ) {
                Ok(_) => stats.processed += 1,
                Err(e) => {
                    error!(path = ?file.path(), error = %e, "Failed to place file");
                    stats.failed += 1;
                }
            }
        }

        info!("{}", stats.summary());
        let message = self.summary_message(&stats, "date folders");
        Ok(stats.into_result(message, None))
    }

    fn try_group_by_aspect_ratio(&self) -> Result<OrganizationResult> {
        let source = self.source_folder()?;
        let destination = self.destination_folder()?;

        let files = self.discover(&source, &self.config.image_allow_list())?;
        if files.is_empty() {
            return Ok(RunStats::default().into_result(
                format!("No images found in {}", source.display()),
                Some(CategoryCounts::default()),
            ));
        }

        let resolver = AspectResolver::new(&self.config, &self.providers);
        let categories: Vec<AspectCategory> = self
            .thread_pool()?
            .install(|| files.par_iter().map(|f| resolver.resolve(f).category()).collect());

        let mut planner = PlacementPlanner::new(self.config.dry_run);
        let mut executor = FileExecutor::new(self.config.dry_run);
        let mut stats = RunStats::default();
        let mut counts = CategoryCounts::default();

        for (file, category) in files.iter().zip(categories) {
            // Category folders never take a name prefix
            match self.place_file(
                &mut planner,
                &mut executor,
                &destination,
                &GroupKey::Aspect(category),
                false,
                file,
            ) {
                Ok(_) => {
                    stats.processed += 1;
                    counts.increment(category);
                }
                Err(e) => {
                    error!(path = ?file.path(), error = %e, "Failed to place file");
                    stats.failed += 1;
                }
            }
        }

        info!(
            landscape = counts.landscape,
            portrait = counts.portrait,
            square = counts.square,
            "{}",
            stats.summary()
        );
        let message = self.summary_message(&stats, "aspect ratio folders");
        Ok(stats.into_result(message, Some(counts)))
    }

    fn place_file(
        &self,
        planner: &mut PlacementPlanner,
        executor: &mut FileExecutor,
        destination: &Path,
        key: &GroupKey,
        rename: bool,
        file: &MediaFile,
    ) -> Result<Placement> {
        if planner.already_placed(destination, key, rename, file.path()) {
            debug!(path = ?file.path(), "Already in place");
            return Ok(Placement::AlreadyInPlace);
        }
        let target = planner.plan_destination(destination, key, rename, file.name())?;
        executor.place(file.path(), &target, self.config.operation)?;
        Ok(Placement::Placed)
    }

    fn discover(&self, source: &Path, allowed: &ExtensionSet) -> Result<Vec<MediaFile>> {
        info!(?source, "Scanning source folder...");
        let files = discover(source, allowed)?;
        info!(count = files.len(), "Found media files");
        Ok(files)
    }

    fn resolve_dates(&self, files: &[MediaFile]) -> Result<Vec<ResolvedDate>> {
        let resolver = DateResolver::new(&self.config, &self.providers);
        Ok(self
            .thread_pool()?
            .install(|| files.par_iter().map(|f| resolver.resolve(f)).collect()))
    }

    /// Pool for metadata resolution; `threads == 0` lets rayon decide
    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| Error::Config(format!("cannot start worker threads: {}", e)))
    }

    fn source_folder(&self) -> Result<PathBuf> {
        let source = expand_tilde(&self.config.source_folder);
        if source.as_os_str().is_empty() || !source.is_dir() {
            return Err(Error::SourceNotFound(source));
        }
        Ok(source)
    }

    fn destination_folder(&self) -> Result<PathBuf> {
        let destination = expand_tilde(&self.config.destination_folder);
        if destination.as_os_str().is_empty() {
            return Err(Error::Config("destination folder is not set".into()));
        }
        Ok(std::path::absolute(&destination)?)
    }

    fn summary_message(&self, stats: &RunStats, target: &str) -> String {
        let verb = if self.config.dry_run {
            format!("Would {}", self.config.operation.verb())
        } else {
            capitalize(self.config.operation.verb())
        };
        format!(
            "{} {} files into {} ({} skipped, {} failed)",
            verb, stats.processed, target, stats.skipped, stats.failed
        )
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
