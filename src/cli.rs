//! Command-line orchestration for cleanfolder.
//!
//! A run has three strictly ordered phases:
//! - a single-threaded scan of the whole tree,
//! - relocation of every file on a bounded worker pool, joined before moving on,
//! - a single-threaded prune of directories left empty.

use crate::config::{Config, ConfigError};
use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, FileTask, Relocation};
use crate::output::OutputFormatter;
use crate::prune::prune_empty_dirs;
use crate::scanner::{ScanError, ScanOptions, ScanResult, scan};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Whether files are actually moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Organize,
    /// Scan and plan only; nothing on disk changes.
    DryRun,
}

/// Errors that abort a run before any file is touched.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot start relocation workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// A relocation that did not happen.
#[derive(Debug, Clone, Serialize)]
pub struct RelocationFailure {
    pub path: PathBuf,
    pub category: Category,
    pub reason: String,
}

/// Where a file would go, reported by dry runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: Category,
}

/// Everything that happened during one run.
///
/// The buckets in `scan` hold the paths as they were found, before any
/// file was moved.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub scan: ScanResult,
    pub relocations: Vec<Relocation>,
    pub planned: Vec<PlannedMove>,
    pub failures: Vec<RelocationFailure>,
    /// Directories removed by the prune pass.
    pub pruned: usize,
}

impl RunReport {
    fn new(root: PathBuf, scan: ScanResult, mode: RunMode) -> Self {
        Self {
            root,
            started_at: Utc::now(),
            dry_run: mode == RunMode::DryRun,
            scan,
            relocations: Vec::new(),
            planned: Vec::new(),
            failures: Vec::new(),
            pruned: 0,
        }
    }
}

/// Options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub dry_run: bool,
    /// Overrides `organizer.workers` from the configuration.
    pub jobs: Option<usize>,
    pub json: bool,
}

/// Runs the CLI: load configuration, organize, print the outcome.
///
/// # Examples
///
/// ```no_run
/// use cleanfolder::cli::{run_cli, CliOptions};
///
/// let options = CliOptions {
///     root: "/path/to/directory".into(),
///     ..Default::default()
/// };
/// match run_cli(&options) {
///     Ok(report) => println!("{} files relocated", report.relocations.len()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(options: &CliOptions) -> anyhow::Result<RunReport> {
    let mut config = Config::load(options.config_path.as_deref())?;
    if let Some(jobs) = options.jobs {
        config.organizer.workers = jobs;
    }
    let mode = if options.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Organize
    };

    if !options.json {
        if options.dry_run {
            OutputFormatter::dry_run_notice(&format!(
                "Analyzing contents of: {}",
                options.root.display()
            ));
        } else {
            OutputFormatter::info(&format!(
                "Organizing contents of: {}",
                options.root.display()
            ));
        }
    }

    let progress = if options.json {
        ProgressBar::hidden()
    } else {
        OutputFormatter::create_progress_bar(0)
    };
    let report = organize_directory_with_progress(&options.root, &config, mode, &progress)?;
    progress.finish_and_clear();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        OutputFormatter::report(&report);
    }
    Ok(report)
}

/// Organizes `root` without progress output.
///
/// See [`organize_directory_with_progress`].
pub fn organize_directory(
    root: &Path,
    config: &Config,
    mode: RunMode,
) -> Result<RunReport, OrganizeError> {
    organize_directory_with_progress(root, config, mode, &ProgressBar::hidden())
}

/// Scans, relocates and prunes `root`.
///
/// Per-file failures do not abort the run; they are logged and collected in
/// [`RunReport::failures`]. Pruning starts only after every relocation task
/// has finished.
pub fn organize_directory_with_progress(
    root: &Path,
    config: &Config,
    mode: RunMode,
    progress: &ProgressBar,
) -> Result<RunReport, OrganizeError> {
    let filters = config.compile()?;
    let root = fs::canonicalize(root).map_err(|source| ScanError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;

    let options = ScanOptions {
        follow_links: config.organizer.follow_links,
        filters: Some(&filters),
    };
    let scan_result = scan(&root, &options)?;

    let tasks: Vec<FileTask> = scan_result
        .files()
        .map(|(path, category)| FileTask::new(path, category))
        .collect();
    let organizer = FileOrganizer::new(&root, config.organizer.on_collision);
    let mut report = RunReport::new(root.clone(), scan_result, mode);

    if mode == RunMode::DryRun {
        for task in tasks {
            match organizer.plan(&task) {
                Ok(destination) => report.planned.push(PlannedMove {
                    source: task.source,
                    destination,
                    category: task.category,
                }),
                Err(e) => report.failures.push(RelocationFailure {
                    path: task.source,
                    category: task.category,
                    reason: e.to_string(),
                }),
            }
        }
        return Ok(report);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.organizer.workers)
        .thread_name(|i| format!("relocate-{i}"))
        .build()?;

    info!(
        "Relocating {} files on {} workers",
        tasks.len(),
        pool.current_num_threads()
    );
    progress.set_length(tasks.len() as u64);

    let outcomes: Vec<_> = pool.install(|| {
        tasks
            .into_par_iter()
            .map(|task| {
                let outcome = organizer.relocate(&task);
                progress.inc(1);
                (task, outcome)
            })
            .collect()
    });

    for (task, outcome) in outcomes {
        match outcome {
            Ok(relocation) => report.relocations.push(relocation),
            Err(e) => {
                warn!("{}", e);
                report.failures.push(RelocationFailure {
                    path: task.source,
                    category: task.category,
                    reason: e.to_string(),
                });
            }
        }
    }

    report.pruned = prune_empty_dirs(&root);
    info!(
        "Relocated {} files, {} failed, pruned {} folders",
        report.relocations.len(),
        report.failures.len(),
        report.pruned
    );

    Ok(report)
}
