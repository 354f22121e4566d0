//! Recursive tree scanner.
//!
//! Walks the root depth-first, sorting every file into one of the six
//! category buckets and recording the subdirectories it passed through.
//! Directories named like a category folder are skipped at any depth so a
//! second run does not pick up the output of the first one.

use crate::config::CompiledFilters;
use crate::file_category::{Category, Extension, classify};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Fatal scan errors. Problems below the root are recorded in
/// [`ScanResult::errors`] instead.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("folder {path} does not exist: {source}")]
    RootNotFound {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot read folder {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A directory below the root that could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub path: Option<PathBuf>,
    pub reason: String,
}

/// Everything a scan found, grouped by category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub images: Vec<PathBuf>,
    pub video: Vec<PathBuf>,
    pub documents: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    pub archives: Vec<PathBuf>,
    pub other: Vec<PathBuf>,
    /// Registered extensions that were seen, uppercased.
    pub known_extensions: BTreeSet<String>,
    /// Unregistered extensions that were seen, uppercased.
    pub unknown_extensions: BTreeSet<String>,
    /// Non-category directories, in walk order.
    pub folders: Vec<PathBuf>,
    pub errors: Vec<ScanFailure>,
    /// Files skipped by the configured filters.
    pub excluded: usize,
}

impl ScanResult {
    pub fn bucket(&self, category: Category) -> &[PathBuf] {
        match category {
            Category::Image => &self.images,
            Category::Video => &self.video,
            Category::Document => &self.documents,
            Category::Audio => &self.audio,
            Category::Archive => &self.archives,
            Category::Other => &self.other,
        }
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Vec<PathBuf> {
        match category {
            Category::Image => &mut self.images,
            Category::Video => &mut self.video,
            Category::Document => &mut self.documents,
            Category::Audio => &mut self.audio,
            Category::Archive => &mut self.archives,
            Category::Other => &mut self.other,
        }
    }

    /// Total number of files across all buckets.
    pub fn file_count(&self) -> usize {
        Category::ALL.iter().map(|c| self.bucket(*c).len()).sum()
    }

    /// Every file paired with its category, in reporting order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, Category)> {
        Category::ALL.into_iter().flat_map(move |category| {
            self.bucket(category)
                .iter()
                .map(move |path| (path.as_path(), category))
        })
    }

    fn record_file(&mut self, path: PathBuf, file_name: &str) {
        let classification = classify(file_name);
        match classification.extension {
            Extension::Known(ext) => {
                self.known_extensions.insert(ext);
            }
            Extension::Unknown(ext) => {
                self.unknown_extensions.insert(ext);
            }
            Extension::None => {}
        }
        debug!(
            "{} -> {}",
            path.display(),
            classification.category.dir_name()
        );
        self.bucket_mut(classification.category).push(path);
    }
}

/// Knobs for a single scan.
#[derive(Debug, Default)]
pub struct ScanOptions<'a> {
    pub follow_links: bool,
    pub filters: Option<&'a CompiledFilters>,
}

fn is_skipped_category_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && Category::is_category_dir(&entry.file_name().to_string_lossy())
}

/// Scans `root` and buckets every file below it.
///
/// # Errors
///
/// Fails only if the root itself is missing, not a directory or unreadable.
/// Unreadable subdirectories are logged and collected in
/// [`ScanResult::errors`]; the rest of the tree is still scanned.
pub fn scan(root: &Path, options: &ScanOptions<'_>) -> Result<ScanResult, ScanError> {
    let metadata = fs::metadata(root).map_err(|source| ScanError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    info!("Scanning {}", root.display());

    let mut result = ScanResult::default();
    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_category_dir(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                result.errors.push(ScanFailure {
                    path: e.path().map(Path::to_path_buf),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            result.folders.push(path.to_path_buf());
            continue;
        }

        if file_type.is_symlink() {
            // Only reached when links are not followed.
            match fs::metadata(path) {
                Ok(target) if target.is_file() => {}
                _ => {
                    debug!("Skipping link {}", path.display());
                    continue;
                }
            }
        } else if !file_type.is_file() {
            debug!("Skipping special file {}", path.display());
            continue;
        }

        if let Some(filters) = options.filters {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if !filters.should_include(relative) {
                debug!("Excluded by filters: {}", path.display());
                result.excluded += 1;
                continue;
            }
        }

        let file_name = entry.file_name().to_string_lossy();
        result.record_file(path.to_path_buf(), &file_name);
    }

    info!(
        "Scan found {} files in {} folders",
        result.file_count(),
        result.folders.len()
    );
    Ok(result)
}
