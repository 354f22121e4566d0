//! cleanfolder - sort a folder tree into category subdirectories
//!
//! This library scans a directory tree, classifies files by extension,
//! transliterates their names to a filesystem-safe form, moves them into
//! category folders under the root, unpacks archives and removes the
//! directories that end up empty.

pub mod archive;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod normalize;
pub mod output;
pub mod prune;
pub mod scanner;

pub use config::{CollisionPolicy, CompiledFilters, Config, ConfigError};
pub use file_category::{Category, classify};
pub use file_organizer::{FileOrganizer, FileTask, Relocation};
pub use normalize::normalize;
pub use prune::prune_empty_dirs;
pub use scanner::{ScanResult, scan};

pub use cli::{CliOptions, RunMode, RunReport, organize_directory, run_cli};
