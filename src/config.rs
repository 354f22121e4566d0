//! Organizer settings and file filtering rules.
//!
//! Configuration is read from TOML. Every section and field is optional; an
//! empty file is the same as no file at all.
//!
//! ```toml
//! [organizer]
//! workers = 0                  # 0 = one worker per CPU
//! on_collision = "overwrite"   # or "rename"
//! follow_links = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db", ".DS_Store"]
//! patterns = ["**/node_modules/**"]
//! extensions = ["tmp", "part"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when no path is given.
pub const LOCAL_CONFIG_FILE: &str = ".cleanfolder.toml";

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] toml::de::Error),
    #[error("invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegexPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("cannot read configuration: {0}")]
    IoError(#[from] std::io::Error),
}

/// What to do when a normalized destination name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Append `_1`, `_2`, ... to the base name until it is free.
    Rename,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub organizer: OrganizerSettings,
    pub filters: FilterRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerSettings {
    /// Relocation worker threads; 0 lets rayon pick one per CPU.
    pub workers: usize,
    pub on_collision: CollisionPolicy,
    /// Walk into symlinked directories while scanning.
    pub follow_links: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub exclude: ExcludeRules,
    /// Whitelist; overrides the exclude rules.
    pub include: IncludeRules,
}

/// Rules for leaving files where they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact file names (e.g. "Thumbs.db").
    pub filenames: Vec<String>,
    /// Glob patterns matched against the path relative to the scanned root.
    pub patterns: Vec<String>,
    /// Extensions without the dot, case-insensitive.
    pub extensions: Vec<String>,
    /// Regexes matched against the file name.
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeRules {
    pub patterns: Vec<String>,
}

impl Config {
    /// Load configuration, falling back to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given (it must exist)
    /// 2. `.cleanfolder.toml` in the current directory
    /// 3. built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Compile the filter rules for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob pattern is invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter rules.
#[derive(Debug)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check whether a file should be organized.
    ///
    /// `file_path` is expected relative to the scanned root. Include
    /// patterns win; otherwise the file is dropped if its name, extension,
    /// path glob or name regex matches an exclude rule.
    pub fn should_include(&self, file_path: &Path) -> bool {
        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return true;
        }

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filters_from(toml: &str) -> CompiledFilters {
        Config::from_toml(toml)
            .expect("Failed to parse config")
            .compile()
            .expect("Failed to compile filters")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.organizer.workers, 0);
        assert_eq!(config.organizer.on_collision, CollisionPolicy::Overwrite);
        assert!(!config.organizer.follow_links);
    }

    #[test]
    fn test_default_filters_include_everything() {
        let compiled = Config::default().compile().expect("Failed to compile");
        assert!(compiled.should_include(Path::new(".DS_Store")));
        assert!(compiled.should_include(Path::new("a/b/c.txt")));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").expect("Failed to parse config");
        assert_eq!(config.organizer.on_collision, CollisionPolicy::Overwrite);
        assert!(config.filters.exclude.patterns.is_empty());
    }

    #[test]
    fn test_parse_organizer_section() {
        let config = Config::from_toml(
            r#"
            [organizer]
            workers = 4
            on_collision = "rename"
            follow_links = true
            "#,
        )
        .expect("Failed to parse config");

        assert_eq!(config.organizer.workers, 4);
        assert_eq!(config.organizer.on_collision, CollisionPolicy::Rename);
        assert!(config.organizer.follow_links);
    }

    #[test]
    fn test_unknown_collision_policy_is_rejected() {
        let result = Config::from_toml("[organizer]\non_collision = \"merge\"\n");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = filters_from("[filters.exclude]\nfilenames = [\"Thumbs.db\"]\n");
        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(!compiled.should_include(Path::new("sub/Thumbs.db")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions() {
        let compiled = filters_from("[filters.exclude]\nextensions = [\"bak\", \".tmp\"]\n");
        assert!(!compiled.should_include(Path::new("file.bak")));
        assert!(!compiled.should_include(Path::new("file.tmp")));
        assert!(!compiled.should_include(Path::new("file.BAK")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let compiled = filters_from(
            "[filters.exclude]\npatterns = [\"*.cache\", \"**/node_modules/**\"]\n",
        );
        assert!(!compiled.should_include(Path::new("file.cache")));
        assert!(!compiled.should_include(Path::new("node_modules/pkg/index.js")));
        assert!(!compiled.should_include(Path::new("web/node_modules/pkg/index.js")));
        assert!(compiled.should_include(Path::new("my_node_modules/index.js")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = filters_from("[filters.exclude]\nregex = ['^~\\$']\n");
        assert!(!compiled.should_include(Path::new("~$report.docx")));
        assert!(compiled.should_include(Path::new("report.docx")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = filters_from(
            r#"
            [filters.exclude]
            extensions = ["log"]

            [filters.include]
            patterns = ["keep.log"]
            "#,
        );
        assert!(compiled.should_include(Path::new("keep.log")));
        assert!(!compiled.should_include(Path::new("other.log")));
    }

    #[test]
    fn test_invalid_regex_returns_error() {
        let mut config = Config::default();
        config.filters.exclude.regex = vec!["[invalid(".to_string()];
        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_glob_pattern_returns_error() {
        let mut config = Config::default();
        config.filters.exclude.patterns = vec!["[invalid".to_string()];
        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "[organizer]\nworkers = 2\n").expect("Failed to write config");

        let config = Config::load(Some(&path)).expect("Failed to load config");
        assert_eq!(config.organizer.workers, 2);
    }

    #[test]
    fn test_load_missing_explicit_file_is_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = Config::load(Some(&temp_dir.path().join("missing.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }
}
