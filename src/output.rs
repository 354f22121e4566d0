//! Output formatting and styling module.
//!
//! All user-facing console output goes through here: colored status lines,
//! the relocation progress bar and the end-of-run report.

use crate::cli::RunReport;
use crate::file_category::Category;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cleanfolder::output::OutputFormatter;
    /// OutputFormatter::error("Failed to organize file");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for relocation.
    ///
    /// The length may be set later with [`ProgressBar::set_length`].
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a table of file counts per category, in the given order.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cleanfolder::output::OutputFormatter;
    ///
    /// OutputFormatter::summary_table(&[("documents", 15), ("images", 8)]);
    /// ```
    pub fn summary_table(rows: &[(&str, usize)]) {
        Self::header("SUMMARY");

        let width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8);
        let total: usize = rows.iter().map(|(_, count)| count).sum();

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in rows {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Prints the end-of-run report.
    ///
    /// File lists show the paths found by the scan, i.e. where the files
    /// were before they were moved.
    pub fn report(report: &RunReport) {
        Self::header("FILES BY CATEGORY");
        for category in Category::ALL {
            let files = report.scan.bucket(category);
            Self::plain(&format!("{} ({}):", category.dir_name().bold(), files.len()));
            for path in files {
                Self::plain(&format!("  {}", display_relative(&report.root, path)));
            }
        }

        Self::plain("");
        Self::plain(&format!(
            "Known extensions: {}",
            join_set(&report.scan.known_extensions)
        ));
        Self::plain(&format!(
            "Unknown extensions: {}",
            join_set(&report.scan.unknown_extensions)
        ));

        let rows: Vec<(&str, usize)> = Category::ALL
            .iter()
            .map(|c| (c.dir_name(), report.scan.bucket(*c).len()))
            .collect();
        Self::summary_table(&rows);

        if report.dry_run {
            Self::header("PLANNED MOVES");
            for planned in &report.planned {
                Self::dry_run_notice(&format!(
                    "{} -> {}",
                    display_relative(&report.root, &planned.source),
                    display_relative(&report.root, &planned.destination)
                ));
            }
        }

        if report.scan.excluded > 0 {
            Self::info(&format!(
                "{} {} left in place by filters",
                report.scan.excluded,
                plural(report.scan.excluded)
            ));
        }

        if !report.scan.errors.is_empty() {
            Self::warning(&format!(
                "{} folder(s) could not be read:",
                report.scan.errors.len()
            ));
            for failure in &report.scan.errors {
                Self::error(&failure.reason);
            }
        }

        if !report.failures.is_empty() {
            Self::warning(&format!(
                "{} {} could not be organized:",
                report.failures.len(),
                plural(report.failures.len())
            ));
            for failure in &report.failures {
                Self::error(&format!(
                    "{}: {}",
                    display_relative(&report.root, &failure.path),
                    failure.reason
                ));
            }
        }

        if report.dry_run {
            Self::success("Dry run complete. No files were modified.");
        } else {
            Self::success(&format!(
                "Organized {} {}, removed {} empty {}.",
                report.relocations.len(),
                plural(report.relocations.len()),
                report.pruned,
                if report.pruned == 1 { "folder" } else { "folders" }
            ));
        }
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

fn join_set(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        "-".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
