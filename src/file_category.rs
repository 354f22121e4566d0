//! File categorization by extension.
//!
//! Every file lands in exactly one of six categories. The extension table is
//! fixed and process-wide; anything it does not know goes to [`Category::Other`].
//!
//! # Examples
//!
//! ```
//! use cleanfolder::file_category::{classify, Category, Extension};
//!
//! let c = classify("holiday.JPG");
//! assert_eq!(c.category, Category::Image);
//! assert_eq!(c.extension, Extension::Known("JPG".to_string()));
//!
//! let c = classify("Makefile");
//! assert_eq!(c.category, Category::Other);
//! assert_eq!(c.extension, Extension::None);
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Represents a broad file category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Image files (JPEG, PNG, JPG, SVG)
    Image,
    /// Video files (AVI, MP4, MOV, MKV)
    Video,
    /// Document files (DOC, DOCX, TXT, PDF, XLSX, PPTX)
    Document,
    /// Audio files (MP3, OGG, WAV, AMR)
    Audio,
    /// Archive files (ZIP, GZ, TAR); these are unpacked rather than moved
    Archive,
    /// Unknown or extensionless files
    Other,
}

impl Category {
    /// All categories, in reporting order.
    pub const ALL: [Category; 6] = [
        Category::Image,
        Category::Video,
        Category::Document,
        Category::Audio,
        Category::Archive,
        Category::Other,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use cleanfolder::file_category::Category;
    ///
    /// assert_eq!(Category::Image.dir_name(), "images");
    /// assert_eq!(Category::Video.dir_name(), "video");
    /// assert_eq!(Category::Other.dir_name(), "other");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Image => "images",
            Category::Video => "video",
            Category::Document => "documents",
            Category::Audio => "audio",
            Category::Archive => "archives",
            Category::Other => "other",
        }
    }

    /// Returns true if `name` is one of the six category folder names.
    ///
    /// The scanner uses this to avoid walking into output of a previous run.
    pub fn is_category_dir(name: &str) -> bool {
        Self::ALL.iter().any(|c| c.dir_name() == name)
    }
}

/// Extension (uppercase, no dot) to category.
static CATEGORY_MAP: LazyLock<HashMap<&'static str, Category>> = LazyLock::new(|| {
    let table: [(&[&str], Category); 5] = [
        (&["JPEG", "PNG", "JPG", "SVG"], Category::Image),
        (&["AVI", "MP4", "MOV", "MKV"], Category::Video),
        (
            &["DOC", "DOCX", "TXT", "PDF", "XLSX", "PPTX"],
            Category::Document,
        ),
        (&["MP3", "OGG", "WAV", "AMR"], Category::Audio),
        (&["ZIP", "GZ", "TAR"], Category::Archive),
    ];

    table
        .iter()
        .flat_map(|(exts, category)| exts.iter().map(move |ext| (*ext, *category)))
        .collect()
});

/// What was learned about a file's extension during classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    /// The file name has no extension.
    None,
    /// A registered extension, uppercased.
    Known(String),
    /// A non-empty extension missing from the table, uppercased.
    Unknown(String),
}

impl Extension {
    /// The uppercased extension tag, or an empty string if there is none.
    pub fn tag(&self) -> &str {
        match self {
            Extension::None => "",
            Extension::Known(ext) | Extension::Unknown(ext) => ext,
        }
    }
}

/// Result of classifying one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub extension: Extension,
}

/// Looks up an extension (any case, no leading dot) in the category table.
///
/// # Examples
///
/// ```
/// use cleanfolder::file_category::{extension_to_category, Category};
///
/// assert_eq!(extension_to_category("pdf"), Some(Category::Document));
/// assert_eq!(extension_to_category("Mkv"), Some(Category::Video));
/// assert_eq!(extension_to_category("rs"), None);
/// ```
pub fn extension_to_category(ext: &str) -> Option<Category> {
    CATEGORY_MAP.get(ext.to_uppercase().as_str()).copied()
}

/// Classifies a file name by the text after its last dot.
///
/// Names without an extension, including dot-files such as `.bashrc` and
/// names ending in a bare dot, classify as [`Category::Other`] with
/// [`Extension::None`]. Unregistered extensions also go to `Other`, but are
/// reported as [`Extension::Unknown`].
pub fn classify(file_name: &str) -> Classification {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_uppercase())
        .unwrap_or_default();

    if ext.is_empty() {
        return Classification {
            category: Category::Other,
            extension: Extension::None,
        };
    }

    match CATEGORY_MAP.get(ext.as_str()) {
        Some(category) => Classification {
            category: *category,
            extension: Extension::Known(ext),
        },
        None => Classification {
            category: Category::Other,
            extension: Extension::Unknown(ext),
        },
    }
}
