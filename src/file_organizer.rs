//! Relocation of scanned files into category folders.
//!
//! Every file is renamed to its normalized form and moved under
//! `<root>/<category>/`. Archives are unpacked into a subfolder of
//! `<root>/archives/` instead, and the archive itself is deleted once
//! extraction succeeds.

use crate::archive::{self, ArchiveFormat, ExtractError};
use crate::config::CollisionPolicy;
use crate::file_category::Category;
use crate::normalize::normalize;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A file waiting to be relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub source: PathBuf,
    pub category: Category,
}

impl FileTask {
    pub fn new(source: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            source: source.into(),
            category,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelocationKind {
    Moved,
    Extracted,
}

/// A completed relocation.
#[derive(Debug, Clone, Serialize)]
pub struct Relocation {
    pub source: PathBuf,
    /// The moved file, or the folder an archive was unpacked into.
    pub destination: PathBuf,
    pub category: Category,
    pub kind: RelocationKind,
}

/// Errors that can occur while relocating a single file.
#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("failed to extract {}: {source}", archive.display())]
    Extraction {
        archive: PathBuf,
        source: ExtractError,
    },
    #[error("extracted {} but could not remove it: {source}", archive.display())]
    RemoveArchive { archive: PathBuf, source: io::Error },
}

pub type RelocateResult<T> = Result<T, RelocateError>;

/// Moves files into category folders under a fixed root.
///
/// Shared by all relocation workers. Mutable state is the set of
/// destinations reserved under [`CollisionPolicy::Rename`] and one lock per
/// extraction folder, so archives that share a folder never unpack at the
/// same time.
#[derive(Debug)]
pub struct FileOrganizer {
    root: PathBuf,
    policy: CollisionPolicy,
    reserved: Mutex<HashSet<PathBuf>>,
    folder_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Derives the extraction folder name for an archive file name.
///
/// Every `.zip`, `.gz` and `.tar` occurrence is removed before normalizing,
/// so `backup.tar.gz` unpacks into `backup`.
///
/// # Examples
///
/// ```
/// use cleanfolder::file_organizer::archive_folder_name;
///
/// assert_eq!(archive_folder_name("backup.tar.gz"), "backup");
/// assert_eq!(archive_folder_name("Фото.zip"), "Foto");
/// assert_eq!(archive_folder_name("notes.txt.gz"), "notes.txt");
/// ```
pub fn archive_folder_name(file_name: &str) -> String {
    let stripped = file_name
        .replace(".zip", "")
        .replace(".gz", "")
        .replace(".tar", "");
    let name = normalize(&stripped);
    match name.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}

fn file_name_of(path: &Path) -> RelocateResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| RelocateError::NoFileName(path.to_path_buf()))
}

/// Inserts `_<n>` before the first dot of a normalized name.
fn numbered(name: &str, n: usize) -> String {
    match name.split_once('.') {
        Some((base, suffix)) => format!("{base}_{n}.{suffix}"),
        None => format!("{name}_{n}"),
    }
}

impl FileOrganizer {
    pub fn new(root: impl Into<PathBuf>, policy: CollisionPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            reserved: Mutex::new(HashSet::new()),
            folder_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relocates one task, dispatching archives to [`Self::relocate_archive`].
    pub fn relocate(&self, task: &FileTask) -> RelocateResult<Relocation> {
        match task.category {
            Category::Archive => self.relocate_archive(&task.source, task.category),
            category => self.relocate_file(&task.source, category),
        }
    }

    /// Computes where a task would end up, without touching the filesystem.
    ///
    /// Collision renaming is not simulated.
    pub fn plan(&self, task: &FileTask) -> RelocateResult<PathBuf> {
        let file_name = file_name_of(&task.source)?;
        let category_path = self.root.join(task.category.dir_name());
        Ok(match task.category {
            Category::Archive => category_path.join(archive_folder_name(&file_name)),
            _ => category_path.join(normalize(&file_name)),
        })
    }

    /// Creates `<root>/<category>` if it does not exist yet.
    ///
    /// Safe to call from many workers at once.
    fn ensure_category_dir(&self, category: Category) -> RelocateResult<PathBuf> {
        let category_path = self.root.join(category.dir_name());
        fs::create_dir_all(&category_path).map_err(|source| RelocateError::CreateDir {
            path: category_path.clone(),
            source,
        })?;
        Ok(category_path)
    }

    fn destination_for(&self, dir: &Path, name: &str) -> PathBuf {
        let candidate = dir.join(name);
        if self.policy == CollisionPolicy::Overwrite {
            return candidate;
        }

        let mut reserved = self.reserved.lock();
        let mut destination = candidate;
        let mut n = 0;
        while destination.exists() || reserved.contains(&destination) {
            n += 1;
            destination = dir.join(numbered(name, n));
        }
        reserved.insert(destination.clone());
        destination
    }

    fn folder_lock(&self, folder: &Path) -> Arc<Mutex<()>> {
        Arc::clone(
            self.folder_locks
                .lock()
                .entry(folder.to_path_buf())
                .or_default(),
        )
    }

    /// Moves a file into its category folder under its normalized name.
    ///
    /// Under [`CollisionPolicy::Overwrite`] an existing file with the same
    /// name is replaced.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cleanfolder::config::CollisionPolicy;
    /// use cleanfolder::file_category::Category;
    /// use cleanfolder::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let organizer = FileOrganizer::new("/path/to/base", CollisionPolicy::Overwrite);
    /// match organizer.relocate_file(Path::new("/path/to/base/Звіт.pdf"), Category::Document) {
    ///     Ok(r) => println!("Moved to {}", r.destination.display()),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn relocate_file(&self, path: &Path, category: Category) -> RelocateResult<Relocation> {
        let category_path = self.ensure_category_dir(category)?;
        let file_name = file_name_of(path)?;
        let destination = self.destination_for(&category_path, &normalize(&file_name));

        fs::rename(path, &destination).map_err(|source| RelocateError::Move {
            from: path.to_path_buf(),
            to: destination.clone(),
            source,
        })?;
        debug!("Moved {} -> {}", path.display(), destination.display());

        Ok(Relocation {
            source: path.to_path_buf(),
            destination,
            category,
            kind: RelocationKind::Moved,
        })
    }

    /// Unpacks an archive into `<root>/<category>/<name>/` and deletes it.
    ///
    /// If extraction fails the archive stays where it is and a folder
    /// created by this call is removed again, partial output included.
    /// Archives mapping to the same folder are extracted one at a time.
    pub fn relocate_archive(&self, path: &Path, category: Category) -> RelocateResult<Relocation> {
        let category_path = self.ensure_category_dir(category)?;
        let file_name = file_name_of(path)?;
        let folder = category_path.join(archive_folder_name(&file_name));

        let lock = self.folder_lock(&folder);
        let _guard = lock.lock();

        let existed = folder.is_dir();
        fs::create_dir_all(&folder).map_err(|source| RelocateError::CreateDir {
            path: folder.clone(),
            source,
        })?;

        let format: ArchiveFormat = match archive::extract(path, &folder) {
            Ok(format) => format,
            Err(source) => {
                if !existed && let Err(e) = archive::remove_partial(&folder) {
                    warn!("Could not clean up {}: {}", folder.display(), e);
                }
                return Err(RelocateError::Extraction {
                    archive: path.to_path_buf(),
                    source,
                });
            }
        };

        fs::remove_file(path).map_err(|source| RelocateError::RemoveArchive {
            archive: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Extracted {} ({:?}) -> {}",
            path.display(),
            format,
            folder.display()
        );

        Ok(Relocation {
            source: path.to_path_buf(),
            destination: folder,
            category,
            kind: RelocationKind::Extracted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn overwrite(root: &Path) -> FileOrganizer {
        FileOrganizer::new(root, CollisionPolicy::Overwrite)
    }

    #[test]
    fn test_relocate_file_creates_directory_and_normalizes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let file_path = base_path.join("Привіт.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");

        let relocation = overwrite(base_path)
            .relocate_file(&file_path, Category::Document)
            .expect("Failed to move file");

        let moved_file = base_path.join("documents").join("Pryvit.txt");
        assert_eq!(relocation.destination, moved_file);
        assert_eq!(relocation.kind, RelocationKind::Moved);
        assert!(!file_path.exists());
        assert_eq!(fs::read_to_string(moved_file).unwrap(), "test content");
    }

    #[test]
    fn test_relocate_file_uses_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("images")).expect("Failed to create category directory");
        let file_path = base_path.join("test.png");
        fs::write(&file_path, "png").expect("Failed to write test file");

        overwrite(base_path)
            .relocate_file(&file_path, Category::Image)
            .expect("Failed to move file");

        assert!(base_path.join("images/test.png").exists());
    }

    #[test]
    fn test_overwrite_replaces_existing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("documents")).unwrap();
        fs::write(base_path.join("documents/a_b.txt"), "old").unwrap();
        let file_path = base_path.join("a b.txt");
        fs::write(&file_path, "new").unwrap();

        overwrite(base_path)
            .relocate_file(&file_path, Category::Document)
            .expect("Failed to move file");

        assert_eq!(
            fs::read_to_string(base_path.join("documents/a_b.txt")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_rename_policy_keeps_both_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("documents")).unwrap();
        fs::write(base_path.join("documents/a_b.txt"), "old").unwrap();
        let first = base_path.join("a b.txt");
        let second = base_path.join("a-b.txt");
        fs::write(&first, "first").unwrap();
        fs::write(&second, "second").unwrap();

        let organizer = FileOrganizer::new(base_path, CollisionPolicy::Rename);
        let r1 = organizer.relocate_file(&first, Category::Document).unwrap();
        let r2 = organizer.relocate_file(&second, Category::Document).unwrap();

        assert_eq!(r1.destination, base_path.join("documents/a_b_1.txt"));
        assert_eq!(r2.destination, base_path.join("documents/a_b_2.txt"));
        assert_eq!(
            fs::read_to_string(base_path.join("documents/a_b.txt")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_numbered() {
        assert_eq!(numbered("photo.tar.gz", 3), "photo_3.tar.gz");
        assert_eq!(numbered("README", 1), "README_1");
    }

    #[test]
    fn test_archive_folder_name() {
        assert_eq!(archive_folder_name("data.zip"), "data");
        assert_eq!(archive_folder_name("data.tar"), "data");
        assert_eq!(archive_folder_name("my.zipper.zip"), "myper");
        assert_eq!(archive_folder_name("UPPER.ZIP"), "UPPER.ZIP");
        assert_eq!(archive_folder_name(".zip"), "_");
    }

    #[test]
    fn test_archive_folder_name_never_escapes() {
        assert_eq!(archive_folder_name("..zip"), "_");
        assert_eq!(archive_folder_name("...zip"), "_");
        assert_eq!(archive_folder_name("..tar.gz"), "_");
    }

    #[test]
    fn test_relocate_archive_extracts_and_removes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let archive_path = base_path.join("пакет.zip");
        {
            let mut writer = zip::ZipWriter::new(fs::File::create(&archive_path).unwrap());
            writer
                .start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"inside").unwrap();
            writer.finish().unwrap();
        }

        let relocation = overwrite(base_path)
            .relocate(&FileTask::new(&archive_path, Category::Archive))
            .expect("Extraction failed");

        let folder = base_path.join("archives/paket");
        assert_eq!(relocation.destination, folder);
        assert_eq!(relocation.kind, RelocationKind::Extracted);
        assert!(!archive_path.exists());
        assert_eq!(
            fs::read_to_string(folder.join("readme.txt")).unwrap(),
            "inside"
        );
    }

    #[test]
    fn test_corrupt_archive_is_left_in_place() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let archive_path = base_path.join("broken.zip");
        fs::write(&archive_path, b"not a zip").unwrap();

        let result = overwrite(base_path).relocate_archive(&archive_path, Category::Archive);

        assert!(matches!(result, Err(RelocateError::Extraction { .. })));
        assert!(archive_path.exists());
        assert!(!base_path.join("archives/broken").exists());
    }

    #[test]
    fn test_failed_extraction_keeps_preexisting_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir_all(base_path.join("archives/broken")).unwrap();
        fs::write(base_path.join("archives/broken/earlier.txt"), "keep").unwrap();
        let archive_path = base_path.join("broken.zip");
        fs::write(&archive_path, b"not a zip").unwrap();

        let result = overwrite(base_path).relocate_archive(&archive_path, Category::Archive);

        assert!(result.is_err());
        assert!(base_path.join("archives/broken/earlier.txt").exists());
    }

    fn truncated_gzip(path: &Path) {
        let data: Vec<u8> = (0..500_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&data).unwrap();
        let compressed = encoder.finish().unwrap();
        fs::write(path, &compressed[..compressed.len() / 2]).unwrap();
    }

    #[test]
    fn test_same_folder_archives_do_not_clobber_each_other() {
        for _ in 0..10 {
            let temp_dir = TempDir::new().expect("Failed to create temp directory");
            let base_path = temp_dir.path();
            let broken = base_path.join("data.gz");
            truncated_gzip(&broken);
            let good = base_path.join("data.zip");
            {
                let mut writer = zip::ZipWriter::new(fs::File::create(&good).unwrap());
                writer
                    .start_file("precious.txt", zip::write::SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(b"keep me").unwrap();
                writer.finish().unwrap();
            }

            let organizer = overwrite(base_path);
            let (broken_result, good_result) = std::thread::scope(|s| {
                let a = s.spawn(|| organizer.relocate_archive(&broken, Category::Archive));
                let b = s.spawn(|| organizer.relocate_archive(&good, Category::Archive));
                (a.join().unwrap(), b.join().unwrap())
            });

            assert!(broken_result.is_err());
            assert!(good_result.is_ok());
            assert!(broken.exists());
            assert!(!good.exists());
            let folder = base_path.join("archives/data");
            assert_eq!(
                fs::read_to_string(folder.join("precious.txt")).unwrap(),
                "keep me"
            );
            assert_eq!(fs::read_dir(&folder).unwrap().count(), 1);
        }
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let organizer = overwrite(base_path);

        let result = organizer.relocate_file(&base_path.join("gone.txt"), Category::Document);
        assert!(matches!(result, Err(RelocateError::Move { .. })));

        let result = organizer.relocate_archive(&base_path.join("gone.zip"), Category::Archive);
        assert!(matches!(result, Err(RelocateError::Extraction { .. })));
        assert!(!base_path.join("archives/gone").exists());
    }

    #[test]
    fn test_plan_does_not_touch_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let organizer = overwrite(base_path);

        let planned = organizer
            .plan(&FileTask::new(base_path.join("x/Файл 1.mp3"), Category::Audio))
            .unwrap();
        assert_eq!(planned, base_path.join("audio/Fajl_1.mp3"));

        let planned = organizer
            .plan(&FileTask::new(base_path.join("b.tar.gz"), Category::Archive))
            .unwrap();
        assert_eq!(planned, base_path.join("archives/b"));
        assert!(!base_path.join("audio").exists());
        assert!(!base_path.join("archives").exists());
    }
}
