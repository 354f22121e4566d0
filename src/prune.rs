//! Removal of directories left empty after relocation.

use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Removes every empty directory below `path`, deepest first.
///
/// A directory whose children were all removed becomes empty itself and is
/// removed in the same pass. Directories that still hold anything are left
/// alone; such failures are only logged. `path` itself is never removed and
/// symlinks are not followed.
///
/// Returns the number of directories removed.
pub fn prune_empty_dirs(path: &Path) -> usize {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", path.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }

        let dir = entry.path();
        removed += prune_empty_dirs(&dir);
        match fs::remove_dir(&dir) {
            Ok(()) => {
                trace!("Removed empty directory {}", dir.display());
                removed += 1;
            }
            Err(e) => debug!("Kept {}: {}", dir.display(), e),
        }
    }
    removed
}
