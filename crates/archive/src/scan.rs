use std::path::Path;

use crate::ArchiveError;

/// A regular file found under an item folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the scanned folder, `/`-separated on every platform.
    pub relative_path: String,
    pub size: u64,
}

/// Recursively lists the regular files under `root`.
///
/// The order is fixed regardless of directory iteration order: a folder's
/// files come first, sorted by name, then each subfolder in name order.
/// Symlinks are not followed.
pub fn scan_item_dir(root: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut entries = Vec::new();
    // Folders still to visit, with their `/`-joined path below `root`.
    let mut pending = vec![(root.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut children = std::fs::read_dir(&dir)?.collect::<Result<Vec<_>, _>>()?;
        children.sort_by_key(|child| child.file_name());

        let mut subdirs = Vec::new();
        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let relative_path = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = child.file_type()?;
            if file_type.is_dir() {
                subdirs.push((child.path(), relative_path));
            } else if file_type.is_file() {
                entries.push(ArchiveEntry {
                    relative_path,
                    size: child.metadata()?.len(),
                });
            }
        }
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(entries)
}
