use std::path::{Component, Path, PathBuf};

use crate::ArchiveError;

/// Longest accepted item name, in bytes.
pub const MAX_ITEM_NAME_LEN: usize = 32;

/// Validates an item name before it is used to build paths and cloud names.
///
/// Rejects:
/// - Empty names and names longer than [`MAX_ITEM_NAME_LEN`]
/// - Anything that is not exactly one normal path component
///   (separators, `.`, `..`, absolute paths, Windows prefixes)
pub fn validate_item_name(name: &str) -> Result<(), ArchiveError> {
    if name.is_empty() {
        return Err(ArchiveError::InvalidName("empty name".into()));
    }

    if name.len() > MAX_ITEM_NAME_LEN {
        return Err(ArchiveError::InvalidName(format!(
            "{name} is longer than {MAX_ITEM_NAME_LEN} bytes"
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(ArchiveError::InvalidName(format!(
            "path separators not allowed: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ArchiveError::InvalidName(format!(
            "not a plain folder name: {name}"
        ))),
    }
}

/// On-disk and cloud names for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLayout {
    name: String,
    dir: PathBuf,
}

impl ItemLayout {
    /// Resolves the item `name` under `root`.
    pub fn new(root: &Path, name: &str) -> Result<Self, ArchiveError> {
        validate_item_name(name)?;
        Ok(Self {
            name: name.to_string(),
            dir: root.join(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The item folder.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `NAME/NAME.json`
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    /// `NAME/NAME.png`
    pub fn preview_path(&self) -> PathBuf {
        self.dir.join(self.preview_name())
    }

    /// Cloud file name of the content archive.
    pub fn archive_name(&self) -> String {
        format!("{}.zip", self.name)
    }

    /// Cloud file name of the preview image.
    pub fn preview_name(&self) -> String {
        format!("{}.png", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_item_name("castle_siege").is_ok());
        assert!(validate_item_name("Map-01.v2").is_ok());
        assert!(validate_item_name(&"x".repeat(MAX_ITEM_NAME_LEN)).is_ok());
    }

    #[test]
    fn rejects_empty_and_long_names() {
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"x".repeat(MAX_ITEM_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["..", ".", "a/b", "a\\b", "/abs", "../up"] {
            assert!(validate_item_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn layout_paths() {
        let layout = ItemLayout::new(Path::new("/work"), "arena").unwrap();
        assert_eq!(layout.name(), "arena");
        assert_eq!(layout.dir(), Path::new("/work/arena"));
        assert_eq!(layout.manifest_path(), Path::new("/work/arena/arena.json"));
        assert_eq!(layout.preview_path(), Path::new("/work/arena/arena.png"));
        assert_eq!(layout.archive_name(), "arena.zip");
        assert_eq!(layout.preview_name(), "arena.png");
    }

    #[test]
    fn layout_validates_name() {
        assert!(matches!(
            ItemLayout::new(Path::new("."), ".."),
            Err(ArchiveError::InvalidName(_))
        ));
    }
}
