//! Item folder layout and zip packaging.
//!
//! An item named `NAME` lives in a folder `NAME/` holding its manifest
//! (`NAME.json`), its preview image (`NAME.png`) and its content. The whole
//! folder is packed into an in-memory zip whose entries sit under `NAME/`.

mod layout;
mod pack;
mod scan;

pub use layout::{ItemLayout, MAX_ITEM_NAME_LEN, validate_item_name};
pub use pack::{PackedArchive, pack_directory};
pub use scan::{ArchiveEntry, scan_item_dir};

/// Errors produced while resolving or packing an item folder.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid item name: {0}")]
    InvalidName(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("no files to archive in {0}")]
    Empty(String),
}
