use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::ArchiveError;
use crate::scan::scan_item_dir;

/// An item folder packed into memory.
#[derive(Debug, Clone)]
pub struct PackedArchive {
    /// The finished zip file.
    pub data: Vec<u8>,
    /// Entry names as stored in the archive.
    pub entries: Vec<String>,
    /// Sum of the packed files' sizes before compression.
    pub uncompressed_size: u64,
}

/// Deflates every file under `dir` into an in-memory zip.
///
/// Entries are named `<prefix>/<relative path>`; an empty prefix stores
/// them at the archive root.
pub fn pack_directory(dir: &Path, prefix: &str) -> Result<PackedArchive, ArchiveError> {
    if !dir.is_dir() {
        return Err(ArchiveError::NotADirectory(dir.display().to_string()));
    }

    let files = scan_item_dir(dir)?;
    if files.is_empty() {
        return Err(ArchiveError::Empty(dir.display().to_string()));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = Vec::with_capacity(files.len());
    let mut uncompressed_size = 0u64;

    for file in &files {
        let name = if prefix.is_empty() {
            file.relative_path.clone()
        } else {
            format!("{prefix}/{}", file.relative_path)
        };
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(file.size >= u64::from(u32::MAX));

        writer.start_file(name.as_str(), options)?;
        let mut source = File::open(dir.join(&file.relative_path))?;
        let copied = std::io::copy(&mut source, &mut writer)?;
        writer.flush()?;

        debug!(entry = %name, bytes = copied, "added to archive");
        uncompressed_size += copied;
        entries.push(name);
    }

    let data = writer.finish()?.into_inner();
    Ok(PackedArchive {
        data,
        entries,
        uncompressed_size,
    })
}
