//! Local half of publish/update: everything that happens before the
//! platform is touched.

use std::path::Path;

use tracing::debug;
use wspublish_archive::{ItemLayout, PackedArchive, pack_directory};
use wspublish_manifest::Manifest;

use crate::error::{PipelineError, PipelineFailure};
use crate::types::Stage;

/// A validated, packed item ready for upload.
#[derive(Debug, Clone)]
pub struct PreparedItem {
    pub layout: ItemLayout,
    pub manifest: Manifest,
    pub archive: PackedArchive,
    pub preview: Vec<u8>,
}

/// Validates the item `name` under `root` and packs its folder.
///
/// Runs the [`Stage::Validate`] and [`Stage::Archive`] stages; the caller
/// is told about each via `on_stage` before it starts.
pub async fn prepare_item(
    root: &Path,
    name: &str,
    mut on_stage: impl FnMut(Stage),
) -> Result<PreparedItem, PipelineError> {
    on_stage(Stage::Validate);
    let layout = ItemLayout::new(root, name).map_err(PipelineError::at(Stage::Validate))?;
    let manifest =
        Manifest::load(&layout.manifest_path()).map_err(PipelineError::at(Stage::Validate))?;
    let preview = tokio::fs::read(layout.preview_path())
        .await
        .map_err(PipelineError::at(Stage::Validate))?;
    debug!(
        item = %name,
        title = %manifest.title(),
        preview_bytes = preview.len(),
        "item validated"
    );

    on_stage(Stage::Archive);
    let archive = tokio::task::spawn_blocking({
        let dir = layout.dir().to_path_buf();
        let prefix = layout.name().to_string();
        move || pack_directory(&dir, &prefix)
    })
    .await
    .map_err(|e| PipelineError::new(Stage::Archive, std::io::Error::other(e)))?
    .map_err(|e| PipelineError::new(Stage::Archive, PipelineFailure::Archive(e)))?;
    debug!(
        item = %name,
        entries = archive.entries.len(),
        packed_bytes = archive.data.len(),
        "item archived"
    );

    Ok(PreparedItem {
        layout,
        manifest,
        archive,
        preview,
    })
}
