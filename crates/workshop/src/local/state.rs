//! Persisted state of a local workshop store.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::WorkshopError;
use crate::types::{FileType, PublishedFileDetails, PublishedFileId, Visibility};

/// Index entry for one cloud file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CloudFileRecord {
    pub size: u64,
    pub sha256: String,
    #[serde(default)]
    pub shared: bool,
    pub modified: DateTime<Utc>,
}

/// A published listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ItemRecord {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub file_type: FileType,
    pub file_name: String,
    pub preview_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub change_notes: Vec<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ItemRecord {
    pub fn details(&self, id: PublishedFileId) -> PublishedFileDetails {
        PublishedFileDetails {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            visibility: self.visibility,
            file_name: self.file_name.clone(),
            preview_name: self.preview_name.clone(),
            created: self.created,
            updated: self.updated,
        }
    }
}

/// Contents of `state.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    pub next_id: u64,
    #[serde(default)]
    pub files: BTreeMap<String, CloudFileRecord>,
    #[serde(default)]
    pub items: BTreeMap<u64, ItemRecord>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_id: 1,
            files: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }
}

impl StoreState {
    /// Loads the state file, or starts empty when there is none yet.
    pub fn load(path: &Path) -> Result<Self, WorkshopError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the state next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> Result<(), WorkshopError> {
        let json = serde_json::to_vec_pretty(self)?;
        write_replace(path, &json)
    }

    /// Bytes used by every stored cloud file.
    pub fn used_bytes(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }

    /// Hands out the next listing id.
    pub fn allocate_id(&mut self) -> PublishedFileId {
        loop {
            let raw = self.next_id.max(1);
            self.next_id = raw.wrapping_add(1);
            if !self.items.contains_key(&raw)
                && let Some(id) = PublishedFileId::new(raw)
            {
                return id;
            }
        }
    }
}

/// SHA-256 of `data`, hex encoded.
pub(crate) fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Writes `data` to a temporary sibling of `path`, then renames it over `path`.
pub(crate) fn write_replace(path: &Path, data: &[u8]) -> Result<(), WorkshopError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_state_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = StoreState::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(state, StoreState::default());
        assert_eq!(state.next_id, 1);
    }

    #[test]
    fn state_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = StoreState::default();
        let now = Utc::now();
        state.files.insert(
            "a.zip".into(),
            CloudFileRecord {
                size: 3,
                sha256: checksum_bytes(b"abc"),
                shared: true,
                modified: now,
            },
        );
        let id = state.allocate_id();
        state.items.insert(
            id.get(),
            ItemRecord {
                title: "T".into(),
                description: "D".into(),
                tags: vec!["Map".into()],
                visibility: Visibility::Public,
                file_type: FileType::Community,
                file_name: "a.zip".into(),
                preview_name: "a.png".into(),
                change_notes: Vec::new(),
                created: now,
                updated: now,
            },
        );
        state.save(&path).unwrap();

        let loaded = StoreState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(StoreState::load(&path), Err(WorkshopError::Json(_))));
    }

    #[test]
    fn ids_skip_taken_values() {
        let mut state = StoreState::default();
        let first = state.allocate_id();
        assert_eq!(first.get(), 1);
        state.items.insert(
            2,
            ItemRecord {
                title: String::new(),
                description: String::new(),
                tags: Vec::new(),
                visibility: Visibility::Private,
                file_type: FileType::Community,
                file_name: String::new(),
                preview_name: String::new(),
                change_notes: Vec::new(),
                created: Utc::now(),
                updated: Utc::now(),
            },
        );
        assert_eq!(state.allocate_id().get(), 3);
    }

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
