//! Directory-backed workshop.
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/<app_id>/state.json     cloud file index, listings, next id
//! <root>/<app_id>/cloud/<name>   cloud file contents
//! ```
//!
//! Queued operations run in FIFO order from [`LocalWorkshop::run_callbacks`],
//! the same way SDK callbacks are dispatched from its update call.

mod state;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::WorkshopError;
use crate::client::WorkshopClient;
use crate::pending::{Completion, PendingCall, pending};
use crate::types::{
    AppId, CloudQuota, PublishRequest, PublishedFileDetails, PublishedFileId, UpdateRequest,
};
use state::{CloudFileRecord, ItemRecord, StoreState, checksum_bytes, write_replace};

/// Default per-user cloud quota: 100 MiB.
pub const DEFAULT_QUOTA_BYTES: u64 = 100 * 1024 * 1024;

/// Longest title a listing may carry, in bytes.
pub const MAX_TITLE_BYTES: usize = 128;

/// Longest description a listing may carry, in bytes.
pub const MAX_DESCRIPTION_BYTES: usize = 8000;

/// Settings for [`LocalWorkshop::initialize`].
#[derive(Debug, Clone)]
pub struct LocalWorkshopConfig {
    pub root: PathBuf,
    pub app_id: AppId,
    pub quota_bytes: u64,
    pub cloud_enabled: bool,
}

impl LocalWorkshopConfig {
    pub fn new(root: impl Into<PathBuf>, app_id: AppId) -> Self {
        Self {
            root: root.into(),
            app_id,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            cloud_enabled: true,
        }
    }
}

type Job = Box<dyn FnOnce(&LocalWorkshop) + Send>;

/// Workshop backed by a local directory.
pub struct LocalWorkshop {
    app_id: AppId,
    app_dir: PathBuf,
    quota_bytes: u64,
    cloud_enabled: bool,
    state: Mutex<StoreState>,
    queue: Mutex<VecDeque<Job>>,
    shut_down: AtomicBool,
}

impl LocalWorkshop {
    /// Opens (creating if needed) the store for `config.app_id`.
    pub fn initialize(config: LocalWorkshopConfig) -> Result<Self, WorkshopError> {
        let app_dir = config.root.join(config.app_id.to_string());
        std::fs::create_dir_all(app_dir.join("cloud")).map_err(|e| {
            WorkshopError::InitFailed(format!("cannot create {}: {e}", app_dir.display()))
        })?;

        let state = StoreState::load(&app_dir.join("state.json"))
            .map_err(|e| WorkshopError::InitFailed(format!("cannot load store state: {e}")))?;

        info!(
            app_id = %config.app_id,
            store = %app_dir.display(),
            files = state.files.len(),
            items = state.items.len(),
            "local workshop initialized"
        );

        Ok(Self {
            app_id: config.app_id,
            app_dir,
            quota_bytes: config.quota_bytes,
            cloud_enabled: config.cloud_enabled,
            state: Mutex::new(state),
            queue: Mutex::new(VecDeque::new()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Directory holding this app's state and cloud files.
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Number of operations waiting for the next callback dispatch.
    pub fn queued(&self) -> usize {
        lock(&self.queue).len()
    }

    fn state_path(&self) -> PathBuf {
        self.app_dir.join("state.json")
    }

    fn cloud_path(&self, name: &str) -> PathBuf {
        self.app_dir.join("cloud").join(name)
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn persist(&self, state: &StoreState) -> Result<(), WorkshopError> {
        state.save(&self.state_path())
    }

    /// Queues `op` to run on the next callback dispatch.
    fn enqueue<T, F>(&self, op: F) -> PendingCall<T>
    where
        T: Send + 'static,
        F: FnOnce(&LocalWorkshop) -> Result<T, WorkshopError> + Send + 'static,
    {
        if self.is_shut_down() {
            return PendingCall::ready(Err(WorkshopError::ShutDown));
        }
        let (completion, call): (Completion<T>, PendingCall<T>) = pending();
        lock(&self.queue).push_back(Box::new(move |ws: &LocalWorkshop| {
            completion.complete(op(ws));
        }));
        call
    }

    fn check_cloud(&self) -> Result<(), WorkshopError> {
        if self.is_shut_down() {
            return Err(WorkshopError::ShutDown);
        }
        if !self.cloud_enabled {
            return Err(WorkshopError::CloudDisabled);
        }
        Ok(())
    }

    /// Both files must exist in the cloud and be shared.
    fn check_shared(state: &StoreState, names: [&str; 2]) -> Result<(), WorkshopError> {
        for name in names {
            let record = state
                .files
                .get(name)
                .ok_or_else(|| WorkshopError::FileNotFound(name.to_string()))?;
            if !record.shared {
                return Err(WorkshopError::NotShared(name.to_string()));
            }
        }
        Ok(())
    }

    fn check_text(title: &str, description: &str) -> Result<(), WorkshopError> {
        if title.is_empty() {
            return Err(WorkshopError::Rejected("title is empty".into()));
        }
        if title.len() > MAX_TITLE_BYTES {
            return Err(WorkshopError::Rejected(format!(
                "title exceeds {MAX_TITLE_BYTES} bytes"
            )));
        }
        if description.len() > MAX_DESCRIPTION_BYTES {
            return Err(WorkshopError::Rejected(format!(
                "description exceeds {MAX_DESCRIPTION_BYTES} bytes"
            )));
        }
        Ok(())
    }
}

impl WorkshopClient for LocalWorkshop {
    fn app_id(&self) -> AppId {
        self.app_id
    }

    fn run_callbacks(&self) {
        // Jobs queued by a callback run on the next dispatch.
        let jobs: Vec<Job> = lock(&self.queue).drain(..).collect();
        if !jobs.is_empty() {
            debug!(count = jobs.len(), "dispatching callbacks");
        }
        for job in jobs {
            job(self);
        }
    }

    fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = {
            let mut queue = lock(&self.queue);
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            warn!(dropped, "shutdown with queued operations");
        }
        if let Err(e) = self.persist(&lock(&self.state)) {
            warn!(error = %e, "failed to persist workshop state on shutdown");
        }
        debug!(app_id = %self.app_id, "local workshop shut down");
    }

    fn is_cloud_enabled(&self) -> bool {
        self.cloud_enabled
    }

    fn file_exists(&self, name: &str) -> bool {
        lock(&self.state).files.contains_key(name) && self.cloud_path(name).is_file()
    }

    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), WorkshopError> {
        self.check_cloud()?;
        validate_cloud_name(name)?;

        let mut state = lock(&self.state);
        let replaced = state.files.get(name).map_or(0, |f| f.size);
        let available = self
            .quota_bytes
            .saturating_sub(state.used_bytes().saturating_sub(replaced));
        let needed = data.len() as u64;
        if needed > available {
            return Err(WorkshopError::QuotaExceeded { needed, available });
        }

        write_replace(&self.cloud_path(name), data)?;
        state.files.insert(
            name.to_string(),
            CloudFileRecord {
                size: needed,
                sha256: checksum_bytes(data),
                shared: false,
                modified: Utc::now(),
            },
        );
        self.persist(&state)?;

        debug!(file = %name, bytes = needed, "cloud file written");
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, WorkshopError> {
        self.check_cloud()?;
        let record = lock(&self.state)
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| WorkshopError::FileNotFound(name.to_string()))?;

        let data = std::fs::read(self.cloud_path(name))?;
        if data.len() as u64 != record.size || checksum_bytes(&data) != record.sha256 {
            return Err(WorkshopError::Corrupt(name.to_string()));
        }
        Ok(data)
    }

    fn delete_file(&self, name: &str) -> Result<(), WorkshopError> {
        self.check_cloud()?;
        let mut state = lock(&self.state);
        if !state.files.contains_key(name) {
            return Err(WorkshopError::FileNotFound(name.to_string()));
        }
        // The index only forgets a blob once it is gone from disk.
        match std::fs::remove_file(self.cloud_path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        state.files.remove(name);
        self.persist(&state)?;

        debug!(file = %name, "cloud file deleted");
        Ok(())
    }

    fn quota(&self) -> Result<CloudQuota, WorkshopError> {
        self.check_cloud()?;
        let used = lock(&self.state).used_bytes();
        Ok(CloudQuota {
            total: self.quota_bytes,
            available: self.quota_bytes.saturating_sub(used),
        })
    }

    fn share_file(&self, name: &str) -> PendingCall<()> {
        let name = name.to_string();
        self.enqueue(move |ws| {
            ws.check_cloud()?;
            let mut state = lock(&ws.state);
            let record = state
                .files
                .get_mut(&name)
                .ok_or_else(|| WorkshopError::FileNotFound(name.clone()))?;
            record.shared = true;
            ws.persist(&state)?;
            debug!(file = %name, "cloud file shared");
            Ok(())
        })
    }

    fn publish_file(&self, request: &PublishRequest) -> PendingCall<PublishedFileId> {
        let request = request.clone();
        self.enqueue(move |ws| {
            Self::check_text(&request.title, &request.description)?;
            let mut state = lock(&ws.state);
            Self::check_shared(
                &state,
                [request.file_name.as_str(), request.preview_name.as_str()],
            )?;

            let id = state.allocate_id();
            let now = Utc::now();
            state.items.insert(
                id.get(),
                ItemRecord {
                    title: request.title,
                    description: request.description,
                    tags: request.tags,
                    visibility: request.visibility,
                    file_type: request.file_type,
                    file_name: request.file_name,
                    preview_name: request.preview_name,
                    change_notes: Vec::new(),
                    created: now,
                    updated: now,
                },
            );
            ws.persist(&state)?;
            info!(%id, "published file");
            Ok(id)
        })
    }

    fn update_published_file(
        &self,
        id: PublishedFileId,
        request: &UpdateRequest,
    ) -> PendingCall<()> {
        let request = request.clone();
        self.enqueue(move |ws| {
            Self::check_text(&request.title, &request.description)?;
            let mut state = lock(&ws.state);
            Self::check_shared(
                &state,
                [request.file_name.as_str(), request.preview_name.as_str()],
            )?;

            let item = state
                .items
                .get_mut(&id.get())
                .ok_or(WorkshopError::ItemNotFound(id))?;
            item.title = request.title;
            item.description = request.description;
            item.tags = request.tags;
            item.visibility = request.visibility;
            item.file_name = request.file_name;
            item.preview_name = request.preview_name;
            if let Some(note) = request.change_note {
                item.change_notes.push(note);
            }
            item.updated = Utc::now();
            ws.persist(&state)?;
            info!(%id, "updated published file");
            Ok(())
        })
    }

    fn delete_published_file(&self, id: PublishedFileId) -> PendingCall<()> {
        self.enqueue(move |ws| {
            let mut state = lock(&ws.state);
            if state.items.remove(&id.get()).is_none() {
                return Err(WorkshopError::ItemNotFound(id));
            }
            ws.persist(&state)?;
            info!(%id, "deleted published file");
            Ok(())
        })
    }

    fn enumerate_published_files(&self) -> PendingCall<Vec<PublishedFileId>> {
        self.enqueue(|ws| {
            let state = lock(&ws.state);
            Ok(state
                .items
                .keys()
                .filter_map(|&raw| PublishedFileId::new(raw))
                .collect())
        })
    }

    fn published_file_details(&self, id: PublishedFileId) -> PendingCall<PublishedFileDetails> {
        self.enqueue(move |ws| {
            let state = lock(&ws.state);
            state
                .items
                .get(&id.get())
                .map(|item| item.details(id))
                .ok_or(WorkshopError::ItemNotFound(id))
        })
    }
}

/// Cloud names are flat: no separators, no `.`/`..`.
fn validate_cloud_name(name: &str) -> Result<(), WorkshopError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.ends_with(".tmp")
    {
        return Err(WorkshopError::Rejected(format!(
            "invalid cloud file name: {name:?}"
        )));
    }
    Ok(())
}

/// Locks a mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
