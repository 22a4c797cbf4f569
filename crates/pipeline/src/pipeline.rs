//! Publish, update, delete and list flows.

use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wspublish_workshop::{
    FileType, PublishRequest, PublishedFileId, Pump, UpdateRequest, WorkshopClient, WorkshopError,
};

use crate::error::{PipelineError, PipelineFailure};
use crate::prepare::{PreparedItem, prepare_item};
use crate::types::{ItemOutcome, ListMode, ListReport, PipelineEvent, PipelineOptions, Stage};

/// A cloud file written by the current run.
struct Written {
    name: String,
    existed_before: bool,
}

/// Runs workshop flows against one client.
pub struct Pipeline<'a> {
    client: &'a dyn WorkshopClient,
    options: PipelineOptions,
    events: Option<mpsc::UnboundedSender<PipelineEvent>>,
    cancel: CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(client: &'a dyn WorkshopClient, options: PipelineOptions) -> Self {
        Self {
            client,
            options,
            events: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Sends progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the cancellation token for this pipeline.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads the item `name` found under `root` as a new listing.
    pub async fn publish(&self, root: &Path, name: &str) -> Result<ItemOutcome, PipelineError> {
        let item = self.prepare(root, name).await?;
        let tags = item.manifest.tags(&self.options.tool_tag);

        let mut written = Vec::new();
        let mut in_flight = false;
        let result = async {
            self.upload(&item, &mut written).await?;

            self.start(Stage::Publish)?;
            let request = PublishRequest {
                file_name: item.layout.archive_name(),
                preview_name: item.layout.preview_name(),
                title: item.manifest.title().to_string(),
                description: item.manifest.description().to_string(),
                tags: tags.clone(),
                visibility: self.options.visibility,
                file_type: FileType::Community,
            };
            in_flight = true;
            self.pump()
                .wait(self.client.publish_file(&request))
                .await
                .map_err(PipelineError::at(Stage::Publish))
        }
        .await;

        let id = match result {
            Ok(id) => id,
            Err(e) => return Err(self.abandon(&written, in_flight, e)),
        };

        info!(item = %name, %id, "item published");
        Ok(outcome(id, &item, tags))
    }

    /// Re-uploads the item `name` and points listing `id` at it.
    pub async fn update(
        &self,
        root: &Path,
        name: &str,
        id: PublishedFileId,
        change_note: Option<&str>,
    ) -> Result<ItemOutcome, PipelineError> {
        let item = self.prepare(root, name).await?;
        let tags = item.manifest.tags(&self.options.tool_tag);

        let mut written = Vec::new();
        let mut in_flight = false;
        let result = async {
            self.upload(&item, &mut written).await?;

            self.start(Stage::Update)?;
            let request = UpdateRequest {
                file_name: item.layout.archive_name(),
                preview_name: item.layout.preview_name(),
                title: item.manifest.title().to_string(),
                description: item.manifest.description().to_string(),
                tags: tags.clone(),
                visibility: self.options.visibility,
                change_note: change_note.map(str::to_string),
            };
            in_flight = true;
            self.pump()
                .wait(self.client.update_published_file(id, &request))
                .await
                .map_err(PipelineError::at(Stage::Update))
        }
        .await;

        if let Err(e) = result {
            return Err(self.abandon(&written, in_flight, e));
        }

        info!(item = %name, %id, "item updated");
        Ok(outcome(id, &item, tags))
    }

    /// Removes listing `id`.
    pub async fn delete(&self, id: PublishedFileId) -> Result<(), PipelineError> {
        self.start(Stage::Delete)?;
        self.pump()
            .wait(self.client.delete_published_file(id))
            .await
            .map_err(PipelineError::at(Stage::Delete))?;
        self.emit(PipelineEvent::ItemDeleted(id));
        info!(%id, "item deleted");
        Ok(())
    }

    /// Reports the cloud quota and every published listing. In
    /// [`ListMode::Purge`] each listing is deleted after it is reported.
    pub async fn list(&self, mode: ListMode) -> Result<ListReport, PipelineError> {
        self.start(Stage::Quota)?;
        let quota = match self.client.quota() {
            Ok(quota) => Some(quota),
            Err(e) => {
                warn!(error = %e, "cloud quota unavailable");
                None
            }
        };

        self.start(Stage::Enumerate)?;
        let ids = self
            .pump()
            .wait(self.client.enumerate_published_files())
            .await
            .map_err(PipelineError::at(Stage::Enumerate))?;
        debug!(count = ids.len(), "published files enumerated");

        let mut items = Vec::with_capacity(ids.len());
        let mut deleted = Vec::new();
        for id in ids {
            self.start(Stage::Details)?;
            match self.pump().wait(self.client.published_file_details(id)).await {
                Ok(details) => items.push(details),
                Err(WorkshopError::ItemNotFound(_)) => {
                    warn!(%id, "published file vanished before its details were read");
                    continue;
                }
                Err(e) => return Err(PipelineError::new(Stage::Details, e)),
            }

            if mode == ListMode::Purge {
                self.delete(id).await?;
                deleted.push(id);
            }
        }

        Ok(ListReport {
            app_id: self.client.app_id(),
            quota,
            items,
            deleted,
        })
    }

    async fn prepare(&self, root: &Path, name: &str) -> Result<PreparedItem, PipelineError> {
        self.check_cancelled(Stage::Validate)?;
        let item = prepare_item(root, name, |stage| self.emit(PipelineEvent::StageStarted(stage)))
            .await?;
        for entry in &item.archive.entries {
            self.emit(PipelineEvent::FileAdded(entry.clone()));
        }
        Ok(item)
    }

    /// Writes, shares and verifies the archive and preview.
    async fn upload(
        &self,
        item: &PreparedItem,
        written: &mut Vec<Written>,
    ) -> Result<(), PipelineError> {
        let archive_name = item.layout.archive_name();
        let preview_name = item.layout.preview_name();

        self.start(Stage::UploadArchive)?;
        self.write(&archive_name, &item.archive.data, written)
            .map_err(PipelineError::at(Stage::UploadArchive))?;

        self.start(Stage::UploadPreview)?;
        self.write(&preview_name, &item.preview, written)
            .map_err(PipelineError::at(Stage::UploadPreview))?;

        self.start(Stage::Share)?;
        let shares = vec![
            self.client.share_file(&archive_name),
            self.client.share_file(&preview_name),
        ];
        self.pump()
            .wait_all(shares)
            .await
            .map_err(PipelineError::at(Stage::Share))?;

        self.start(Stage::Verify)?;
        for name in [&archive_name, &preview_name] {
            if !self.client.file_exists(name) {
                return Err(PipelineError::new(
                    Stage::Verify,
                    PipelineFailure::MissingInCloud(name.clone()),
                ));
            }
        }
        Ok(())
    }

    fn write(&self, name: &str, data: &[u8], written: &mut Vec<Written>) -> Result<(), WorkshopError> {
        let existed_before = self.client.file_exists(name);
        self.client.write_file(name, data)?;
        debug!(file = %name, bytes = data.len(), "written to cloud");
        written.push(Written {
            name: name.to_string(),
            existed_before,
        });
        Ok(())
    }

    /// Cleans up after a failed publish or update and hands back `error`.
    ///
    /// When the listing call was issued but never answered (timeout or
    /// cancellation) the platform may still apply it, so the uploaded files
    /// are kept for the listing to reference.
    fn abandon(&self, written: &[Written], in_flight: bool, error: PipelineError) -> PipelineError {
        let unanswered = in_flight
            && matches!(
                error.source,
                PipelineFailure::Cancelled | PipelineFailure::Workshop(WorkshopError::TimedOut(_))
            );
        if unanswered {
            warn!(
                stage = %error.stage,
                files = written.len(),
                "listing call still pending, keeping uploaded files"
            );
        } else {
            self.discard(written);
        }
        error
    }

    /// Removes cloud files this run created. Files that were already there
    /// may back an existing listing and are left alone.
    fn discard(&self, written: &[Written]) {
        for file in written.iter().filter(|f| !f.existed_before) {
            match self.client.delete_file(&file.name) {
                Ok(()) => debug!(file = %file.name, "removed cloud file after failure"),
                Err(e) => warn!(file = %file.name, error = %e, "failed to remove cloud file"),
            }
        }
    }

    fn pump(&self) -> Pump<'a> {
        let events = self.events.clone();
        Pump::new(self.client)
            .interval(self.options.update_interval)
            .timeout(self.options.timeout)
            .cancel_token(self.cancel.clone())
            .on_tick(move || {
                if let Some(tx) = &events {
                    let _ = tx.send(PipelineEvent::Tick);
                }
            })
    }

    fn start(&self, stage: Stage) -> Result<(), PipelineError> {
        self.check_cancelled(stage)?;
        debug!(%stage, "stage started");
        self.emit(PipelineEvent::StageStarted(stage));
        Ok(())
    }

    fn check_cancelled(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::new(stage, PipelineFailure::Cancelled))
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

fn outcome(id: PublishedFileId, item: &PreparedItem, tags: Vec<String>) -> ItemOutcome {
    ItemOutcome {
        id,
        name: item.layout.name().to_string(),
        tags,
        archive_size: item.archive.data.len() as u64,
        entry_count: item.archive.entries.len(),
    }
}
