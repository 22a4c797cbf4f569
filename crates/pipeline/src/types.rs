//! Data types for the pipeline.

use std::fmt;
use std::time::Duration;

use wspublish_workshop::{
    AppId, CloudQuota, DEFAULT_UPDATE_INTERVAL, PublishedFileDetails, PublishedFileId, Visibility,
};

/// Tag identifying the tool version; always the first tag of a listing.
pub const TOOL_TAG: &str = env!("CARGO_PKG_VERSION");

/// Steps of the workshop flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Archive,
    UploadArchive,
    UploadPreview,
    Share,
    Verify,
    Publish,
    Update,
    Delete,
    Quota,
    Enumerate,
    Details,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validate => "validating item",
            Stage::Archive => "archiving item folder",
            Stage::UploadArchive => "uploading archive",
            Stage::UploadPreview => "uploading preview image",
            Stage::Share => "sharing files",
            Stage::Verify => "verifying cloud files",
            Stage::Publish => "publishing",
            Stage::Update => "updating",
            Stage::Delete => "deleting",
            Stage::Quota => "reading cloud quota",
            Stage::Enumerate => "enumerating published files",
            Stage::Details => "reading file details",
        };
        f.write_str(s)
    }
}

/// Progress event emitted while a flow runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted(Stage),
    /// One callback dispatch while waiting on the platform.
    Tick,
    /// A file was added to the archive.
    FileAdded(String),
    ItemDeleted(PublishedFileId),
}

/// Tunables shared by every flow.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Time between callback dispatches while waiting.
    pub update_interval: Duration,
    /// Per-call wait limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub visibility: Visibility,
    pub tool_tag: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            timeout: None,
            visibility: Visibility::Public,
            tool_tag: TOOL_TAG.to_string(),
        }
    }
}

/// Result of a successful publish or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: PublishedFileId,
    pub name: String,
    pub tags: Vec<String>,
    pub archive_size: u64,
    pub entry_count: usize,
}

/// Whether `list` removes what it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMode {
    /// Report, then delete every enumerated listing.
    #[default]
    Purge,
    /// Report only.
    Keep,
}

/// Result of a `list` run.
#[derive(Debug, Clone)]
pub struct ListReport {
    pub app_id: AppId,
    /// `None` when the quota could not be read (e.g. cloud disabled).
    pub quota: Option<CloudQuota>,
    pub items: Vec<PublishedFileDetails>,
    pub deleted: Vec<PublishedFileId>,
}
