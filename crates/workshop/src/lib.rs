//! Workshop and cloud-storage SDK shim.
//!
//! The platform SDK is reached through [`WorkshopClient`]. Cloud writes and
//! reads are synchronous; sharing files and every listing operation are
//! queued and complete later, from inside [`WorkshopClient::run_callbacks`].
//! Queued operations hand back a [`PendingCall`], and a [`Pump`] awaits it
//! while driving the callback loop.
//!
//! [`LocalWorkshop`] is a directory-backed implementation with the same
//! observable behavior, used for staging items offline and in tests.

mod client;
pub mod local;
mod pending;
mod types;

pub use client::{WorkshopClient, WorkshopSession};
pub use local::{LocalWorkshop, LocalWorkshopConfig};
pub use pending::{Completion, DEFAULT_UPDATE_INTERVAL, PendingCall, Pump, pending};
pub use types::{
    AppId, CloudQuota, FileType, InvalidFileId, PublishRequest, PublishedFileDetails,
    PublishedFileId, UpdateRequest, Visibility,
};

/// Errors reported by a workshop backend.
#[derive(Debug, thiserror::Error)]
pub enum WorkshopError {
    #[error("workshop initialization failed: {0}")]
    InitFailed(String),

    #[error("cloud storage is disabled for this app")]
    CloudDisabled,

    #[error("cloud file not found: {0}")]
    FileNotFound(String),

    #[error("cloud quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    #[error("cloud file is not shared: {0}")]
    NotShared(String),

    #[error("published file not found: {0}")]
    ItemNotFound(PublishedFileId),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cloud file is corrupt: {0}")]
    Corrupt(String),

    #[error("pending call dropped before completion")]
    Dropped,

    #[error("workshop session is shut down")]
    ShutDown,

    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("cancelled")]
    Cancelled,
}
