//! The backend interface and the session guard.

use std::ops::Deref;

use crate::WorkshopError;
use crate::pending::PendingCall;
use crate::types::{
    AppId, CloudQuota, PublishRequest, PublishedFileDetails, PublishedFileId, UpdateRequest,
};

/// Abstract connection to the workshop platform.
///
/// Cloud file I/O returns immediately. Everything that returns a
/// [`PendingCall`] is only queued; its completion is delivered during a
/// later [`run_callbacks`](WorkshopClient::run_callbacks).
pub trait WorkshopClient: Send + Sync {
    /// Application the session was initialized for.
    fn app_id(&self) -> AppId;

    /// Dispatches completions for queued operations.
    fn run_callbacks(&self);

    /// Releases the session. Calls still queued complete with
    /// [`WorkshopError::Dropped`]. Must be safe to call more than once.
    fn shutdown(&self);

    fn is_cloud_enabled(&self) -> bool;

    fn file_exists(&self, name: &str) -> bool;

    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), WorkshopError>;

    fn read_file(&self, name: &str) -> Result<Vec<u8>, WorkshopError>;

    fn delete_file(&self, name: &str) -> Result<(), WorkshopError>;

    fn quota(&self) -> Result<CloudQuota, WorkshopError>;

    /// Marks a cloud file as shared so listings may reference it.
    fn share_file(&self, name: &str) -> PendingCall<()>;

    fn publish_file(&self, request: &PublishRequest) -> PendingCall<PublishedFileId>;

    fn update_published_file(
        &self,
        id: PublishedFileId,
        request: &UpdateRequest,
    ) -> PendingCall<()>;

    fn delete_published_file(&self, id: PublishedFileId) -> PendingCall<()>;

    /// Lists the current user's published items.
    fn enumerate_published_files(&self) -> PendingCall<Vec<PublishedFileId>>;

    fn published_file_details(&self, id: PublishedFileId) -> PendingCall<PublishedFileDetails>;
}

/// Owns an initialized client and shuts it down when dropped, so the
/// session is released on every exit path.
pub struct WorkshopSession {
    client: Box<dyn WorkshopClient>,
}

impl WorkshopSession {
    pub fn new(client: impl WorkshopClient + 'static) -> Self {
        Self {
            client: Box::new(client),
        }
    }

    pub fn client(&self) -> &dyn WorkshopClient {
        self.client.as_ref()
    }
}

impl Deref for WorkshopSession {
    type Target = dyn WorkshopClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Drop for WorkshopSession {
    fn drop(&mut self) {
        tracing::debug!(app_id = %self.client.app_id(), "shutting down workshop session");
        self.client.shutdown();
    }
}
