use async_trait::async_trait;
use gitexport_core::{CallbackPayload, FileWriteIntent, RemoteRef, ReviewRequestDraft};

use crate::export::error::{CallbackError, HostingError};

/// Version-control hosting backend the orchestrator publishes to.
/// Implementations: GitHub REST (production), in-memory recorders (tests).
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Read the commit a branch points at.
    async fn get_branch(&self, branch: &str) -> Result<RemoteRef, HostingError>;

    /// Create `branch` pointing at `commit_sha`.
    async fn create_branch(&self, branch: &str, commit_sha: &str) -> Result<(), HostingError>;

    /// Blob sha of `path` on `branch`, or `None` if the file does not exist.
    async fn get_file_sha(&self, path: &str, branch: &str) -> Result<Option<String>, HostingError>;

    /// Create or update a file. Update when `intent.prior_sha` is set.
    async fn put_file(&self, intent: &FileWriteIntent) -> Result<(), HostingError>;

    /// Open a pull request and return its web URL.
    async fn create_review_request(
        &self,
        draft: &ReviewRequestDraft,
    ) -> Result<String, HostingError>;

    /// Web URL of the first open pull request whose head is `branch`.
    async fn find_open_review_request(&self, branch: &str)
        -> Result<Option<String>, HostingError>;
}

/// Receiver of terminal export statuses (the system of record).
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Make one delivery attempt. Retrying is the caller's job.
    async fn post_status(&self, payload: &CallbackPayload) -> Result<(), CallbackError>;
}
