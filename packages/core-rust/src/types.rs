use serde::{Deserialize, Serialize};

/// Snapshot of a branch pointer read from the hosting API.
///
/// Never cached across job executions: every run re-reads the base ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    /// Fully qualified ref name, e.g. `refs/heads/main`.
    pub name: String,
    /// Commit the ref points at.
    pub commit_sha: String,
}

/// A pending create-or-update of one file on one branch.
///
/// `prior_sha` present means update semantics: the hosting API rejects the
/// write unless the file still has that blob sha. Absent means create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWriteIntent {
    /// Repository-relative path of the file.
    pub path: String,
    /// Raw UTF-8 bytes of the document. Transport encoding happens at the adapter.
    pub content_bytes: Vec<u8>,
    /// Branch the commit lands on.
    pub branch: String,
    /// Blob sha captured by the probe step, if the file already existed.
    pub prior_sha: Option<String>,
    /// Commit message for the write.
    pub message: String,
}

impl FileWriteIntent {
    /// Returns `true` when this write replaces an existing file.
    #[must_use]
    pub fn is_update(&self) -> bool {
        self.prior_sha.is_some()
    }
}

/// Parameters for opening a pull request from the export branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequestDraft {
    pub title: String,
    /// Source branch name (no `refs/heads/` prefix).
    pub head: String,
    /// Target branch name.
    pub base: String,
    pub body: String,
}
