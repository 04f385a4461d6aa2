//! Branch/file/pull-request orchestration for one export job.
//!
//! Steps run strictly in order, each consuming the previous step's output:
//!
//! 1. resolve the default branch's commit
//! 2. create the export branch (reuse it if it already exists)
//! 3. probe the target file for its blob sha (never fatal)
//! 4. write the file, as an update when the probe found a sha
//! 5. open the pull request (reuse the open one if it already exists)
//!
//! Nothing is retried here. Recovery is re-dispatching the whole job: the
//! branch name is deterministic, so a second run resumes on top of whatever
//! the first run left behind.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use gitexport_core::{ExportJob, ExportResult, FileWriteIntent};
use tracing::{debug, info, warn};

use super::error::StepFailure;
use crate::traits::HostingApi;

/// Body fragment GitHub returns when creating a ref that already exists.
pub const REF_EXISTS_SIGNAL: &str = "Reference already exists";

/// Body fragment GitHub returns when a pull request for the head already exists.
pub const REVIEW_REQUEST_EXISTS_SIGNAL: &str = "A pull request already exists";

/// Most hosting calls one job can make: base ref, branch, probe, write,
/// pull request, open pull request lookup.
pub const MAX_HOSTING_CALLS: u32 = 6;

/// Source of the UTC date used in branch names.
pub type DateSource = fn() -> NaiveDate;

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Publishes export jobs to a hosting backend.
#[derive(Clone)]
pub struct Publisher {
    hosting: Arc<dyn HostingApi>,
    default_branch: String,
    today: DateSource,
}

impl Publisher {
    #[must_use]
    pub fn new(hosting: Arc<dyn HostingApi>, default_branch: impl Into<String>) -> Self {
        Self {
            hosting,
            default_branch: default_branch.into(),
            today: utc_today,
        }
    }

    /// Overrides the date source. Used to pin branch names in tests.
    #[must_use]
    pub fn with_date_source(mut self, today: DateSource) -> Self {
        self.today = today;
        self
    }

    #[must_use]
    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Runs all steps and folds the outcome into a single terminal result.
    pub async fn publish(&self, job: &ExportJob) -> ExportResult {
        let branch = job.branch_name((self.today)());
        match self.run_steps(job, &branch).await {
            Ok(review_request_url) => {
                info!(branch = %branch, url = %review_request_url, "export published");
                ExportResult::Success {
                    review_request_url,
                    branch_name: branch,
                }
            }
            Err(failure) => {
                warn!(branch = %branch, step = failure.step(), error = %failure, "export failed");
                ExportResult::Failure {
                    reason: failure.to_string(),
                }
            }
        }
    }

    async fn run_steps(&self, job: &ExportJob, branch: &str) -> Result<String, StepFailure> {
        let base = self
            .hosting
            .get_branch(&self.default_branch)
            .await
            .map_err(StepFailure::BaseRef)?;
        debug!(base = %base.name, sha = %base.commit_sha, "resolved base ref");

        match self.hosting.create_branch(branch, &base.commit_sha).await {
            Ok(()) => debug!(branch, "created branch"),
            Err(e) if e.body_contains(REF_EXISTS_SIGNAL) => {
                info!(branch, "branch already exists, reusing");
            }
            Err(e) => return Err(StepFailure::CreateBranch(e)),
        }

        let path = job.file_path();
        let prior_sha = match self.hosting.get_file_sha(&path, branch).await {
            Ok(sha) => sha,
            Err(e) => {
                debug!(path = %path, error = %e, "file probe failed, writing as new file");
                None
            }
        };

        let intent = FileWriteIntent {
            path,
            content_bytes: job.document_body().as_bytes().to_vec(),
            branch: branch.to_string(),
            prior_sha,
            message: job.commit_message(),
        };
        self.hosting
            .put_file(&intent)
            .await
            .map_err(StepFailure::WriteFile)?;
        debug!(path = %intent.path, update = intent.is_update(), "wrote file");

        let draft = job.review_request(branch, &self.default_branch);
        match self.hosting.create_review_request(&draft).await {
            Ok(url) => Ok(url),
            Err(e) if e.body_contains(REVIEW_REQUEST_EXISTS_SIGNAL) => {
                match self.hosting.find_open_review_request(branch).await {
                    Ok(Some(url)) => {
                        info!(branch, url = %url, "pull request already open, reusing");
                        Ok(url)
                    }
                    Ok(None) => Err(StepFailure::OpenReviewRequest(e)),
                    Err(lookup) => {
                        warn!(branch, error = %lookup, "open pull request lookup failed");
                        Err(StepFailure::OpenReviewRequest(e))
                    }
                }
            }
            Err(e) => Err(StepFailure::OpenReviewRequest(e)),
        }
    }
}
