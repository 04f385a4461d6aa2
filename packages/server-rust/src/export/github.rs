//! GitHub REST adapter for [`HostingApi`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use gitexport_core::{FileWriteIntent, RemoteRef, ReviewRequestDraft};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::client::{BoundedClient, HostingRequest};
use super::error::HostingError;
use crate::traits::HostingApi;

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    name: String,
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    html_url: String,
}

/// [`HostingApi`] backed by the GitHub REST API for one repository.
#[derive(Debug, Clone)]
pub struct GitHubHosting {
    client: BoundedClient,
    owner: String,
    repo: String,
}

impl GitHubHosting {
    #[must_use]
    pub fn new(client: BoundedClient, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{suffix}", self.owner, self.repo)
    }
}

#[async_trait]
impl HostingApi for GitHubHosting {
    async fn get_branch(&self, branch: &str) -> Result<RemoteRef, HostingError> {
        let response = self
            .client
            .call(HostingRequest::get(
                self.repo_path(&format!("/git/ref/heads/{branch}")),
            ))
            .await?
            .error_for_status()?;
        let git_ref: GitRef = response.json()?;
        Ok(RemoteRef {
            name: git_ref.name,
            commit_sha: git_ref.object.sha,
        })
    }

    async fn create_branch(&self, branch: &str, commit_sha: &str) -> Result<(), HostingError> {
        let body = json!({
            "ref": format!("refs/heads/{branch}"),
            "sha": commit_sha,
        });
        self.client
            .call(HostingRequest::post(self.repo_path("/git/refs"), body))
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn get_file_sha(&self, path: &str, branch: &str) -> Result<Option<String>, HostingError> {
        let response = self
            .client
            .call(
                HostingRequest::get(self.repo_path(&format!("/contents/{path}")))
                    .with_query("ref", branch),
            )
            .await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entry: ContentEntry = response.error_for_status()?.json()?;
        Ok(Some(entry.sha))
    }

    async fn put_file(&self, intent: &FileWriteIntent) -> Result<(), HostingError> {
        let mut body = json!({
            "message": intent.message,
            "content": BASE64.encode(&intent.content_bytes),
            "branch": intent.branch,
        });
        if let (Some(sha), Value::Object(map)) = (&intent.prior_sha, &mut body) {
            map.insert("sha".to_string(), Value::String(sha.clone()));
        }
        self.client
            .call(HostingRequest::put(
                self.repo_path(&format!("/contents/{}", intent.path)),
                body,
            ))
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn create_review_request(
        &self,
        draft: &ReviewRequestDraft,
    ) -> Result<String, HostingError> {
        let body = json!({
            "title": draft.title,
            "head": draft.head,
            "base": draft.base,
            "body": draft.body,
        });
        let pull: PullRequest = self
            .client
            .call(HostingRequest::post(self.repo_path("/pulls"), body))
            .await?
            .error_for_status()?
            .json()?;
        Ok(pull.html_url)
    }

    async fn find_open_review_request(
        &self,
        branch: &str,
    ) -> Result<Option<String>, HostingError> {
        let pulls: Vec<PullRequest> = self
            .client
            .call(
                HostingRequest::get(self.repo_path("/pulls"))
                    .with_query("head", format!("{}:{branch}", self.owner))
                    .with_query("state", "open"),
            )
            .await?
            .error_for_status()?
            .json()?;
        Ok(pulls.into_iter().next().map(|pr| pr.html_url))
    }
}
