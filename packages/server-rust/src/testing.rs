//! Shared test fixtures: recording fakes for the two outbound seams, a
//! stateful in-process GitHub, and helpers for spinning up stub servers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use gitexport_core::{CallbackPayload, FileWriteIntent, RemoteRef, ReviewRequestDraft};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::export::callback::{CallbackDelivery, RetryPolicy};
use crate::export::error::{CallbackError, HostingError};
use crate::export::orchestrator::Publisher;
use crate::export::runner::{ExportPipeline, ExportWorker};
use crate::network::handlers::AppState;
use crate::network::ShutdownController;
use crate::traits::{HostingApi, StatusSink};

pub(crate) const TEST_BASE_SHA: &str = "base-sha";
pub(crate) const TEST_REVIEW_URL: &str = "https://github.com/acme/decisions/pull/1";

pub(crate) fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

/// A non-2xx hosting response.
pub(crate) fn reject(status: u16, body: &str) -> HostingError {
    HostingError::Rejected {
        status: StatusCode::from_u16(status).unwrap(),
        body: body.to_string(),
    }
}

/// Serves `app` on an ephemeral localhost port and returns its base URL.
pub(crate) async fn spawn_app(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Formatted log output collected by a thread-local subscriber.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Number of captured lines containing `needle`.
    pub(crate) fn count(&self, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Captures `WARN` and above on the current thread until the guard drops.
/// Use from a current-thread runtime so every event lands on this thread.
pub(crate) fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

// ---------------------------------------------------------------------------
// RecordingHosting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostingCall {
    GetBranch(String),
    CreateBranch { branch: String, sha: String },
    GetFileSha { path: String, branch: String },
    PutFile(FileWriteIntent),
    CreateReviewRequest(ReviewRequestDraft),
    FindOpenReviewRequest(String),
}

/// Scripted [`HostingApi`]. Each `Some(error)` makes that operation fail
/// on every call; everything else succeeds with fixed values.
#[derive(Default)]
pub(crate) struct RecordingHosting {
    pub get_branch: Option<HostingError>,
    pub create_branch: Option<HostingError>,
    pub get_file_sha: Option<HostingError>,
    /// Returned by a successful file probe.
    pub existing_file_sha: Option<String>,
    pub put_file: Option<HostingError>,
    /// Time the file write takes before answering.
    pub put_file_delay: std::time::Duration,
    pub create_review_request: Option<HostingError>,
    pub find_open_review_request: Option<HostingError>,
    /// Returned by a successful open pull request lookup.
    pub open_review_request: Option<String>,
    pub calls: Mutex<Vec<HostingCall>>,
}

impl RecordingHosting {
    pub(crate) fn calls(&self) -> Vec<HostingCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn last_put(&self) -> Option<FileWriteIntent> {
        self.calls().into_iter().rev().find_map(|call| match call {
            HostingCall::PutFile(intent) => Some(intent),
            _ => None,
        })
    }

    fn record(&self, call: HostingCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn scripted(error: Option<&HostingError>) -> Result<(), HostingError> {
    error.map_or(Ok(()), |e| Err(e.clone()))
}

#[async_trait]
impl HostingApi for RecordingHosting {
    async fn get_branch(&self, branch: &str) -> Result<RemoteRef, HostingError> {
        self.record(HostingCall::GetBranch(branch.to_string()));
        scripted(self.get_branch.as_ref())?;
        Ok(RemoteRef {
            name: format!("refs/heads/{branch}"),
            commit_sha: TEST_BASE_SHA.to_string(),
        })
    }

    async fn create_branch(&self, branch: &str, commit_sha: &str) -> Result<(), HostingError> {
        self.record(HostingCall::CreateBranch {
            branch: branch.to_string(),
            sha: commit_sha.to_string(),
        });
        scripted(self.create_branch.as_ref())
    }

    async fn get_file_sha(&self, path: &str, branch: &str) -> Result<Option<String>, HostingError> {
        self.record(HostingCall::GetFileSha {
            path: path.to_string(),
            branch: branch.to_string(),
        });
        scripted(self.get_file_sha.as_ref())?;
        Ok(self.existing_file_sha.clone())
    }

    async fn put_file(&self, intent: &FileWriteIntent) -> Result<(), HostingError> {
        self.record(HostingCall::PutFile(intent.clone()));
        if !self.put_file_delay.is_zero() {
            tokio::time::sleep(self.put_file_delay).await;
        }
        scripted(self.put_file.as_ref())
    }

    async fn create_review_request(
        &self,
        draft: &ReviewRequestDraft,
    ) -> Result<String, HostingError> {
        self.record(HostingCall::CreateReviewRequest(draft.clone()));
        scripted(self.create_review_request.as_ref())?;
        Ok(TEST_REVIEW_URL.to_string())
    }

    async fn find_open_review_request(
        &self,
        branch: &str,
    ) -> Result<Option<String>, HostingError> {
        self.record(HostingCall::FindOpenReviewRequest(branch.to_string()));
        scripted(self.find_open_review_request.as_ref())?;
        Ok(self.open_review_request.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// [`StatusSink`] that rejects the first `n` attempts, then accepts.
pub(crate) struct RecordingSink {
    fail_first: u32,
    attempts: Mutex<Vec<tokio::time::Instant>>,
    delivered: Mutex<Vec<CallbackPayload>>,
}

impl RecordingSink {
    pub(crate) fn failing_first(n: u32) -> Self {
        Self {
            fail_first: n,
            attempts: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Payloads that were accepted.
    pub(crate) fn payloads(&self) -> Vec<CallbackPayload> {
        self.delivered.lock().unwrap().clone()
    }

    pub(crate) fn attempt_times(&self) -> Vec<tokio::time::Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn post_status(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(tokio::time::Instant::now());
            attempts.len()
        };
        if u32::try_from(attempt).unwrap_or(u32::MAX) <= self.fail_first {
            return Err(CallbackError::Rejected {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "try later".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// App state over default fakes. Keep the worker alive for the test.
pub(crate) fn test_state() -> (AppState, ExportWorker) {
    test_state_with(
        Arc::new(RecordingHosting::default()),
        Arc::new(RecordingSink::failing_first(0)),
    )
}

pub(crate) fn test_state_with(
    hosting: Arc<RecordingHosting>,
    sink: Arc<RecordingSink>,
) -> (AppState, ExportWorker) {
    let publisher = Publisher::new(hosting, "main").with_date_source(fixed_date);
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: std::time::Duration::from_millis(1),
    };
    let worker = ExportWorker::start(ExportPipeline::new(
        publisher,
        CallbackDelivery::new(sink, policy),
    ));
    let state = AppState {
        shutdown: Arc::new(ShutdownController::new()),
        exports: worker.submitter(),
        export_wait: std::time::Duration::from_secs(30),
        config_complete: true,
        start_time: Instant::now(),
    };
    (state, worker)
}

// ---------------------------------------------------------------------------
// FakeGitHub
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeRepo {
    /// branch -> commit sha
    refs: HashMap<String, String>,
    /// (branch, path) -> blob sha
    files: HashMap<(String, String), String>,
    /// (head branch, html url) of open pull requests
    pulls: Vec<(String, String)>,
    last_put: Option<Value>,
    writes: u32,
}

type Shared = Arc<Mutex<FakeRepo>>;
type Reply = (StatusCode, Json<Value>);

fn error_reply(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "message": message })))
}

/// In-process stand-in for the subset of the GitHub REST API the adapter uses.
#[derive(Clone, Default)]
pub(crate) struct FakeGitHub {
    repo: Shared,
}

impl FakeGitHub {
    pub(crate) fn with_branch(name: &str, sha: &str) -> Self {
        let fake = Self::default();
        fake.repo
            .lock()
            .unwrap()
            .refs
            .insert(name.to_string(), sha.to_string());
        fake
    }

    pub(crate) fn seed_file(&self, branch: &str, path: &str, sha: &str) {
        self.repo
            .lock()
            .unwrap()
            .files
            .insert((branch.to_string(), path.to_string()), sha.to_string());
    }

    pub(crate) fn last_put_body(&self) -> Option<Value> {
        self.repo.lock().unwrap().last_put.clone()
    }

    pub(crate) fn branch_sha(&self, branch: &str) -> Option<String> {
        self.repo.lock().unwrap().refs.get(branch).cloned()
    }

    pub(crate) fn open_pull_count(&self) -> usize {
        self.repo.lock().unwrap().pulls.len()
    }

    pub(crate) async fn spawn(&self) -> String {
        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}/git/ref/heads/{*branch}",
                get(fake_get_ref),
            )
            .route("/repos/{owner}/{repo}/git/refs", post(fake_create_ref))
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(fake_get_content).put(fake_put_content),
            )
            .route(
                "/repos/{owner}/{repo}/pulls",
                get(fake_list_pulls).post(fake_create_pull),
            )
            .with_state(Arc::clone(&self.repo));
        spawn_app(app).await
    }
}

async fn fake_get_ref(
    State(repo): State<Shared>,
    Path((_owner, _repo, branch)): Path<(String, String, String)>,
) -> Reply {
    match repo.lock().unwrap().refs.get(&branch) {
        Some(sha) => (
            StatusCode::OK,
            Json(json!({
                "ref": format!("refs/heads/{branch}"),
                "object": { "sha": sha, "type": "commit" },
            })),
        ),
        None => error_reply(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn fake_create_ref(State(repo): State<Shared>, Json(body): Json<Value>) -> Reply {
    let name = body["ref"].as_str().unwrap_or_default();
    let Some(branch) = name.strip_prefix("refs/heads/") else {
        return error_reply(StatusCode::UNPROCESSABLE_ENTITY, "Reference name is invalid");
    };
    let sha = body["sha"].as_str().unwrap_or_default().to_string();

    let mut repo = repo.lock().unwrap();
    if repo.refs.contains_key(branch) {
        return error_reply(StatusCode::UNPROCESSABLE_ENTITY, "Reference already exists");
    }
    repo.refs.insert(branch.to_string(), sha.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "ref": name, "object": { "sha": sha } })),
    )
}

async fn fake_get_content(
    State(repo): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let branch = query.get("ref").cloned().unwrap_or_default();
    match repo.lock().unwrap().files.get(&(branch, path.clone())) {
        Some(sha) => (StatusCode::OK, Json(json!({ "path": path, "sha": sha }))),
        None => error_reply(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn fake_put_content(
    State(repo): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    let branch = body["branch"].as_str().unwrap_or_default().to_string();
    let key = (branch, path.clone());

    let mut repo = repo.lock().unwrap();
    repo.last_put = Some(body.clone());
    let supplied = body["sha"].as_str();
    match (repo.files.get(&key), supplied) {
        (Some(_), None) => {
            return error_reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid request.\n\n\"sha\" wasn't supplied.",
            );
        }
        (Some(current), Some(given)) if current != given => {
            return error_reply(StatusCode::CONFLICT, &format!("{path} does not match {given}"));
        }
        _ => {}
    }

    repo.writes += 1;
    let sha = format!("blob-{}", repo.writes);
    repo.files.insert(key, sha.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "content": { "path": path, "sha": sha } })),
    )
}

async fn fake_create_pull(
    State(repo): State<Shared>,
    Path((owner, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Reply {
    let head = body["head"].as_str().unwrap_or_default().to_string();

    let mut repo = repo.lock().unwrap();
    if repo.pulls.iter().any(|(h, _)| *h == head) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "Validation Failed",
                "errors": [{
                    "resource": "PullRequest",
                    "code": "custom",
                    "message": format!("A pull request already exists for {owner}:{head}."),
                }],
            })),
        );
    }
    let number = repo.pulls.len() + 1;
    let url = format!("https://github.com/{owner}/{name}/pull/{number}");
    repo.pulls.push((head, url.clone()));
    (
        StatusCode::CREATED,
        Json(json!({ "number": number, "html_url": url })),
    )
}

async fn fake_list_pulls(
    State(repo): State<Shared>,
    Path((owner, _name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    let wanted = query
        .get("head")
        .and_then(|h| h.strip_prefix(&format!("{owner}:")))
        .map(str::to_string);
    let pulls: Vec<Value> = repo
        .lock()
        .unwrap()
        .pulls
        .iter()
        .filter(|(head, _)| wanted.as_deref().is_none_or(|w| w == head))
        .map(|(_, url)| json!({ "html_url": url, "state": "open" }))
        .collect();
    (StatusCode::OK, Json(Value::Array(pulls)))
}
