use reqwest::StatusCode;

/// Errors from a single call to the hosting API.
///
/// `Timeout` and `Rejected` are handled identically by the orchestrator:
/// both are fatal for the step in progress.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostingError {
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("request failed: {0}")]
    Transport(String),
    /// Non-2xx response. Display matches `"<status> <body>"`.
    #[error("{} {body}", status.as_u16())]
    Rejected { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl HostingError {
    /// Returns `true` if this is a rejection whose body contains `needle`.
    ///
    /// The hosting API signals "already exists" conflicts only through the
    /// message text, so conflict detection is a body match.
    #[must_use]
    pub fn body_contains(&self, needle: &str) -> bool {
        matches!(self, Self::Rejected { body, .. } if body.contains(needle))
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from one attempt to post a status callback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallbackError {
    #[error("callback timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("callback request failed: {0}")]
    Transport(String),
    #[error("callback payload could not be encoded: {0}")]
    Encode(String),
    #[error("callback rejected: {} {body}", status.as_u16())]
    Rejected { status: StatusCode, body: String },
}

/// A fatal orchestrator step. Its `Display` is the `Failure` reason.
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    #[error("Failed to get base branch: {0}")]
    BaseRef(#[source] HostingError),
    #[error("Failed to create branch: {0}")]
    CreateBranch(#[source] HostingError),
    #[error("Failed to create file: {0}")]
    WriteFile(#[source] HostingError),
    #[error("Failed to create PR: {0}")]
    OpenReviewRequest(#[source] HostingError),
}

impl StepFailure {
    /// Short step name for structured logs.
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            Self::BaseRef(_) => "resolve_base_ref",
            Self::CreateBranch(_) => "create_branch",
            Self::WriteFile(_) => "write_file",
            Self::OpenReviewRequest(_) => "open_review_request",
        }
    }
}
