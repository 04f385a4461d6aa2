use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal outcome of one export execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportResult {
    /// Branch, file, and pull request are all in place.
    Success {
        review_request_url: String,
        branch_name: String,
    },
    /// A step failed. `reason` names the step, HTTP status, and response body.
    Failure { reason: String },
}

impl ExportResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Status reported to the system of record for this outcome.
    #[must_use]
    pub fn status(&self) -> CallbackStatus {
        match self {
            Self::Success { .. } => CallbackStatus::Complete,
            Self::Failure { .. } => CallbackStatus::Failed,
        }
    }
}

/// Export status values understood by the callback RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Complete,
    Failed,
}

impl CallbackStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

/// Body of a status callback, flattened to a single JSON object:
/// `{ "job_id", "status", ...extra }`.
///
/// Success adds `pr_url` and `branch`; failure adds `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackPayload {
    pub job_id: String,
    pub status: CallbackStatus,
    #[serde(flatten)]
    pub extra: BTreeMap<&'static str, String>,
}

/// Envelope the callback RPC takes: the payload serialized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcEnvelope {
    pub raw_body: String,
}

impl CallbackPayload {
    #[must_use]
    pub fn from_result(job_id: &str, result: &ExportResult) -> Self {
        let extra = match result {
            ExportResult::Success {
                review_request_url,
                branch_name,
            } => BTreeMap::from([
                ("pr_url", review_request_url.clone()),
                ("branch", branch_name.clone()),
            ]),
            ExportResult::Failure { reason } => BTreeMap::from([("error", reason.clone())]),
        };
        Self {
            job_id: job_id.to_string(),
            status: result.status(),
            extra,
        }
    }

    /// The payload as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Wraps the payload the way the RPC expects it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_rpc_body(&self) -> Result<RpcEnvelope, serde_json::Error> {
        Ok(RpcEnvelope {
            raw_body: serde_json::to_string(self)?,
        })
    }
}
