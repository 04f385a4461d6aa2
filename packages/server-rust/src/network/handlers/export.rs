//! Export job entry point.
//!
//! Answers the background dispatcher. Only malformed input gets a non-200
//! status: an export that fails for business reasons is still acknowledged
//! with 200, because the dispatcher must not re-dispatch on it. The failure
//! reaches the system of record through the status callback instead.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use gitexport_core::{ExportRequest, ExportResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::AppState;

/// Query parameters of the export endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    /// Acknowledge as soon as the job is queued instead of waiting for it.
    #[serde(default)]
    pub detach: bool,
}

/// Handles `POST /git-export` with a JSON job body.
///
/// Responses:
/// - `400 {error}` -- malformed or incomplete job, nothing was queued
/// - `200 {ok, review_request_url}` -- export published
/// - `200 {ok, error}` -- export failed or could not be run
/// - `200 {ok, accepted}` -- `?detach=true`, or the job is still running
///   when `export_wait` runs out; it finishes and reports in the background
pub async fn export_handler(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let _in_flight = state.shutdown.in_flight_guard();

    let job = match ExportRequest::from_slice(&body).and_then(ExportRequest::validate) {
        Ok(job) => job,
        Err(e) => {
            warn!(error = %e, "rejected export request");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };
    let job_id = job.record_id().to_string();

    if params.detach {
        return match state.exports.submit_detached(job).await {
            Ok(()) => ack(json!({ "ok": true, "accepted": true })),
            Err(e) => {
                error!(job_id = %job_id, error = %e, "could not queue export");
                ack(json!({ "ok": true, "error": e.to_string() }))
            }
        };
    }

    let reply = match state.exports.submit(job).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "could not queue export");
            return ack(json!({ "ok": true, "error": e.to_string() }));
        }
    };

    match tokio::time::timeout(state.export_wait, reply).await {
        Ok(Ok(outcome)) => match outcome.result {
            ExportResult::Success {
                review_request_url, ..
            } => ack(json!({ "ok": true, "review_request_url": review_request_url })),
            ExportResult::Failure { reason } => ack(json!({ "ok": true, "error": reason })),
        },
        Err(_elapsed) => {
            info!(job_id = %job_id, "export still running, acknowledging as accepted");
            ack(json!({ "ok": true, "accepted": true }))
        }
        Ok(Err(_)) => {
            error!(job_id = %job_id, "export task ended without an outcome");
            ack(json!({ "ok": true, "error": "export task ended without an outcome" }))
        }
    }
}

fn ack(body: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(body))
}
