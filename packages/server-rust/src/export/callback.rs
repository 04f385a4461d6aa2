//! Status callback delivery to the system of record.
//!
//! [`CallbackDelivery::deliver`] makes a bounded number of sequential
//! attempts with a growing pause between them and never returns an error:
//! the caller has nothing useful to do with one. Delivery is at-least-once;
//! the receiving RPC applies updates idempotently per job id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gitexport_core::{CallbackPayload, ExportResult};
use tracing::{error, info, warn};

use super::error::CallbackError;
use crate::traits::StatusSink;

/// RPC that receives export status updates.
pub const DEFAULT_CALLBACK_RPC: &str = "handle_git_export_callback";

/// Attempt budget and backoff for callback delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Pause after failed attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Pause between failed attempt `attempt` (1-based) and the next one.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Sum of all pauses taken when every attempt fails.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_after(a)).sum()
    }
}

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempts: u32,
    pub delivered: bool,
}

/// Retrying front for a [`StatusSink`].
#[derive(Clone)]
pub struct CallbackDelivery {
    sink: Arc<dyn StatusSink>,
    policy: RetryPolicy,
}

impl CallbackDelivery {
    #[must_use]
    pub fn new(sink: Arc<dyn StatusSink>, policy: RetryPolicy) -> Self {
        Self { sink, policy }
    }

    /// Reports `result` for `job_id`. Never fails; exhaustion is logged once.
    pub async fn deliver(&self, job_id: &str, result: &ExportResult) -> DeliveryReport {
        let payload = CallbackPayload::from_result(job_id, result);
        let status = payload.status.as_str();
        let max = self.policy.max_attempts;

        for attempt in 1..=max {
            match self.sink.post_status(&payload).await {
                Ok(()) => {
                    info!(job_id, status, attempt, "callback delivered");
                    return DeliveryReport {
                        attempts: attempt,
                        delivered: true,
                    };
                }
                Err(e) => {
                    warn!(
                        job_id,
                        status,
                        attempt,
                        max_attempts = max,
                        error = %e,
                        "callback attempt failed"
                    );
                }
            }
            if attempt < max {
                tokio::time::sleep(self.policy.delay_after(attempt)).await;
            }
        }

        error!(job_id, status, attempts = max, "callback delivery exhausted");
        DeliveryReport {
            attempts: max,
            delivered: false,
        }
    }
}

/// [`StatusSink`] that posts to a `PostgREST` RPC endpoint.
///
/// The payload travels as a JSON string under `raw_body`, authenticated with
/// the service credential in the `apikey`, `Authorization`, and
/// `x-export-api-key` headers.
#[derive(Debug, Clone)]
pub struct RpcStatusSink {
    http: reqwest::Client,
    url: String,
    service_key: String,
    timeout: Duration,
}

impl RpcStatusSink {
    #[must_use]
    pub fn new(
        database_url: &str,
        rpc_name: &str,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!(
                "{}/rest/v1/rpc/{rpc_name}",
                database_url.trim_end_matches('/')
            ),
            service_key: service_key.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusSink for RpcStatusSink {
    async fn post_status(&self, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let body = payload
            .to_rpc_body()
            .map_err(|e| CallbackError::Encode(e.to_string()))?;
        let request = self
            .http
            .post(&self.url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("x-export-api-key", &self.service_key)
            .json(&body);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok((status, _))) if status.is_success() => Ok(()),
            Ok(Ok((status, body))) => Err(CallbackError::Rejected { status, body }),
            Ok(Err(e)) if e.is_timeout() => Err(CallbackError::Timeout { timeout_ms }),
            Ok(Err(e)) => Err(CallbackError::Transport(e.to_string())),
            Err(_elapsed) => Err(CallbackError::Timeout { timeout_ms }),
        }
    }
}
