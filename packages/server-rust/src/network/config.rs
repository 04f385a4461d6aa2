//! Network configuration types for the export server.

use std::time::Duration;

use crate::export::callback::RetryPolicy;
use crate::export::client::DEFAULT_CALL_TIMEOUT;
use crate::export::orchestrator::MAX_HOSTING_CALLS;

/// Headroom kept between the slowest possible export and the export wait.
const EXPORT_SLACK: Duration = Duration::from_secs(10);

/// Bind address and HTTP limits for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Maximum time a request may take end to end. Answered with 408.
    ///
    /// Export requests stop waiting for their job at [`Self::export_wait`],
    /// which is always shorter, so they are acknowledged with 200 instead.
    pub request_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
}

impl NetworkConfig {
    /// Request timeout that lets a waiting export request see the outcome
    /// of even the slowest job when every outbound call is bounded by
    /// `call_timeout`.
    #[must_use]
    pub fn request_timeout_for(call_timeout: Duration) -> Duration {
        let policy = RetryPolicy::default();
        let worst_case =
            call_timeout * (MAX_HOSTING_CALLS + policy.max_attempts) + policy.total_backoff();
        (worst_case + EXPORT_SLACK) * 10 / 9
    }

    /// How long the export handler waits for a job's outcome before
    /// acknowledging it as accepted. Kept below `request_timeout`.
    #[must_use]
    pub fn export_wait(&self) -> Duration {
        self.request_timeout * 9 / 10
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            request_timeout: Self::request_timeout_for(DEFAULT_CALL_TIMEOUT),
            max_body_bytes: 5 * 1024 * 1024,
            drain_timeout: Duration::from_secs(30),
        }
    }
}
