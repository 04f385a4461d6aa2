//! Publishing an export job to the hosting backend and reporting the result.
//!
//! 1. **Client** (`client`): bounded, authenticated HTTP calls
//! 2. **Adapter** (`github`): `HostingApi` over the GitHub REST API
//! 3. **Orchestration** (`orchestrator`): branch, file, pull request
//! 4. **Callback** (`callback`): status delivery with bounded retries
//! 5. **Execution** (`runner`): jobs on a supervised worker

pub mod callback;
pub mod client;
pub mod error;
pub mod github;
pub mod orchestrator;
pub mod runner;

pub use callback::{CallbackDelivery, DeliveryReport, RetryPolicy, RpcStatusSink};
pub use client::{BoundedClient, HostingRequest, HostingResponse};
pub use error::{CallbackError, HostingError, StepFailure};
pub use github::GitHubHosting;
pub use orchestrator::Publisher;
pub use runner::{ExportPipeline, ExportSubmitter, ExportTask, ExportWorker, JobOutcome};
