//! Export job execution on a supervised worker.
//!
//! The HTTP entry point never runs an export inline. It hands an
//! [`ExportTask`] to the [`ExportWorker`], which spawns each job into a
//! `JoinSet` so jobs run concurrently while every one of them stays owned:
//! finished tasks are reaped on a tick (panics are logged) and `stop()` runs
//! whatever is still queued, then waits for everything to finish. A task's outcome is observable through its
//! optional reply channel and through the worker's outcome broadcast.

use std::sync::Arc;

use async_trait::async_trait;
use gitexport_core::{ExportJob, ExportResult};
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use super::callback::{CallbackDelivery, DeliveryReport, RetryPolicy, RpcStatusSink};
use super::client::BoundedClient;
use super::error::HostingError;
use super::github::GitHubHosting;
use super::orchestrator::Publisher;
use crate::config::ExportConfig;
use crate::service::worker::{BackgroundRunnable, BackgroundWorker, WorkerHandle};

const TASK_CHANNEL_CAPACITY: usize = 256;
const OUTCOME_CHANNEL_CAPACITY: usize = 64;
const REAP_INTERVAL_MS: u64 = 1_000;

/// Terminal record of one job execution.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub execution_id: Uuid,
    pub result: ExportResult,
    pub delivery: DeliveryReport,
}

/// Publish-then-report for a single job.
#[derive(Clone)]
pub struct ExportPipeline {
    publisher: Publisher,
    delivery: CallbackDelivery,
}

impl ExportPipeline {
    #[must_use]
    pub fn new(publisher: Publisher, delivery: CallbackDelivery) -> Self {
        Self {
            publisher,
            delivery,
        }
    }

    /// Wires the GitHub adapter and the RPC callback sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`HostingError::Config`] if the hosting client cannot be built.
    pub fn from_config(config: &ExportConfig) -> Result<Self, HostingError> {
        let timeout = config.call_timeout();
        let client = BoundedClient::new(&config.github_api_url, &config.github_token, timeout)?;
        let hosting = GitHubHosting::new(client, &config.repo_owner, &config.repo_name);
        let publisher = Publisher::new(Arc::new(hosting), &config.default_branch);

        let sink = RpcStatusSink::new(
            &config.supabase_url,
            &config.callback_rpc,
            &config.service_role_key,
            timeout,
        );
        let delivery = CallbackDelivery::new(Arc::new(sink), RetryPolicy::default());

        Ok(Self::new(publisher, delivery))
    }

    /// Runs the orchestrator to a terminal result, then delivers exactly one
    /// callback for it.
    pub async fn execute(&self, job: &ExportJob) -> JobOutcome {
        let execution_id = Uuid::new_v4();
        let span = info_span!("export", job_id = job.record_id(), %execution_id);

        async {
            let result = self.publisher.publish(job).await;
            let delivery = self.delivery.deliver(job.record_id(), &result).await;
            JobOutcome {
                job_id: job.record_id().to_string(),
                execution_id,
                result,
                delivery,
            }
        }
        .instrument(span)
        .await
    }
}

/// One unit of work for the export worker.
#[derive(Debug)]
pub struct ExportTask {
    pub job: ExportJob,
    /// Receives the outcome once the callback has been delivered or given up on.
    pub reply: Option<oneshot::Sender<JobOutcome>>,
}

struct ExportRunnable {
    pipeline: Arc<ExportPipeline>,
    tasks: JoinSet<()>,
    outcomes: broadcast::Sender<JobOutcome>,
}

impl ExportRunnable {
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_join(joined);
        }
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "export task did not complete");
    }
}

#[async_trait]
impl BackgroundRunnable for ExportRunnable {
    type Task = ExportTask;

    async fn run(&mut self, task: ExportTask) {
        let pipeline = Arc::clone(&self.pipeline);
        let outcomes = self.outcomes.clone();
        self.tasks.spawn(async move {
            let outcome = pipeline.execute(&task.job).await;
            // No subscribers is fine.
            let _ = outcomes.send(outcome.clone());
            if let Some(reply) = task.reply {
                let _ = reply.send(outcome);
            }
        });
        self.reap();
    }

    async fn on_tick(&mut self) {
        self.reap();
    }

    async fn shutdown(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            log_join(joined);
        }
    }
}

/// Owner of the export worker.
pub struct ExportWorker {
    worker: BackgroundWorker<ExportRunnable>,
    outcomes: broadcast::Sender<JobOutcome>,
}

impl ExportWorker {
    #[must_use]
    pub fn start(pipeline: ExportPipeline) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_CAPACITY);
        let runnable = ExportRunnable {
            pipeline: Arc::new(pipeline),
            tasks: JoinSet::new(),
            outcomes: outcomes.clone(),
        };
        Self {
            worker: BackgroundWorker::start(runnable, TASK_CHANNEL_CAPACITY, REAP_INTERVAL_MS),
            outcomes,
        }
    }

    /// Cloneable submission handle for request handlers.
    #[must_use]
    pub fn submitter(&self) -> ExportSubmitter {
        ExportSubmitter {
            handle: self.worker.handle(),
            outcomes: self.outcomes.clone(),
        }
    }

    /// Stops accepting tasks and waits until every accepted job, queued or
    /// running, has finished and reported.
    pub async fn stop(&mut self) {
        self.worker.stop().await;
    }
}

/// Submit side of the export worker, shared through `AppState`.
#[derive(Clone)]
pub struct ExportSubmitter {
    handle: Option<WorkerHandle<ExportTask>>,
    outcomes: broadcast::Sender<JobOutcome>,
}

impl ExportSubmitter {
    /// Queues a job and returns a receiver for its outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is not running.
    pub async fn submit(&self, job: ExportJob) -> anyhow::Result<oneshot::Receiver<JobOutcome>> {
        let (tx, rx) = oneshot::channel();
        self.send(ExportTask {
            job,
            reply: Some(tx),
        })
        .await?;
        Ok(rx)
    }

    /// Queues a job without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker is not running.
    pub async fn submit_detached(&self, job: ExportJob) -> anyhow::Result<()> {
        self.send(ExportTask { job, reply: None }).await
    }

    /// Receives the outcome of every job finished after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<JobOutcome> {
        self.outcomes.subscribe()
    }

    async fn send(&self, task: ExportTask) -> anyhow::Result<()> {
        match &self.handle {
            Some(handle) => handle.submit(task).await,
            None => Err(anyhow::anyhow!("export worker not running")),
        }
    }
}
