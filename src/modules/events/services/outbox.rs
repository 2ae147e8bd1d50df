use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::distributor::EventDistributor;
use crate::core::{AppError, Result};
use crate::modules::scoring::models::CreditScore;

/// Work handed off to run after the triggering request has completed
#[derive(Debug, Clone)]
pub enum DeferredJob {
    Publish {
        topic: String,
        payload: serde_json::Value,
        description: String,
    },
    DistributeScore {
        score: CreditScore,
        previous: Option<CreditScore>,
    },
}

impl DeferredJob {
    fn label(&self) -> &str {
        match self {
            DeferredJob::Publish { topic, .. } => topic,
            DeferredJob::DistributeScore { .. } => "distribute_credit_score",
        }
    }
}

/// Fire-and-forget front of the distributor
///
/// Jobs are kept in memory only; anything queued at shutdown is lost.
#[derive(Clone)]
pub struct DeferredPublisher {
    sender: mpsc::Sender<DeferredJob>,
}

impl DeferredPublisher {
    /// Start the worker task draining the queue into `distributor`
    pub fn spawn(distributor: Arc<EventDistributor>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<DeferredJob>(capacity.max(1));

        let handle = tokio::spawn(async move {
            info!(capacity, "Deferred publisher started");
            while let Some(job) = receiver.recv().await {
                run_job(&distributor, job).await;
            }
            info!("Deferred publisher stopped");
        });

        (Self { sender }, handle)
    }

    /// Queue a job without waiting; a full or closed queue is a distribution error
    pub fn enqueue(&self, job: DeferredJob) -> Result<()> {
        let label = job.label().to_string();
        self.sender.try_send(job).map_err(|e| {
            warn!(job = %label, error = %e, "Deferred job rejected");
            AppError::distribution(format!("deferred queue rejected {}: {}", label, e))
        })?;
        debug!(job = %label, "Deferred job queued");
        Ok(())
    }
}

async fn run_job(distributor: &EventDistributor, job: DeferredJob) {
    match job {
        DeferredJob::Publish {
            topic,
            payload,
            description,
        } => {
            if let Err(e) = distributor.publish(&topic, &payload, &description).await {
                error!(topic = %topic, error = %e, "Deferred publish failed");
            }
        }
        DeferredJob::DistributeScore { score, previous } => {
            let result = distributor
                .distribute_credit_score(&score, previous.as_ref())
                .await;
            if !result.errors.is_empty() {
                warn!(
                    score_id = %result.score_id,
                    errors = ?result.errors,
                    "Deferred distribution finished with errors"
                );
            }
        }
    }
}
