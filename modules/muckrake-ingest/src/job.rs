//! Ingestion job lifecycle.
//!
//! One job id has exactly one writer (the run that created it), so saves are
//! plain last-write-wins updates. Status transitions are monotonic:
//! pending → running → completed|failed, and terminal states never change.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{info, warn};

use muckrake_common::types::*;
use muckrake_common::MuckrakeError;
use muckrake_store::{records, RecordStore};

const POLL_INTERVAL_MS: u64 = 500;

pub struct JobTracker {
    store: Arc<dyn RecordStore>,
    job: IngestionJob,
}

impl JobTracker {
    /// Create the pending job record for today's run.
    pub async fn create(store: Arc<dyn RecordStore>) -> Result<Self, MuckrakeError> {
        let now = Utc::now();
        let job = IngestionJob {
            id: String::new(),
            date: now.date_naive(),
            status: JobStatus::Pending,
            progress: "queued".to_string(),
            steps: Vec::new(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        let job = records::create_job(store.as_ref(), &job).await?;
        Ok(Self { store, job })
    }

    pub fn id(&self) -> &str {
        &self.job.id
    }

    /// Append a timestamped step and surface it as the current progress.
    pub async fn step(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.job.steps.push(JobStep {
            ts: Utc::now(),
            message: message.clone(),
        });
        self.job.progress = message;
        self.save().await;
    }

    pub async fn running(&mut self) {
        self.transition(JobStatus::Running, None, None).await;
    }

    pub async fn complete(&mut self, result: JobResult) {
        info!(
            job_id = %self.job.id,
            processed = result.articles_processed,
            failed = result.articles_failed,
            "ingestion job completed"
        );
        self.transition(JobStatus::Completed, Some(result), None).await;
    }

    pub async fn fail(&mut self, error: String) {
        warn!(job_id = %self.job.id, error = %error, "ingestion job failed");
        self.transition(JobStatus::Failed, None, Some(error)).await;
    }

    async fn transition(
        &mut self,
        status: JobStatus,
        result: Option<JobResult>,
        error: Option<String>,
    ) {
        if self.job.status.is_terminal() {
            warn!(job_id = %self.job.id, current = %self.job.status, attempted = %status,
                "ignoring transition out of terminal state");
            return;
        }
        self.job.status = status;
        if result.is_some() {
            self.job.result = result;
        }
        if error.is_some() {
            self.job.error = error;
        }
        self.save().await;
    }

    /// Persist the record. Ingestion favors partial success: if the store
    /// hiccups mid-run the step is lost, not the run.
    async fn save(&mut self) {
        self.job.updated_at = Utc::now();
        if let Err(e) = records::save_job(self.store.as_ref(), &self.job).await {
            warn!(job_id = %self.job.id, error = %e, "failed to save job record");
        }
    }
}

/// Poll a job until it settles. A job that reaches neither terminal state
/// within `ceiling` is a timeout failure — never silent success.
pub async fn await_terminal<S: RecordStore + ?Sized>(
    store: &S,
    job_id: &str,
    ceiling: Duration,
) -> Result<IngestionJob, MuckrakeError> {
    let deadline = Instant::now() + ceiling;
    loop {
        let job = records::get_job(store, job_id).await?;
        if job.status.is_terminal() {
            return Ok(job);
        }
        if Instant::now() >= deadline {
            return Err(MuckrakeError::Network(format!(
                "job {job_id} did not finish within {}s",
                ceiling.as_secs()
            )));
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}
