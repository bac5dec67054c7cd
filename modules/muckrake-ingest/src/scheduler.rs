//! Optional interval scheduler for ingestion runs.
//!
//! Fires a normal-mode trigger on a fixed interval and keeps a bounded ring
//! buffer of recent run summaries for observability. The scheduler is just
//! another polling client: it waits on the job record with a hard ceiling
//! and records a timeout as a failed run, never as silent success.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use muckrake_common::types::IngestMode;
use muckrake_store::RecordStore;

use crate::job::await_terminal;
use crate::orchestrator::IngestOrchestrator;

const RUN_HISTORY_CAPACITY: usize = 20;
const RUN_CEILING: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub articles_processed: u32,
}

/// Bounded ring of the most recent run summaries, newest first on read.
#[derive(Clone, Default)]
pub struct RunHistory(Arc<Mutex<VecDeque<RunSummary>>>);

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, summary: RunSummary) {
        let mut runs = self.0.lock().expect("run history lock poisoned");
        if runs.len() == RUN_HISTORY_CAPACITY {
            runs.pop_front();
        }
        runs.push_back(summary);
    }

    pub fn recent(&self) -> Vec<RunSummary> {
        let runs = self.0.lock().expect("run history lock poisoned");
        runs.iter().rev().cloned().collect()
    }
}

pub struct IngestScheduler {
    orchestrator: IngestOrchestrator,
    store: Arc<dyn RecordStore>,
    interval: Duration,
    history: RunHistory,
}

impl IngestScheduler {
    pub fn new(
        orchestrator: IngestOrchestrator,
        store: Arc<dyn RecordStore>,
        interval_minutes: u64,
    ) -> Self {
        Self {
            orchestrator,
            store,
            interval: Duration::from_secs(interval_minutes * 60),
            history: RunHistory::new(),
        }
    }

    pub fn history(&self) -> RunHistory {
        self.history.clone()
    }

    /// Spawn the interval loop. Runs until the process exits.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        info!(interval_secs = self.interval.as_secs(), "ingest scheduler starting");
        tokio::spawn(async move {
            loop {
                self.run_one().await;
                tokio::time::sleep(self.interval).await;
            }
        })
    }

    async fn run_one(&self) {
        let started_at = Utc::now();
        let job_id = match self.orchestrator.trigger(IngestMode::Normal).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "scheduled ingestion trigger failed");
                self.history.push(RunSummary {
                    job_id: String::new(),
                    started_at,
                    finished_at: Utc::now(),
                    success: false,
                    articles_processed: 0,
                });
                return;
            }
        };

        match await_terminal(self.store.as_ref(), &job_id, RUN_CEILING).await {
            Ok(job) => {
                let processed = job
                    .result
                    .as_ref()
                    .map(|r| r.articles_processed)
                    .unwrap_or(0);
                self.history.push(RunSummary {
                    job_id,
                    started_at,
                    finished_at: Utc::now(),
                    success: job.status == muckrake_common::types::JobStatus::Completed,
                    articles_processed: processed,
                });
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "scheduled ingestion run timed out");
                self.history.push(RunSummary {
                    job_id,
                    started_at,
                    finished_at: Utc::now(),
                    success: false,
                    articles_processed: 0,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded_and_newest_first() {
        let history = RunHistory::new();
        for i in 0..(RUN_HISTORY_CAPACITY + 5) {
            history.push(RunSummary {
                job_id: format!("job-{i}"),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                success: true,
                articles_processed: i as u32,
            });
        }

        let recent = history.recent();
        assert_eq!(recent.len(), RUN_HISTORY_CAPACITY);
        assert_eq!(recent[0].job_id, format!("job-{}", RUN_HISTORY_CAPACITY + 4));
        assert_eq!(recent.last().unwrap().job_id, "job-5");
    }
}
