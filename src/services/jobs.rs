use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{now_epoch, Job, JobStatus, RecordStatus};
use crate::services::task_sync;
use crate::utils::logging::*;

/// Compute the terminal status of a job from its per-record counts.
pub fn aggregate_status(success: usize, accepted: usize, error: usize, total: usize) -> JobStatus {
    if error == 0 && accepted == 0 {
        JobStatus::Success
    } else if success == 0 && accepted == 0 {
        JobStatus::Error
    } else if success == total {
        JobStatus::Success
    } else if success == 0 && error == 0 {
        JobStatus::Accepted
    } else {
        JobStatus::Partial
    }
}

/// In-memory batch job tracker. Owns the job table exclusively; every
/// read and write goes through the inner lock, which is never held
/// across a webhook call. Cheap to clone, one instance per process
/// (constructed in `main`, or per test).
#[derive(Clone)]
pub struct JobStore {
    http: Client,
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a pending job and spawn its worker. Returns the job id
    /// immediately; the caller suspends only for the table insert.
    pub async fn enqueue(
        &self,
        webhook_url: String,
        records: Vec<Value>,
        timeout: Duration,
    ) -> String {
        let job_id = Uuid::new_v4().simple().to_string();

        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(job_id.clone(), Job::pending());
        }
        log_info(&format!(
            "enqueue_batch_job {}: {} record(s), timeout={:?}",
            job_id,
            records.len(),
            timeout
        ));

        let store = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            // The worker runs in its own task so a panic surfaces as a
            // JoinError here instead of leaving the job stuck in running.
            let worker = tokio::spawn({
                let store = store.clone();
                let id = id.clone();
                async move { store.run_worker(id, webhook_url, records, timeout).await }
            });
            if worker.await.is_err() {
                log_error(&format!("job {} worker crashed", id));
                store.fail_job(&id).await;
            }
        });

        job_id
    }

    /// Snapshot a job by id. With `pop` the job is removed in the same
    /// locked operation that produces the snapshot, so a terminal job
    /// can be read exactly once.
    pub async fn get(&self, job_id: &str, pop: bool) -> Option<Job> {
        if pop {
            let mut jobs = self.jobs.write().await;
            jobs.remove(job_id)
        } else {
            let jobs = self.jobs.read().await;
            jobs.get(job_id).cloned()
        }
    }

    async fn run_worker(
        self,
        job_id: String,
        webhook_url: String,
        records: Vec<Value>,
        timeout: Duration,
    ) {
        log_info(&format!(
            "job {} worker started (records={})",
            job_id,
            records.len()
        ));

        let mut results = Vec::with_capacity(records.len());
        let mut success_count = 0usize;
        let mut accepted_count = 0usize;
        let mut error_count = 0usize;

        for entry in &records {
            let result =
                task_sync::process_single_record(&self.http, &webhook_url, entry, timeout).await;
            match result.status {
                RecordStatus::Success => success_count += 1,
                RecordStatus::Accepted => accepted_count += 1,
                RecordStatus::Error => error_count += 1,
            }
            results.push(result);

            // Publish the partial prefix so pollers see live progress.
            let mut jobs = self.jobs.write().await;
            if let Some(job) = jobs.get_mut(&job_id) {
                job.results = results.clone();
                job.status = JobStatus::Running;
                job.updated_at = Some(now_epoch());
            }
        }

        let total = results.len();
        let overall = aggregate_status(success_count, accepted_count, error_count, total);

        {
            let mut jobs = self.jobs.write().await;
            if let Some(job) = jobs.get_mut(&job_id) {
                job.status = overall;
                job.results = results;
                job.completed_at = Some(now_epoch());
            }
        }
        log_info(&format!(
            "job {} worker finished: total={} success={} accepted={} error={} status={:?}",
            job_id, total, success_count, accepted_count, error_count, overall
        ));
    }

    /// Fail-safe for a crashed worker: partial progress can no longer be
    /// trusted, so the results are discarded along with it.
    async fn fail_job(&self, job_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.status = JobStatus::Error;
            job.results = Vec::new();
            job.completed_at = Some(now_epoch());
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
