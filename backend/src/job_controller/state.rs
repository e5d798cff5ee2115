//! Shared state of background jobs.
//!
//! CSV imports run outside the request/response cycle (see
//! `services::objects::csv::import`). Workers report progress by sending `JobUpdate` messages
//! on an MPSC channel; `start_job_updater` drains that channel into the `jobs` map, which the
//! status endpoint reads.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Capacity of the update channel.
const UPDATE_BUFFER: usize = 100;

/// Clonable handle on the job map and the update channel, shared as `web::Data`.
#[derive(Clone)]
pub struct JobsState {
    /// Current status of every job, keyed by job id.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Workers running on blocking threads push their updates here.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    /// Creates the state and the receiver `start_job_updater` must be given.
    pub fn new() -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    pub async fn set(&self, job_id: &str, status: JobStatus) {
        self.jobs.write().await.insert(job_id.to_string(), status);
    }

    pub async fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }
}

/// Status change of one job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

/// Applies updates until every sender is gone. Spawned once at startup.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        // A final status written directly by the scheduler wins over late progress messages.
        let finished = matches!(
            jobs.get(&update.job_id),
            Some(JobStatus::Completed(_)) | Some(JobStatus::Failed(_))
        );
        if !finished {
            jobs.insert(update.job_id, update.status);
        }
    }
}
