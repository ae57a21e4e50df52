//! In-memory job registry and cooperative cancellation
//!
//! Long-running operations (summarize, index) run as jobs with opaque
//! ids so external orchestrators can poll for `running | completed |
//! failed`. The registry lives in process memory only: jobs do not
//! survive a restart and are not resumed automatically. Committed
//! partial progress remains valid either way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Cooperative cancellation flag, checked at every suspension point
/// (file IO, parsing, store transactions, model host calls).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Lifecycle state reported to pollers
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
struct JobRecord {
    name: String,
    status: JobStatus,
    /// Final output on completion, error message on failure
    message: Option<String>,
    cancel: CancelToken,
}

/// Registry of in-flight and finished jobs for this process
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<u64, JobRecord>>,
    next_id: AtomicU64,
}

static REGISTRY: Lazy<JobRegistry> = Lazy::new(JobRegistry::default);

/// The process-wide registry
pub fn registry() -> &'static JobRegistry {
    &REGISTRY
}

impl JobRegistry {
    /// Spawn `work` on a background thread and return its job id.
    /// The closure receives the job's cancel token.
    pub fn spawn<F>(&'static self, name: &str, work: F) -> u64
    where
        F: FnOnce(&CancelToken) -> crate::error::Result<String> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelToken::new();
        self.jobs.write().insert(
            id,
            JobRecord {
                name: name.to_string(),
                status: JobStatus::Running,
                message: None,
                cancel: cancel.clone(),
            },
        );

        std::thread::spawn(move || {
            let outcome = work(&cancel);
            let mut jobs = self.jobs.write();
            if let Some(record) = jobs.get_mut(&id) {
                match outcome {
                    Ok(message) => {
                        record.status = JobStatus::Completed;
                        record.message = Some(message);
                    }
                    Err(e) => {
                        record.status = JobStatus::Failed;
                        record.message = Some(e.to_string());
                    }
                }
            }
        });

        id
    }

    /// Status and final message of a job, or None for unknown ids
    pub fn status(&self, id: u64) -> Option<(JobStatus, Option<String>)> {
        self.jobs
            .read()
            .get(&id)
            .map(|record| (record.status.clone(), record.message.clone()))
    }

    /// Request cancellation of a running job. Returns false for unknown ids.
    pub fn cancel(&self, id: u64) -> bool {
        match self.jobs.read().get(&id) {
            Some(record) => {
                record.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Names of currently running jobs
    pub fn running(&self) -> Vec<(u64, String)> {
        self.jobs
            .read()
            .iter()
            .filter(|(_, record)| record.status == JobStatus::Running)
            .map(|(id, record)| (*id, record.name.clone()))
            .collect()
    }
}
