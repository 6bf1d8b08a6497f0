//! Job manager (C8, §4.8): tracks asynchronous jobs spawned by commands,
//! reports status, supports cooperative cancellation. The job table is
//! guarded by a single mutex (§5); job ids are a lock-free atomic counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::display::DisplayValue;
use crate::error::{Error, Result};
use crate::scan::{new_cancel_flag, CancelFlag};

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

pub struct JobHandle {
    pub id: JobId,
    pub label: String,
    pub started: Instant,
    cancel: CancelFlag,
    done: Arc<AtomicBool>,
    status: Arc<Mutex<JobStatus>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl JobHandle {
    pub fn status(&self) -> JobStatus {
        self.status.lock().expect("job status lock poisoned").clone()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join
            .lock()
            .expect("job join handle lock poisoned")
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }
}

#[derive(Default)]
pub struct JobManager {
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, Arc<JobHandle>>>,
}

impl JobManager {
    pub fn new() -> Self {
        JobManager { next_id: AtomicU64::new(1), jobs: Mutex::new(HashMap::new()) }
    }

    /// Submit `fut` as job `label`. The returned id is assigned before the
    /// task starts running.
    pub fn submit<F>(self: &Arc<Self>, label: impl Into<String>, fut: F) -> JobId
    where
        F: std::future::Future<Output = Result<DisplayValue>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let label = label.into();
        let cancel = new_cancel_flag();
        let done = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(JobStatus::Running));

        let done_for_task = Arc::clone(&done);
        let status_for_task = Arc::clone(&status);
        let label_for_task = label.clone();
        let join = tokio::task::spawn(async move {
            let outcome = fut.await;
            let final_status = match outcome {
                Ok(_) => JobStatus::Completed,
                Err(e) => {
                    warn!("job '{label_for_task}' failed: {e}");
                    JobStatus::Failed(e.to_string())
                }
            };
            *status_for_task.lock().expect("job status lock poisoned") = final_status;
            done_for_task.store(true, Ordering::Relaxed);
        });

        let handle = Arc::new(JobHandle {
            id,
            label,
            started: Instant::now(),
            cancel,
            done,
            status,
            join: Mutex::new(Some(join)),
        });
        self.jobs.lock().expect("job table lock poisoned").insert(id, handle);
        debug!("submitted job {id}");
        id
    }

    pub fn list(&self) -> Vec<Arc<JobHandle>> {
        let mut jobs: Vec<_> = self.jobs.lock().expect("job table lock poisoned").values().cloned().collect();
        jobs.sort_by_key(|j| j.id);
        jobs
    }

    pub fn get(&self, id: JobId) -> Option<Arc<JobHandle>> {
        self.jobs.lock().expect("job table lock poisoned").get(&id).cloned()
    }

    /// Set the job's cancellation flag; the scan engine polls it between
    /// fetch batches and between partitions (§5, §8).
    pub fn cancel(&self, id: JobId) -> Result<()> {
        let job = self.get(id).ok_or_else(|| Error::Internal(format!("no such job: {id}")))?;
        job.cancel.store(true, Ordering::Relaxed);
        if !job.done.load(Ordering::Relaxed) {
            *job.status.lock().expect("job status lock poisoned") = JobStatus::Cancelled;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_assigns_monotonic_ids_and_reports_completion() {
        let mgr = Arc::new(JobManager::new());
        let id1 = mgr.submit("job-a", async { Ok(DisplayValue::Unit) });
        let id2 = mgr.submit("job-b", async { Ok(DisplayValue::Unit) });
        assert!(id2 > id1);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(mgr.get(id1).unwrap().status(), JobStatus::Completed);
        assert_eq!(mgr.get(id2).unwrap().status(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn cancel_marks_status_before_completion() {
        let mgr = Arc::new(JobManager::new());
        let id = mgr.submit("slow", async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(DisplayValue::Unit)
        });
        mgr.cancel(id).unwrap();
        assert_eq!(mgr.get(id).unwrap().status(), JobStatus::Cancelled);
        assert!(mgr.get(id).unwrap().cancel_requested());
    }

    #[tokio::test]
    async fn cancel_unknown_job_is_internal_error() {
        let mgr = Arc::new(JobManager::new());
        assert!(matches!(mgr.cancel(999), Err(Error::Internal(_))));
    }
}
