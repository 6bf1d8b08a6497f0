use std::sync::Arc;
use std::time::Duration;

use kshell::display::DisplayValue;
use kshell::job::{JobManager, JobStatus};

#[tokio::test]
async fn jobs_are_listed_in_submission_order_and_settle_to_completed() {
    let mgr = Arc::new(JobManager::new());
    let first = mgr.submit("scan orders", async { Ok(DisplayValue::Unit) });
    let second = mgr.submit("scan payments", async { Ok(DisplayValue::Unit) });

    tokio::time::sleep(Duration::from_millis(20)).await;

    let listed = mgr.list();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first);
    assert_eq!(listed[1].id, second);
    assert!(listed.iter().all(|j| j.is_finished()));
    assert_eq!(mgr.get(first).unwrap().status(), JobStatus::Completed);
}

#[tokio::test]
async fn a_job_that_returns_err_is_reported_as_failed() {
    use kshell::error::Error;

    let mgr = Arc::new(JobManager::new());
    let id = mgr.submit("broken", async { Err(Error::Internal("boom".to_string())) });
    tokio::time::sleep(Duration::from_millis(20)).await;

    match mgr.get(id).unwrap().status() {
        JobStatus::Failed(msg) => assert!(msg.contains("boom")),
        other => panic!("expected Failed, got {other:?}"),
    }
}
