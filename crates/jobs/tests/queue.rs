//! Integration tests for the background job queue.

use std::sync::Arc;
use std::time::Duration;

use amp_jobs::queue::CANCELLED_BEFORE_START;
use amp_jobs::{
    JobEvent, JobFilter, JobQueue, JobSpec, JobStatus, JobType, QueueConfig, QueueError,
};
use assert_matches::assert_matches;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

fn queue(max_concurrent: usize) -> Arc<JobQueue> {
    JobQueue::start(QueueConfig::default().with_max_concurrent(max_concurrent))
}

fn spec(job_type: JobType) -> JobSpec {
    JobSpec::new(job_type, "test job")
}

/// Poll until `id` reaches `status`, failing after two seconds.
async fn wait_for_status(queue: &JobQueue, id: &str, status: JobStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if queue.get_job(id).map(|j| j.status) == Some(status) {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "job {id} never became {status:?}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Submit a job that occupies a worker until `gate` is cancelled.
fn submit_blocker(queue: &JobQueue, gate: &CancellationToken) -> String {
    let gate = gate.clone();
    queue
        .submit(spec(JobType::Batch), move |_| async move {
            gate.cancelled().await;
            Ok(Value::Null)
        })
        .unwrap()
}

async fn explode() -> anyhow::Result<Value> {
    panic!("decoder exploded")
}

fn failure(message: &'static str) -> anyhow::Result<Value> {
    Err(anyhow::anyhow!(message))
}

// ---------------------------------------------------------------------------
// Test: end-to-end submit, collect, stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sleeping_job_result_is_collected() {
    let queue = queue(10);
    let id = queue
        .submit(spec(JobType::Image), |_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(json!({"url": "http://x/y.png"}))
        })
        .unwrap();

    let results = queue.collect_results(&[id.clone()], Duration::from_secs(5)).await;
    assert_eq!(results, vec![Some(json!({"url": "http://x/y.png"}))]);

    let stats = queue.get_stats();
    assert_eq!(
        (stats.completed, stats.running, stats.pending, stats.failed),
        (1, 0, 0, 0)
    );

    let job = queue.get_job(&id).unwrap();
    assert_eq!(job.progress, 1.0);
    assert!(job.started_at.is_some() && job.completed_at.is_some());
    assert!(job.duration().unwrap() >= Duration::from_millis(100));
}

#[tokio::test]
async fn submit_returns_before_the_job_runs() {
    let queue = queue(1);
    let gate = CancellationToken::new();
    let id = submit_blocker(&queue, &gate);

    assert!(matches!(
        queue.get_job(&id).unwrap().status,
        JobStatus::Pending | JobStatus::Running
    ));
    gate.cancel();
    queue.collect_results(&[id], Duration::from_secs(2)).await;
}

// ---------------------------------------------------------------------------
// Test: failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failing_job_does_not_affect_the_others() {
    let queue = queue(4);
    let mut ids = Vec::new();
    for i in 0..5 {
        let id = queue
            .submit(spec(JobType::Text), move |_| async move {
                if i == 2 {
                    anyhow::bail!("model returned garbage");
                }
                Ok(json!(i))
            })
            .unwrap();
        ids.push(id);
    }

    let results = queue.collect_results(&ids, Duration::from_secs(5)).await;
    assert_eq!(results, vec![Some(json!(0)), Some(json!(1)), None, Some(json!(3)), Some(json!(4))]);

    let failed = queue.get_job(&ids[2]).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("model returned garbage"));

    let stats = queue.get_stats();
    assert_eq!((stats.completed, stats.failed), (4, 1));
}

#[tokio::test]
async fn panicking_job_is_recorded_and_worker_survives() {
    let queue = queue(1);
    let panicky = queue
        .submit(spec(JobType::Video), |_| explode())
        .unwrap();
    let healthy = queue
        .submit(spec(JobType::Video), |_| async { Ok(json!("ok")) })
        .unwrap();

    let results = queue
        .collect_results(&[panicky.clone(), healthy], Duration::from_secs(5))
        .await;

    assert_eq!(results, vec![None, Some(json!("ok"))]);
    let job = queue.get_job(&panicky).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("decoder exploded"));
}

// ---------------------------------------------------------------------------
// Test: scheduling order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pending_jobs_start_by_priority_then_submission_order() {
    let queue = queue(1);
    let gate = CancellationToken::new();
    let blocker = submit_blocker(&queue, &gate);
    wait_for_status(&queue, &blocker, JobStatus::Running).await;

    let order = Arc::new(Mutex::new(Vec::new()));
    let mut ids = Vec::new();
    for (label, priority) in [("low", 1), ("high-a", 9), ("mid", 5), ("high-b", 9)] {
        let order = Arc::clone(&order);
        let id = queue
            .submit(spec(JobType::Product).with_priority(priority), move |_| async move {
                order.lock().push(label);
                Ok(Value::Null)
            })
            .unwrap();
        ids.push(id);
    }

    gate.cancel();
    queue.collect_results(&ids, Duration::from_secs(5)).await;

    assert_eq!(*order.lock(), vec!["high-a", "high-b", "mid", "low"]);
}

#[tokio::test]
async fn running_jobs_never_exceed_max_concurrent() {
    let queue = queue(2);
    let gate = CancellationToken::new();
    let ids: Vec<String> = (0..5).map(|_| submit_blocker(&queue, &gate)).collect();

    wait_for_status(&queue, &ids[0], JobStatus::Running).await;
    wait_for_status(&queue, &ids[1], JobStatus::Running).await;
    let stats = queue.get_stats();
    assert_eq!((stats.running, stats.pending), (2, 3));

    gate.cancel();
    queue.collect_results(&ids, Duration::from_secs(5)).await;
    assert_eq!(queue.get_stats().completed, 5);
}

// ---------------------------------------------------------------------------
// Test: cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelling_a_pending_job_fails_it_before_start() {
    let queue = queue(1);
    let gate = CancellationToken::new();
    let blocker = submit_blocker(&queue, &gate);
    wait_for_status(&queue, &blocker, JobStatus::Running).await;

    let ran = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&ran);
    let victim = queue
        .submit(spec(JobType::Blog), move |_| async move {
            *flag.lock() = true;
            Ok(Value::Null)
        })
        .unwrap();

    assert!(queue.cancel(&victim));
    let job = queue.get_job(&victim).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(CANCELLED_BEFORE_START));
    assert!(!queue.cancel(&victim), "terminal jobs cannot be cancelled");

    gate.cancel();
    queue.collect_results(&[blocker], Duration::from_secs(2)).await;
    assert!(!*ran.lock());
}

#[tokio::test]
async fn cancelling_a_running_job_fires_its_handle() {
    let queue = queue(1);
    let id = queue
        .submit(spec(JobType::Workflow), |ctx| async move {
            ctx.cancel_handle().cancelled().await;
            failure("stopped by request")
        })
        .unwrap();
    wait_for_status(&queue, &id, JobStatus::Running).await;

    assert!(queue.cancel(&id));
    queue.collect_results(&[id.clone()], Duration::from_secs(2)).await;

    let job = queue.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("stopped by request"));
}

#[tokio::test]
async fn cancelling_unknown_job_returns_false() {
    assert!(!queue(1).cancel("no-such-job"));
}

// ---------------------------------------------------------------------------
// Test: progress, steps and logs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn progress_is_clamped_and_visible_while_running() {
    let queue = queue(1);
    let gate = Arc::new(Notify::new());
    let job_gate = Arc::clone(&gate);
    let id = queue
        .submit(spec(JobType::Campaign), move |ctx| async move {
            ctx.set_step("rendering");
            ctx.set_progress(1.7);
            job_gate.notified().await;
            ctx.set_progress(-3.0);
            job_gate.notified().await;
            Ok(Value::Null)
        })
        .unwrap();

    wait_for_status(&queue, &id, JobStatus::Running).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    let job = queue.get_job(&id).unwrap();
    assert_eq!(job.progress, 1.0);
    assert_eq!(job.current_step.as_deref(), Some("rendering"));

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(queue.get_job(&id).unwrap().progress, 0.0);

    gate.notify_one();
    queue.collect_results(&[id], Duration::from_secs(2)).await;
}

#[tokio::test]
async fn logs_keep_only_the_most_recent_lines() {
    let queue = queue(1);
    let id = queue
        .submit(spec(JobType::Batch), |ctx| async move {
            for i in 0..150 {
                ctx.log(format!("line {i}"));
            }
            Ok(Value::Null)
        })
        .unwrap();

    queue.collect_results(&[id.clone()], Duration::from_secs(2)).await;
    let logs = queue.get_job(&id).unwrap().logs;
    assert_eq!(logs.len(), 100);
    assert_eq!(logs.first().unwrap().message, "line 50");
    assert_eq!(logs.last().unwrap().message, "line 149");
}

#[tokio::test]
async fn context_kept_past_completion_cannot_change_the_job() {
    let queue = queue(1);
    let mut rx = queue.subscribe();
    let kept = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&kept);
    let id = queue
        .submit(spec(JobType::Text), move |ctx| async move {
            ctx.set_step("writing");
            *slot.lock() = Some(ctx.clone());
            Ok(json!("final"))
        })
        .unwrap();
    queue.collect_results(&[id.clone()], Duration::from_secs(2)).await;

    let ctx = kept.lock().take().unwrap();
    ctx.set_progress(0.2);
    ctx.set_step("late write");
    ctx.log("late line");

    let job = queue.get_job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 1.0);
    assert_eq!(job.current_step.as_deref(), Some("writing"));
    assert!(job.logs.iter().all(|line| line.message != "late line"));

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event.msg_type());
    }
    assert_eq!(last, Some("job_completed"));
}

// ---------------------------------------------------------------------------
// Test: events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lifecycle_events_are_broadcast_in_order() {
    let queue = queue(1);
    let mut rx = queue.subscribe();

    let id = queue
        .submit(spec(JobType::Image), |ctx| async move {
            ctx.set_progress(0.5);
            Ok(json!("done"))
        })
        .unwrap();

    let mut types = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event before timeout")
            .expect("channel open");
        assert_eq!(event.job_id(), id);
        types.push(event.msg_type());
        if event.is_terminal() {
            break;
        }
    }
    assert_eq!(types, vec!["job_submitted", "job_started", "job_progress", "job_completed"]);
}

#[tokio::test]
async fn failed_job_event_carries_error() {
    let queue = queue(1);
    let mut rx = queue.subscribe();
    queue
        .submit(spec(JobType::Text), |_| async { failure("quota exhausted") })
        .unwrap();

    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if let JobEvent::Failed { error, .. } = event {
            assert_eq!(error, "quota exhausted");
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Test: waiting, listing and cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collect_results_times_out_with_none() {
    let queue = queue(2);
    let stuck = queue
        .submit(spec(JobType::Video), |_| async {
            std::future::pending::<()>().await;
            Ok(Value::Null)
        })
        .unwrap();
    let quick = queue
        .submit(spec(JobType::Video), |_| async { Ok(json!(1)) })
        .unwrap();

    let results = queue
        .collect_results(
            &[stuck, quick, "unknown-id".to_string()],
            Duration::from_millis(200),
        )
        .await;
    assert_eq!(results, vec![None, Some(json!(1)), None]);
}

#[tokio::test]
async fn wait_for_all_summarizes_the_batch() {
    let queue = queue(3);
    let ids: Vec<String> = (0..4)
        .map(|i| {
            queue
                .submit(spec(JobType::Batch), move |_| async move {
                    if i == 0 {
                        anyhow::bail!("bad input");
                    }
                    Ok(json!(i))
                })
                .unwrap()
        })
        .collect();

    let outcome = queue.wait_for_all(&ids, Duration::from_secs(5)).await;
    assert_eq!((outcome.completed, outcome.failed, outcome.total), (3, 1, 4));
    assert!((outcome.success_rate - 0.75).abs() < f64::EPSILON);

    let empty = queue.wait_for_all(&[], Duration::from_secs(1)).await;
    assert_eq!(empty.total, 0);
    assert_eq!(empty.success_rate, 0.0);
}

#[tokio::test]
async fn list_filters_and_sorts_then_clear_removes_finished() {
    let queue = queue(2);
    let a = queue
        .submit(spec(JobType::Image).with_source("ads").with_priority(2), |_| async {
            Ok(Value::Null)
        })
        .unwrap();
    let b = queue
        .submit(spec(JobType::Image).with_source("ads").with_priority(8), |_| async {
            Ok(Value::Null)
        })
        .unwrap();
    let c = queue
        .submit(spec(JobType::Blog).with_source("blog"), |_| async { Ok(Value::Null) })
        .unwrap();
    queue
        .collect_results(&[a.clone(), b.clone(), c.clone()], Duration::from_secs(2))
        .await;

    let ads: Vec<String> = queue
        .list_jobs(&JobFilter::default().source("ads"))
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(ads, vec![b, a]);
    assert_eq!(queue.list_jobs(&JobFilter::default().job_type(JobType::Blog)).len(), 1);

    let stats = queue.get_stats();
    assert_eq!(stats.by_source["ads"], 2);
    assert_eq!(stats.by_type[&JobType::Image], 2);

    assert_eq!(queue.clear_finished(Some("ads")), 2);
    assert_eq!(queue.get_stats().total, 1);
    assert_eq!(queue.clear_finished(None), 1);
    assert!(queue.get_job(&c).is_none());
}

// ---------------------------------------------------------------------------
// Test: shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_rejects_new_work_and_leaves_pending_jobs() {
    let queue = queue(1);
    let running = queue
        .submit(spec(JobType::Workflow), |ctx| async move {
            ctx.cancel_handle().cancelled().await;
            failure("interrupted by shutdown")
        })
        .unwrap();
    wait_for_status(&queue, &running, JobStatus::Running).await;
    let waiting = queue
        .submit(spec(JobType::Workflow), |_| async { Ok(Value::Null) })
        .unwrap();

    queue.shutdown().await;

    assert_eq!(queue.get_job(&running).unwrap().status, JobStatus::Failed);
    assert_eq!(queue.get_job(&waiting).unwrap().status, JobStatus::Pending);
    assert_matches!(
        queue.submit(spec(JobType::Text), |_| async { Ok(Value::Null) }),
        Err(QueueError::ShutDown)
    );
}
