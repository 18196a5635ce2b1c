use rebound::{
    ErrorCategory, InstantSleeper, RetryConfig, RetryError, RetryExecutor, Sleeper,
    TrackingSleeper,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
struct CallError(String);

/// Backoff that only ends through cancellation.
#[derive(Debug)]
struct NeverWake;

impl Sleeper for NeverWake {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(futures::future::pending::<()>())
    }
}

fn three_attempts() -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(50))
        .max_delay(Duration::from_millis(500))
        .build()
        .expect("valid config")
}

/// Fails with `messages[n]` on call `n`, then succeeds once the list runs out.
fn scripted(
    calls: Arc<AtomicUsize>,
    messages: &'static [&'static str],
) -> impl FnMut() -> Pin<Box<dyn Future<Output = Result<&'static str, CallError>> + Send>> {
    move || {
        let calls = calls.clone();
        Box::pin(async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            match messages.get(n) {
                Some(message) => Err(CallError(format!("{message} (call {})", n + 1))),
                None => Ok("done"),
            }
        })
    }
}

#[tokio::test]
async fn auth_failure_is_not_retried() {
    let sleeper = TrackingSleeper::new();
    let exec = RetryExecutor::builder().config(three_attempts()).with_sleeper(sleeper.clone()).build();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = exec.execute_as("login", scripted(calls.clone(), &["403 forbidden"; 3])).await;

    assert_eq!(result.unwrap_err().into_inner(), Some(CallError("403 forbidden (call 1)".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sleeper.call_count(), 0);

    let state = exec.retry_info("login").unwrap();
    assert_eq!(state.attempts.len(), 1);
    assert!(!state.can_retry);
    assert!(!state.is_retrying);
    assert_eq!(exec.metrics().error_categories.get(&ErrorCategory::Auth), Some(&1));
}

#[tokio::test]
async fn auth_code_glued_to_text_is_not_retried() {
    let exec = RetryExecutor::builder().with_sleeper(InstantSleeper).build();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = exec.execute_as("gateway", scripted(calls.clone(), &["HTTP403 Access denied"; 3])).await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!exec.retry_info("gateway").unwrap().can_retry);
    assert_eq!(exec.metrics().error_categories.get(&ErrorCategory::Auth), Some(&1));
}

#[tokio::test]
async fn network_failure_exhausts_budget() {
    let sleeper = TrackingSleeper::new();
    let exec = RetryExecutor::builder().config(three_attempts()).with_sleeper(sleeper.clone()).build();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = exec.execute_as("sync", scripted(calls.clone(), &["network error"; 5])).await;

    assert_eq!(result.unwrap_err().into_inner(), Some(CallError("network error (call 3)".into())));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.call_count(), 2, "one wait between each pair of attempts");

    let state = exec.retry_info("sync").unwrap();
    assert_eq!(state.attempts.len(), 3);
    assert!(state.attempts.iter().all(|a| !a.succeeded && a.error_message.is_some()));
    assert!(!state.can_retry);

    let metrics = exec.metrics();
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.error_categories.get(&ErrorCategory::Network), Some(&1));
}

#[tokio::test]
async fn rate_limit_is_retried_until_success() {
    let exec = RetryExecutor::builder().config(three_attempts()).with_sleeper(InstantSleeper).build();
    let before = exec.metrics().total_requests;
    let calls = Arc::new(AtomicUsize::new(0));

    let result = exec
        .execute_as("quota", scripted(calls.clone(), &["429 rate limit", "429 rate limit"]))
        .await;

    assert_eq!(result.unwrap(), "done");
    let state = exec.retry_info("quota").unwrap();
    assert_eq!(state.attempts.len(), 3);
    assert!(state.attempts[2].succeeded);
    assert!(!state.attempts[0].succeeded && !state.attempts[1].succeeded);

    let metrics = exec.metrics();
    assert_eq!(metrics.total_requests, before + 1, "one outcome per sequence, not per attempt");
    assert_eq!(metrics.successful_requests, 1);
    assert!(metrics.error_categories.is_empty());
}

#[tokio::test]
async fn cancelling_mid_backoff_prevents_further_attempts() {
    let exec = RetryExecutor::builder().config(three_attempts()).with_sleeper(NeverWake).build();
    let calls = Arc::new(AtomicUsize::new(0));

    let runner = exec.clone();
    let op = scripted(calls.clone(), &["timeout"; 3]);
    let task = tokio::spawn(async move { runner.execute_as("report", op).await });

    let mut waited = 0;
    while !exec.retry_info("report").is_some_and(|s| s.next_retry_in.is_some()) {
        waited += 1;
        assert!(waited < 1000, "operation never reached backoff");
        tokio::task::yield_now().await;
    }
    assert!(exec.cancel_retry("report"));

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cancel wakes the backoff")
        .expect("task completes");

    match result {
        Err(RetryError::Cancelled { attempts, last_error, .. }) => {
            assert_eq!(attempts, 1);
            assert_eq!(last_error, CallError("timeout (call 1)".into()));
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let state = exec.retry_info("report").unwrap();
    assert!(!state.is_retrying);
    assert!(!state.can_retry);
}

#[tokio::test]
async fn manual_retry_is_refused_after_exhaustion_but_direct_resubmission_restarts() {
    let exec = RetryExecutor::builder().config(three_attempts()).with_sleeper(InstantSleeper).build();
    let calls = Arc::new(AtomicUsize::new(0));

    let first = exec.execute_as("export", scripted(calls.clone(), &["503 unavailable"; 3])).await;
    assert!(first.is_err());
    assert!(!exec.retry_info("export").unwrap().can_retry);

    let manual_calls = Arc::new(AtomicUsize::new(0));
    let refused = exec.manual_retry("export", scripted(manual_calls.clone(), &[])).await;
    assert!(refused.is_none());
    assert_eq!(manual_calls.load(Ordering::SeqCst), 0);

    let direct_calls = Arc::new(AtomicUsize::new(0));
    let direct =
        exec.execute_as("export", scripted(direct_calls.clone(), &["503 unavailable"])).await;
    assert_eq!(direct.unwrap(), "done");

    let state = exec.retry_info("export").unwrap();
    assert_eq!(state.attempts.len(), 2, "history restarts at attempt 1");
    assert_eq!(state.attempts[0].attempt_number, 1);
    assert_eq!(exec.metrics().total_requests, 2);
}

#[tokio::test]
async fn manual_retry_runs_when_state_still_allows_it() {
    let exec = RetryExecutor::builder().config(three_attempts()).with_sleeper(NeverWake).build();
    let runner = exec.clone();
    let task = tokio::spawn(async move {
        runner.execute_as("poll", scripted(Arc::new(AtomicUsize::new(0)), &["timeout"; 3])).await
    });

    while !exec.retry_info("poll").is_some_and(|s| s.next_retry_in.is_some()) {
        tokio::task::yield_now().await;
    }

    let rerun = exec.manual_retry("poll", scripted(Arc::new(AtomicUsize::new(0)), &[])).await;
    assert_eq!(rerun.expect("retry permitted").unwrap(), "done");

    let superseded = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert!(superseded.unwrap_err().is_cancelled());
    assert!(exec.retry_info("poll").unwrap().succeeded());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ids_keep_independent_state() {
    let exec = RetryExecutor::builder()
        .config(RetryConfig::builder().max_attempts(4).build().unwrap())
        .with_sleeper(InstantSleeper)
        .build();

    let mut handles = Vec::new();
    for i in 0..16usize {
        let exec = exec.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("job-{i:02}");
            let failures = i % 4;
            let calls = Arc::new(AtomicUsize::new(0));
            let result = exec
                .execute_as(id.clone(), move || {
                    let calls = calls.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < failures {
                            Err(CallError("timeout".into()))
                        } else {
                            Ok(failures)
                        }
                    }
                })
                .await;
            (id, result)
        }));
    }

    for handle in handles {
        let (id, result) = handle.await.unwrap();
        let failures = result.expect("every job succeeds within budget");
        let state = exec.retry_info(&id).unwrap();
        assert_eq!(state.attempts.len(), failures + 1, "{id}");
        assert!(state.attempts.len() <= 4);
    }

    let metrics = exec.metrics();
    assert_eq!(metrics.total_requests, 16);
    assert_eq!(metrics.success_rate, 1.0);
    assert_eq!(exec.monitor().states().len(), 16);
}
