use replicheck_engine::{resilient_fetch, FetchOutcome, RetryPolicy};
use replicheck_types::SourceError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_secs(2),
    }
}

// Paused time: backoff sleeps resolve instantly but are still measured.

#[tokio::test(start_paused = true)]
async fn recovers_after_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let outcome = resilient_fetch(policy(3), move || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(SourceError::Transient("flaky".into()))
            } else {
                Ok(99u64)
            }
        }
    })
    .await;

    match outcome {
        FetchOutcome::Fetched(value) => assert_eq!(value, 99),
        FetchOutcome::Unavailable { .. } => panic!("expected recovery"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_become_unavailable() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let outcome = resilient_fetch(policy(3), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u64, _>(SourceError::Transient("still down".into()))
        }
    })
    .await;

    match outcome {
        FetchOutcome::Unavailable { attempts, cause } => {
            assert_eq!(attempts, 3);
            assert!(cause.is_transient());
        }
        FetchOutcome::Fetched(_) => panic!("expected unavailability"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_failures_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let outcome = resilient_fetch(policy(5), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u64, _>(SourceError::Permanent("not found".into()))
        }
    })
    .await;

    match outcome {
        FetchOutcome::Unavailable { attempts, .. } => assert_eq!(attempts, 1),
        FetchOutcome::Fetched(_) => panic!("expected unavailability"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_per_attempt() {
    let start = tokio::time::Instant::now();
    let _ = resilient_fetch(policy(3), || async {
        Err::<(), _>(SourceError::Transient("down".into()))
    })
    .await;

    // Waits: 2s after attempt 0, 4s after attempt 1, none after the last.
    assert_eq!(start.elapsed(), Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn first_try_success_does_not_sleep() {
    let start = tokio::time::Instant::now();
    let outcome = resilient_fetch(policy(3), || async { Ok(1u8) }).await;
    assert!(outcome.ok().is_some());
    assert_eq!(start.elapsed(), Duration::ZERO);
}
