//! Bounded fan-out over one page of items.

use crate::error::ExtractError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Runs `task` over every item with at most `limit` tasks in flight.
///
/// Each task receives a page-scoped child of `cancel`. The first task that
/// fails raises that token, so in-flight siblings can stop early and no
/// further task is started. All spawned tasks are awaited before this
/// function returns, whatever the outcome.
///
/// # Returns
///
/// The task results in completion order, or the first error encountered.
/// Cancellation errors reported by siblings never displace a real failure.
pub async fn run_bounded<T, R, F, Fut>(
    cancel: &CancellationToken,
    limit: usize,
    items: Vec<T>,
    task: F,
) -> Result<Vec<R>, ExtractError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(CancellationToken, T) -> Fut,
    Fut: Future<Output = Result<R, ExtractError>> + Send + 'static,
{
    let page_cancel = cancel.child_token();
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();
    let mut results = Vec::with_capacity(items.len());
    let mut first_error: Option<ExtractError> = None;
    let mut stopped_early = false;

    for item in items {
        // Acquire a permit before spawning so nothing new starts after a failure
        let permit = tokio::select! {
            biased;
            _ = page_cancel.cancelled() => {
                stopped_early = true;
                break;
            }
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    stopped_early = true;
                    break;
                }
            },
        };

        let token = page_cancel.clone();
        let fut = task(page_cancel.clone(), item);
        tasks.spawn(async move {
            let _permit = permit;
            let result = fut.await;
            if result.is_err() {
                token.cancel();
            }
            result
        });
    }

    // Wait for every task of this page to complete
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(e)) => record_error(&mut first_error, e),
            Err(e) => {
                error!("Task join error: {}", e);
                page_cancel.cancel();
                record_error(&mut first_error, ExtractError::TaskFailed(e.to_string()));
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if stopped_early {
        return Err(ExtractError::Cancelled);
    }
    Ok(results)
}

fn record_error(slot: &mut Option<ExtractError>, err: ExtractError) {
    match slot {
        None => *slot = Some(err),
        Some(existing) if existing.is_cancelled() && !err.is_cancelled() => *slot = Some(err),
        Some(_) => debug!("Discarding sibling error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn empty_page_resolves_immediately() {
        let cancel = CancellationToken::new();
        let results: Vec<()> = run_bounded(&cancel, 4, Vec::<u32>::new(), |_, _| async { Ok(()) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_bounded(&CancellationToken::new(), 3, (0..20).collect(), |_, n: u32| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn first_failure_stops_new_tasks() {
        let started = Arc::new(AtomicUsize::new(0));

        let err = run_bounded(&CancellationToken::new(), 1, (0..5).collect(), |_, n: u32| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    return Err(ExtractError::TaskFailed("item 0".to_string()));
                }
                Ok(())
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::TaskFailed(ref m) if m == "item 0"));
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn siblings_observe_cancellation_and_real_error_wins() {
        let cancel = CancellationToken::new();
        let err = run_bounded(&cancel, 4, (0..4).collect(), |token, n: u32| async move {
            if n == 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                return Err(ExtractError::TaskFailed("boom".to_string()));
            }
            tokio::select! {
                _ = token.cancelled() => Err(ExtractError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(30)) => Ok(()),
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::TaskFailed(ref m) if m == "boom"));
    }

    #[tokio::test]
    async fn raised_run_token_starts_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = Arc::new(AtomicUsize::new(0));

        let err = run_bounded(&cancel, 2, vec![1u32, 2, 3], |_, _| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let err = run_bounded(&CancellationToken::new(), 2, vec![1u32], |_, _| async {
            if true {
                panic!("worker exploded");
            }
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractError::TaskFailed(_)));
    }
}
