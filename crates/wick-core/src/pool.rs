// ABOUTME: Bounded worker pool: N workers pull job indices from a shared counter until the batch is drained.
// ABOUTME: Results flow over one channel to a single reducer and come back in submission order.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::warn;

/// Run jobs `0..count` on at most `min(concurrency, count)` workers.
///
/// Every job runs to completion; a failing job never cancels its siblings.
/// Slot `i` of the returned vector holds job `i`'s output, or `None` if the
/// job panicked before producing one.
pub async fn fan_out<T, F, Fut>(count: usize, concurrency: usize, job: F) -> Vec<Option<T>>
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    if count == 0 {
        return Vec::new();
    }

    let workers = concurrency.clamp(1, count);
    let job = Arc::new(job);
    let next = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, T)>();

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let job = Arc::clone(&job);
        let next = Arc::clone(&next);
        let tx = tx.clone();
        set.spawn(async move {
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= count {
                    break;
                }
                let output = (*job)(index).await;
                if tx.send((index, output)).is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let mut results: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some((index, output)) = rx.recv().await {
        results[index] = Some(output);
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "pool worker stopped early");
        }
    }
    results
}
