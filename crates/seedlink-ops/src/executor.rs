//! Bounded concurrent execution of independent blocking jobs.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Run `job` over every item on the blocking pool, at most `max_concurrent`
/// at a time.
///
/// Results are returned in completion order, each tagged with the item's
/// position in `items`. A panicking job yields `Err` with the panic message
/// for that position only; the other jobs keep running. `on_complete` is
/// called once per finished job with the number completed so far.
pub(crate) async fn run_all<T, R, F, C>(
    items: Vec<T>,
    max_concurrent: usize,
    job: F,
    mut on_complete: C,
) -> Vec<(usize, Result<R, String>)>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> R + Send + Sync + 'static,
    C: FnMut(usize, &Result<R, String>),
{
    let total = items.len();
    let job = Arc::new(job);
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (position, item) in items.into_iter().enumerate() {
        let job = Arc::clone(&job);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let result = tokio::task::spawn_blocking(move || job(item))
                .await
                .map_err(|e| e.to_string());
            (position, result)
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, result)) => {
                on_complete(results.len() + 1, &result);
                results.push((position, result));
            }
            Err(e) => warn!("Worker task lost: {e}"),
        }
    }

    results
}
