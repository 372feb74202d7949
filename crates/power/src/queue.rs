//! Batching admission queue.
//!
//! Callers enqueue work items concurrently; the queue collects them into a
//! shared pending batch and flushes either when the batch reaches the
//! power-derived maximum size or when a single wait-timer fires. An
//! arriving item never rearms an already-armed timer. The batch executor
//! runs once over the whole batch and each caller is resolved by index
//! from the batch result; a batch failure fails every member — there is
//! no partial success within one batch.

use futures::future::BoxFuture;
use hearth_core::EngineError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::monitor::PowerMonitor;

type Waiter<R> = oneshot::Sender<Result<R, EngineError>>;
type Executor<T, R> =
    Arc<dyn Fn(Vec<T>) -> BoxFuture<'static, Result<Vec<R>, EngineError>> + Send + Sync>;

struct Pending<T, R> {
    items: Vec<(T, Waiter<R>)>,
    timer: Option<JoinHandle<()>>,
}

impl<T, R> Default for Pending<T, R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            timer: None,
        }
    }
}

/// Power-aware batching queue over a single batch executor.
pub struct BatchQueue<T, R> {
    monitor: PowerMonitor,
    executor: Executor<T, R>,
    pending: Arc<Mutex<Pending<T, R>>>,
}

impl<T, R> Clone for BatchQueue<T, R> {
    fn clone(&self) -> Self {
        Self {
            monitor: self.monitor.clone(),
            executor: Arc::clone(&self.executor),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T, R> BatchQueue<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Create a queue over a batch executor. The executor receives the
    /// full collected batch and must return one result per item, in item
    /// order.
    pub fn new<F, Fut>(monitor: PowerMonitor, executor: F) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<R>, EngineError>> + Send + 'static,
    {
        Self {
            monitor,
            executor: Arc::new(move |batch| Box::pin(executor(batch))),
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Admit one item and wait for its result from the batch it lands in.
    pub async fn enqueue(&self, item: T) -> Result<R, EngineError> {
        let config = self.monitor.batch_config();
        let (tx, rx) = oneshot::channel();

        {
            let mut pending = self.pending.lock().await;
            pending.items.push((item, tx));

            if pending.items.len() >= config.max_batch_size {
                // Flush immediately; the armed timer (if any) is obsolete.
                if let Some(timer) = pending.timer.take() {
                    timer.abort();
                }
                let batch = std::mem::take(&mut pending.items);
                drop(pending);
                debug!(size = batch.len(), "Flushing batch at max size");
                Self::run_batch(Arc::clone(&self.executor), batch).await;
            } else if pending.timer.is_none() {
                // First item of a fresh batch: arm the single wait-timer.
                // Later arrivals never rearm it.
                let executor = Arc::clone(&self.executor);
                let shared = Arc::clone(&self.pending);
                let wait = config.max_wait;
                pending.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(wait).await;
                    let batch = {
                        let mut pending = shared.lock().await;
                        pending.timer = None;
                        std::mem::take(&mut pending.items)
                    };
                    if !batch.is_empty() {
                        debug!(size = batch.len(), "Flushing batch on wait-timer");
                        Self::run_batch(executor, batch).await;
                    }
                }));
            }
        }

        rx.await.map_err(|_| {
            EngineError::Native("batch executor dropped a queued request".into())
        })?
    }

    /// Number of items currently waiting for a flush.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.items.len()
    }

    async fn run_batch(executor: Executor<T, R>, batch: Vec<(T, Waiter<R>)>) {
        let (items, waiters): (Vec<T>, Vec<Waiter<R>>) = batch.into_iter().unzip();
        let count = waiters.len();

        match executor(items).await {
            Ok(results) => {
                if results.len() != count {
                    warn!(
                        expected = count,
                        got = results.len(),
                        "Batch executor returned wrong result count"
                    );
                    let err = EngineError::Native(format!(
                        "batch executor returned {} results for {} items",
                        results.len(),
                        count
                    ));
                    for waiter in waiters {
                        let _ = waiter.send(Err(err.clone()));
                    }
                    return;
                }
                for (waiter, result) in waiters.into_iter().zip(results) {
                    let _ = waiter.send(Ok(result));
                }
            }
            Err(err) => {
                // A batch failure fails every member of the batch.
                warn!(error = %err, size = count, "Batch executor failed");
                for waiter in waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::PowerState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn monitor_with(level: f32, charging: bool) -> PowerMonitor {
        let monitor = PowerMonitor::new();
        monitor.set_state(PowerState {
            level,
            charging,
            low_power: false,
        });
        monitor
    }

    fn doubling_queue(monitor: PowerMonitor) -> (BatchQueue<u32, u32>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = Arc::clone(&calls);
        let queue = BatchQueue::new(monitor, move |batch: Vec<u32>| {
            calls_in.fetch_add(1, Ordering::SeqCst);
            async move { Ok(batch.into_iter().map(|x| x * 2).collect()) }
        });
        (queue, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_immediately_at_max_size() {
        // Healthy battery: batch size 2, wait 1000ms.
        let (queue, calls) = doubling_queue(monitor_with(0.60, false));

        let q1 = queue.clone();
        let q2 = queue.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { q1.enqueue(1).await }),
            tokio::spawn(async move { q2.enqueue(2).await }),
        );
        assert_eq!(a.unwrap().unwrap(), 2);
        assert_eq!(b.unwrap().unwrap(), 4);
        // One batch, not two single-item flushes.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_flushes_partial_batch() {
        // Low battery: batch size 5, wait 5000ms — a single item has to
        // wait for the timer.
        let (queue, calls) = doubling_queue(monitor_with(0.10, false));

        let started = tokio::time::Instant::now();
        let result = queue.enqueue(21).await.unwrap();
        assert_eq!(result, 42);
        assert_eq!(started.elapsed(), Duration::from_millis(5000));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_does_not_rearm_timer() {
        // Batch size 5, wait 5000ms. Second arrival at t=2s must not push
        // the flush past t=5s.
        let (queue, _) = doubling_queue(monitor_with(0.10, false));

        let started = tokio::time::Instant::now();
        let late = queue.clone();
        let late_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2000)).await;
            late.enqueue(2).await
        });
        let first = queue.enqueue(1).await.unwrap();
        assert_eq!(first, 2);
        assert_eq!(started.elapsed(), Duration::from_millis(5000));
        assert_eq!(late_task.await.unwrap().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn charging_flushes_every_item_alone() {
        let (queue, calls) = doubling_queue(monitor_with(0.05, true));

        assert_eq!(queue.enqueue(3).await.unwrap(), 6);
        assert_eq!(queue.enqueue(4).await.unwrap(), 8);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_failure_fails_every_member() {
        let monitor = monitor_with(0.60, false); // size 2
        let queue: BatchQueue<u32, u32> = BatchQueue::new(monitor, |_batch| async {
            Err(EngineError::Native("backend down".into()))
        });

        let q1 = queue.clone();
        let q2 = queue.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { q1.enqueue(1).await }),
            tokio::spawn(async move { q2.enqueue(2).await }),
        );
        assert!(matches!(a.unwrap(), Err(EngineError::Native(_))));
        assert!(matches!(b.unwrap(), Err(EngineError::Native(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn result_count_mismatch_rejects_all() {
        let monitor = monitor_with(0.60, false); // size 2
        let queue: BatchQueue<u32, u32> =
            BatchQueue::new(monitor, |_batch| async { Ok(vec![7]) });

        let q1 = queue.clone();
        let q2 = queue.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { q1.enqueue(1).await }),
            tokio::spawn(async move { q2.enqueue(2).await }),
        );
        assert!(a.unwrap().is_err());
        assert!(b.unwrap().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn results_align_with_item_order() {
        let (queue, _) = doubling_queue(monitor_with(0.40, false)); // size 3

        let q1 = queue.clone();
        let q2 = queue.clone();
        let q3 = queue.clone();
        let (a, b, c) = tokio::join!(
            tokio::spawn(async move { q1.enqueue(10).await }),
            tokio::spawn(async move { q2.enqueue(20).await }),
            tokio::spawn(async move { q3.enqueue(30).await }),
        );
        assert_eq!(a.unwrap().unwrap(), 20);
        assert_eq!(b.unwrap().unwrap(), 40);
        assert_eq!(c.unwrap().unwrap(), 60);
    }
}
