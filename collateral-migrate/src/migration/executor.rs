//! Bounded-concurrency batch executor
//!
//! Runs one async operation per element with at most `width` in flight.
//! Outcomes flow back through a single consuming loop, which owns the error
//! map, so no locking is needed around it.

use futures::stream::{self, StreamExt};
use std::future::Future;

use super::progress::Progress;
use super::report::{BatchOutcome, ElementError};
use crate::api::ConcurrencyConfig;

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    width: usize,
}

impl BatchExecutor {
    pub fn new(config: &ConcurrencyConfig) -> Self {
        Self {
            width: config.batch_width(),
        }
    }

    #[cfg(test)]
    pub fn with_width(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Invoke `op` exactly once for every element and wait for all of them to settle.
    ///
    /// A failing element is recorded under `id_of(element)` and never stops the
    /// rest of the batch.
    pub async fn run<T, K, F, Fut>(
        &self,
        items: Vec<T>,
        id_of: K,
        op: F,
        progress: &Progress,
    ) -> BatchOutcome
    where
        K: Fn(&T) -> String,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), ElementError>>,
    {
        let mut outcome = BatchOutcome::default();

        let mut settled = stream::iter(items.into_iter().map(|item| {
            let id = id_of(&item);
            let pending = op(item);
            async move { (id, pending.await) }
        }))
        .buffer_unordered(self.width);

        while let Some((id, result)) = settled.next().await {
            progress.tick();
            outcome.record(id, result);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_element_invoked_once() {
        let calls = Mutex::new(HashMap::new());
        let progress = Progress::new("items", 50);

        let outcome = BatchExecutor::with_width(8)
            .run(
                (0..50).collect::<Vec<u32>>(),
                |n| n.to_string(),
                |n| {
                    *calls.lock().unwrap().entry(n).or_insert(0) += 1;
                    async { Ok::<(), ElementError>(()) }
                },
                &progress,
            )
            .await;

        assert_eq!(outcome.succeeded, 50);
        assert!(outcome.errors.is_empty());
        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.len(), 50);
        assert!(calls.values().all(|&count| count == 1));
        assert_eq!(progress.completed(), 50);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let progress = Progress::new("items", 10);

        let outcome = BatchExecutor::with_width(4)
            .run(
                (0..10).collect::<Vec<u32>>(),
                |n| format!("item-{}", n),
                |n| async move {
                    tokio::time::sleep(Duration::from_millis(u64::from(n % 3))).await;
                    if n == 6 {
                        Err(ElementError::failed("rejected"))
                    } else {
                        Ok(())
                    }
                },
                &progress,
            )
            .await;

        assert_eq!(outcome.succeeded, 9);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors["item-6"], ElementError::failed("rejected"));
        assert_eq!(progress.completed(), 10);
    }

    #[tokio::test]
    async fn test_width_bounds_in_flight() {
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);
        let progress = Progress::new("items", 12);

        BatchExecutor::with_width(3)
            .run(
                (0..12).collect::<Vec<u32>>(),
                |n| n.to_string(),
                move |_| async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                },
                &progress,
            )
            .await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_result_independent_of_width() {
        let op = |n: u32| async move {
            if n % 4 == 0 {
                Err(ElementError::failed(format!("bad {}", n)))
            } else {
                Ok(())
            }
        };

        let narrow = BatchExecutor::with_width(1)
            .run((0..20).collect(), |n: &u32| n.to_string(), op, &Progress::new("a", 20))
            .await;
        let wide = BatchExecutor::with_width(16)
            .run((0..20).collect(), |n: &u32| n.to_string(), op, &Progress::new("b", 20))
            .await;

        assert_eq!(narrow, wide);
        assert_eq!(narrow.errors.len(), 5);
    }

    #[tokio::test]
    async fn test_progress_is_incremental() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let progress = Progress::new("items", 4).with_observer(move |done, _| sink.lock().unwrap().push(done));

        BatchExecutor::with_width(2)
            .run(
                vec![1u32, 2, 3, 4],
                |n| n.to_string(),
                |_| async { Ok::<(), ElementError>(()) },
                &progress,
            )
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_width_is_clamped() {
        assert_eq!(BatchExecutor::with_width(0).width(), 1);
        let config = ConcurrencyConfig {
            max_concurrent_requests: 7,
            enabled: true,
        };
        assert_eq!(BatchExecutor::new(&config).width(), 7);
    }
}
