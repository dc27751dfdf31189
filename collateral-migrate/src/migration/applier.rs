//! Strictly sequential applier with a fixed pause between writes
//!
//! For backends that answer request bursts with throttling errors. The pause
//! is preventive only: a throttled write is recorded like any other failure.

use std::future::Future;
use std::time::Duration;

use super::progress::Progress;
use super::report::{BatchOutcome, ElementError};
use crate::api::ThrottleConfig;

#[derive(Debug, Clone)]
pub struct SequentialApplier {
    delay: Duration,
}

impl SequentialApplier {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            delay: config.delay,
        }
    }

    #[cfg(test)]
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    /// Invoke `op` for each element in input order, one at a time, sleeping
    /// `delay` between consecutive invocations whatever their outcome.
    pub async fn run<T, K, F, Fut>(
        &self,
        items: Vec<T>,
        id_of: K,
        mut op: F,
        progress: &Progress,
    ) -> BatchOutcome
    where
        K: Fn(&T) -> String,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), ElementError>>,
    {
        let mut outcome = BatchOutcome::default();

        for (index, item) in items.into_iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let id = id_of(&item);
            let result = op(item).await;
            progress.tick();
            outcome.record(id, result);
        }

        outcome
    }
}
