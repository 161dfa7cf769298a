//! The batching scheduler

use std::time::Duration;

use crate::error::{Error, Result};

/// Splits array-processing work into batches, yielding between batches.
///
/// Between consecutive batches the batcher either yields to the tokio
/// scheduler or, when a delay is configured, sleeps for the configured
/// duration. Item order is preserved; results come back in input order.
#[derive(Debug, Clone)]
pub struct Batcher {
    batch_size: usize,
    delay: Option<Duration>,
}

/// Outcome of a batched run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<R> {
    /// Per-item results, in input order
    pub results: Vec<R>,
    /// Number of batches that were executed
    pub batches: usize,
}

impl Batcher {
    /// Create a batcher processing `batch_size` items per slice.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBatchSize`] when `batch_size` is zero.
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            delay: None,
        })
    }

    /// Sleep for `delay` between batches instead of a bare yield.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Process all items, yielding between batches.
    pub async fn run<T, R>(&self, items: Vec<T>, mut f: impl FnMut(T) -> R) -> BatchReport<R> {
        let mut results = Vec::with_capacity(items.len());
        let mut batches = 0;
        let mut pending = items.into_iter().peekable();

        while pending.peek().is_some() {
            if batches > 0 {
                self.breather().await;
            }
            for item in pending.by_ref().take(self.batch_size) {
                results.push(f(item));
            }
            batches += 1;
        }

        tracing::debug!(items = results.len(), batches, "batched run complete");
        BatchReport { results, batches }
    }

    /// Process all items with a fallible function.
    ///
    /// The first error aborts the run; items processed before the failure
    /// are discarded along with the error's batch.
    pub async fn try_run<T, R, E>(
        &self,
        items: Vec<T>,
        mut f: impl FnMut(T) -> std::result::Result<R, E>,
    ) -> std::result::Result<BatchReport<R>, E> {
        let mut results = Vec::with_capacity(items.len());
        let mut batches = 0;
        let mut pending = items.into_iter().peekable();

        while pending.peek().is_some() {
            if batches > 0 {
                self.breather().await;
            }
            for item in pending.by_ref().take(self.batch_size) {
                results.push(f(item)?);
            }
            batches += 1;
        }

        Ok(BatchReport { results, batches })
    }

    async fn breather(&self) {
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
    }
}
