//! Dispatcher-level concurrency limits.
//!
//! Tool calls run on a bounded worker set independent of the per-backend
//! session caps. When the worker set is saturated, a bounded number of
//! callers may queue; past that the dispatcher answers `ResourceExhausted`
//! immediately instead of letting requests time out silently.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use yargi_core::{Error, Result};

/// Concurrent tool calls executed at once.
const DEFAULT_WORKERS: usize = 16;
/// Callers allowed to wait for a worker.
const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Bounded worker pool guarding the dispatcher.
#[derive(Clone)]
pub struct Limits {
    permits: Arc<Semaphore>,
    waiters: Arc<AtomicUsize>,
    queue_depth: usize,
}

impl Limits {
    /// Default worker and queue sizing.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WORKERS, DEFAULT_QUEUE_DEPTH)
    }

    /// Explicit sizing (tests).
    pub fn with_capacity(workers: usize, queue_depth: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            waiters: Arc::new(AtomicUsize::new(0)),
            queue_depth,
        }
    }

    /// Acquire a worker slot, queueing FIFO up to the depth bound.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        if self.permits.available_permits() == 0 {
            let waiting = self.waiters.fetch_add(1, Ordering::SeqCst);
            if waiting >= self.queue_depth {
                self.waiters.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::ResourceExhausted(
                    "dispatcher queue is full".to_string(),
                ));
            }
            let permit = Arc::clone(&self.permits).acquire_owned().await;
            self.waiters.fetch_sub(1, Ordering::SeqCst);
            return permit
                .map_err(|_| Error::ResourceExhausted("dispatcher is shutting down".to_string()));
        }
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::ResourceExhausted("dispatcher is shutting down".to_string()))
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn saturated_queue_fails_fast() {
        let limits = Limits::with_capacity(1, 0);
        let held = limits.acquire().await.unwrap();

        let err = limits.acquire().await.unwrap_err();
        assert_eq!(err.kind(), yargi_core::ErrorKind::ResourceExhausted);

        drop(held);
        let _ = limits.acquire().await.unwrap();
    }

    #[tokio::test]
    async fn queued_caller_proceeds_when_slot_frees() {
        let limits = Limits::with_capacity(1, 4);
        let held = limits.acquire().await.unwrap();

        let limits2 = limits.clone();
        let waiter = tokio::spawn(async move { limits2.acquire().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        let permit = waiter.await.unwrap();
        assert!(permit.is_ok());
    }
}
