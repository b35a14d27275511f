//! Bounded execution pool for sink writes
//!
//! Lanes never perform the network call themselves: they dispatch it here
//! and await the handle. At most `size` writes run at once.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("flush pool is closed")]
pub struct PoolClosed;

/// Semaphore-bounded set of execution slots
#[derive(Debug, Clone)]
pub struct FlushPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl FlushPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Spawn `task` once a slot is free; the slot is held until it completes
    pub async fn dispatch<F, T>(&self, task: F) -> Result<JoinHandle<T>, PoolClosed>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;

        Ok(tokio::spawn(async move {
            let output = task.await;
            drop(permit);
            output
        }))
    }

    /// Wait for in-flight work to finish, then refuse new work
    pub async fn shutdown(&self) {
        if let Ok(all) = self.permits.acquire_many(self.size as u32).await {
            all.forget();
        }
        self.permits.close();
    }
}
