use std::time::Duration;
use log::warn;
use tokio::sync::{Mutex, MutexGuard};
use crate::core::error::Result;

/// Async mutex serializing all index writes. Acquisition gives up after the
/// configured timeout instead of queueing forever.
pub struct WriteLock<T> {
    inner: Mutex<T>,
    timeout: Duration,
}

impl<T> WriteLock<T> {
    pub fn new(value: T, timeout: Duration) -> Self {
        WriteLock {
            inner: Mutex::new(value),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn acquire(&self) -> Result<MutexGuard<'_, T>> {
        match tokio::time::timeout(self.timeout, self.inner.lock()).await {
            Ok(guard) => Ok(guard),
            Err(elapsed) => {
                warn!("Write lock not acquired within {:?}", self.timeout);
                Err(elapsed.into())
            }
        }
    }
}
