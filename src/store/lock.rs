//! Scoped reader/writer locking for one container.
//!
//! `put`/`delete` take the exclusive lock; `get`/`query` take the shared
//! lock. Each operation acquires two layers under one deadline: the
//! in-process [`StoreLock`] serializing threads of this process, then the
//! backend's advisory lock excluding other handles on the same container.
//! Acquisition polls with a deadline instead of blocking forever, so a
//! held container surfaces as [`StorageError::LockTimeout`] rather than a
//! deadlock. Guards release on drop, on every exit path.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::time::{Duration, Instant};

use super::backend::{BackendLock, ContainerBackend};
use super::error::StorageError;

const POLL_INTERVAL: Duration = Duration::from_micros(500);

#[derive(Debug, Default)]
pub(crate) struct StoreLock {
    inner: RwLock<()>,
}

impl StoreLock {
    pub(crate) fn new() -> Self {
        StoreLock::default()
    }

    /// Acquire the shared lock, failing after `timeout`.
    pub(crate) fn shared(
        &self,
        timeout: Duration,
    ) -> Result<RwLockReadGuard<'_, ()>, StorageError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.inner.try_read() {
                Ok(guard) => return Ok(guard),
                // The lock guards no data, so a writer panic leaves
                // nothing to repair.
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(StorageError::LockTimeout {
                            mode: "shared",
                            timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    /// Acquire the exclusive lock, failing after `timeout`.
    pub(crate) fn exclusive(
        &self,
        timeout: Duration,
    ) -> Result<RwLockWriteGuard<'_, ()>, StorageError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.inner.try_write() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(StorageError::LockTimeout {
                            mode: "exclusive",
                            timeout,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

/// Poll the backend's advisory lock until `deadline`.
///
/// Called with the in-process lock already held, so contention here means
/// another handle on the same container, typically in another process.
pub(crate) fn acquire_backend<B: ContainerBackend>(
    backend: &B,
    exclusive: bool,
    deadline: Instant,
    timeout: Duration,
) -> Result<Box<dyn BackendLock>, StorageError> {
    loop {
        if let Some(guard) = backend.try_lock(exclusive)? {
            return Ok(guard);
        }
        if Instant::now() >= deadline {
            return Err(StorageError::LockTimeout {
                mode: if exclusive { "exclusive" } else { "shared" },
                timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
