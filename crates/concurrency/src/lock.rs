//! The global lock arbiter: the single point of serialization for index and
//! WAL writes (spec §5 "Shared-resource policy").
//!
//! A bare advisory file lock (`docvault_durability::lock`) only keeps
//! separate *processes* out of each other's way — POSIX advisory locks are
//! per-process, not per-thread, so two threads in the same process can both
//! acquire one. `GlobalLock<T>` adds an in-process mutex around the
//! protected state `T` ahead of the file lock, so both axes are covered
//! without holding the file lock for longer than the critical section.

use docvault_core::Result;
use docvault_durability::lock::{self, LockHandle};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::time::Duration;

/// Serializes both in-process threads and other host processes around
/// mutable state `T` (typically the index and WAL writer).
pub struct GlobalLock<T> {
    path: PathBuf,
    timeout: Duration,
    state: Mutex<T>,
}

impl<T> GlobalLock<T> {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration, initial: T) -> Self {
        GlobalLock {
            path: path.into(),
            timeout,
            state: Mutex::new(initial),
        }
    }

    /// Acquires the arbiter: blocks other threads in this process first
    /// (via the inner mutex), then the cross-process advisory lock. Held
    /// for the minimum interval needed — callers should drop the guard as
    /// soon as the critical section ends, never across network I/O (spec §5).
    pub fn acquire(&self) -> Result<GlobalLockGuard<'_, T>> {
        let guard = self.state.lock();
        let file_handle = lock::acquire(&self.path, self.timeout)?;
        Ok(GlobalLockGuard {
            guard,
            _file_handle: file_handle,
        })
    }
}

/// RAII guard releasing both the in-process mutex and the file lock on drop,
/// and dereferencing to the protected state for the duration of the critical
/// section.
pub struct GlobalLockGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    _file_handle: LockHandle,
}

impl<'a, T> Deref for GlobalLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<'a, T> DerefMut for GlobalLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquire_then_release_allows_reacquisition() {
        let dir = tempdir().unwrap();
        let lock = GlobalLock::new(dir.path().join("lock"), Duration::from_secs(1), 0u32);
        {
            let mut guard = lock.acquire().unwrap();
            *guard += 1;
        }
        let guard2 = lock.acquire().unwrap();
        assert_eq!(*guard2, 1);
    }

    #[test]
    fn concurrent_threads_serialize_rather_than_deadlock() {
        use std::sync::Arc;
        let dir = tempdir().unwrap();
        let lock = Arc::new(GlobalLock::new(dir.path().join("lock"), Duration::from_secs(2), 0u32));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            handles.push(std::thread::spawn(move || {
                let mut guard = lock.acquire().unwrap();
                *guard += 1;
                std::thread::sleep(Duration::from_millis(5));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let guard = lock.acquire().unwrap();
        assert_eq!(*guard, 4);
    }
}
