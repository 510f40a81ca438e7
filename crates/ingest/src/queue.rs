//! Bounded FIFO of upload tasks with status and aggregate counters (spec §4.9, C9).

use crate::task::{TaskId, TaskStatus, UploadTask};
use dashmap::DashMap;
use docvault_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Aggregate counters suitable for a stats endpoint (spec §4.9).
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub retrying: usize,
}

#[derive(Default)]
struct Counters {
    processing: AtomicUsize,
    retrying: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    duplicates: AtomicUsize,
}

/// Bounded, multi-producer multi-consumer FIFO of [`UploadTask`]s. Enqueue
/// never blocks: it fails fast with `QueueFull` once `high_water_mark`
/// pending tasks are outstanding (spec §4.9).
pub struct IngestionQueue {
    high_water_mark: usize,
    tasks: DashMap<TaskId, UploadTask>,
    ready: Mutex<VecDeque<TaskId>>,
    counters: Counters,
}

impl IngestionQueue {
    pub fn new(high_water_mark: usize) -> Self {
        IngestionQueue {
            high_water_mark,
            tasks: DashMap::new(),
            ready: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    /// Admits `task`, failing with `QueueFull` if the pending count is
    /// already at the high-water mark (spec §8 boundary: "Queue at exactly
    /// `high_water_mark`: first over-limit `submit` fails").
    pub fn submit(&self, task: UploadTask) -> Result<TaskId> {
        let mut ready = self.ready.lock();
        if ready.len() >= self.high_water_mark {
            return Err(Error::QueueFull(self.high_water_mark));
        }
        let id = task.id.clone();
        ready.push_back(id.clone());
        self.tasks.insert(id.clone(), task);
        Ok(id)
    }

    /// Pops the next ready task and marks it `processing`.
    pub fn dequeue(&self) -> Option<UploadTask> {
        let id = self.ready.lock().pop_front()?;
        let (_, mut task) = self.tasks.remove(&id)?;
        if task.status == TaskStatus::Retrying {
            self.counters.retrying.fetch_sub(1, Ordering::Relaxed);
        }
        task.status = TaskStatus::Processing;
        self.counters.processing.fetch_add(1, Ordering::Relaxed);
        Some(task)
    }

    /// Re-admits a task for a delayed retry attempt. The caller (Worker
    /// Pool) is responsible for waiting out the delay before calling this —
    /// the queue itself does not schedule timers.
    pub fn requeue(&self, mut task: UploadTask) {
        self.counters.processing.fetch_sub(1, Ordering::Relaxed);
        self.counters.retrying.fetch_add(1, Ordering::Relaxed);
        task.status = TaskStatus::Retrying;
        let id = task.id.clone();
        self.tasks.insert(id.clone(), task);
        self.ready.lock().push_back(id);
    }

    /// Records a terminal outcome for a task that is no longer in the queue.
    pub fn complete(&self, status: TaskStatus) {
        self.counters.processing.fetch_sub(1, Ordering::Relaxed);
        match status {
            TaskStatus::Succeeded => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            TaskStatus::Failed => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            TaskStatus::Duplicate => {
                self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn pending_len(&self) -> usize {
        self.ready.lock().len()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending_len(),
            processing: self.counters.processing.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            duplicates: self.counters.duplicates.load(Ordering::Relaxed),
            retrying: self.counters.retrying.load(Ordering::Relaxed),
        }
    }
}
