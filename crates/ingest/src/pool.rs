//! Dynamically sized worker pool consuming the Ingestion Queue, with
//! adaptive scaling and retry scheduling (spec §4.10, C10).

use crate::processor::{ProcessOutcome, UploadProcessor};
use crate::queue::IngestionQueue;
use crate::task::TaskStatus;
use docvault_concurrency::backoff::{self, RetryDecision};
use docvault_core::PoolConfig;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Set of workers pulling from an [`IngestionQueue`], resized periodically
/// by [`target_workers_for`] (spec §4.10 "Adaptive scaling").
pub struct WorkerPool {
    queue: Arc<IngestionQueue>,
    processor: Arc<UploadProcessor>,
    config: PoolConfig,
    target_workers: AtomicUsize,
    active_workers: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(queue: Arc<IngestionQueue>, processor: Arc<UploadProcessor>, config: PoolConfig) -> Arc<Self> {
        Arc::new(WorkerPool {
            queue,
            processor,
            target_workers: AtomicUsize::new(config.worker_min),
            active_workers: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Spawns `worker_min` workers plus the scaling ticker; returns their
    /// join handles so the caller can await clean shutdown.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for _ in 0..self.config.worker_min {
            handles.push(self.spawn_worker());
        }
        handles.push(self.spawn_scaling_ticker());
        handles
    }

    fn spawn_worker(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        pool.active_workers.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            loop {
                if pool.shutdown.load(Ordering::SeqCst) && pool.queue.pending_len() == 0 {
                    break;
                }
                let target = pool.target_workers.load(Ordering::SeqCst).max(pool.config.worker_min);
                if pool.active_workers.load(Ordering::SeqCst) > target {
                    break;
                }
                match pool.queue.dequeue() {
                    Some(mut task) => {
                        let outcome = pool.processor.process(&mut task).await;
                        pool.handle_outcome(task, outcome);
                    }
                    None => tokio::time::sleep(Duration::from_millis(50)).await,
                }
            }
            pool.active_workers.fetch_sub(1, Ordering::SeqCst);
        })
    }

    fn handle_outcome(self: &Arc<Self>, mut task: crate::task::UploadTask, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Succeeded(id) => {
                task.result_record_id = Some(id);
                self.queue.complete(TaskStatus::Succeeded);
            }
            ProcessOutcome::Duplicate(id) => {
                task.result_record_id = Some(id);
                self.queue.complete(TaskStatus::Duplicate);
            }
            ProcessOutcome::Terminal(_) => {
                self.queue.complete(TaskStatus::Failed);
            }
            ProcessOutcome::Transient(err) => {
                match backoff::classify(&err, task.attempt, &self.config.retry_delays_secs) {
                    RetryDecision::RetryAfter(delay) => {
                        debug!(task_id = %task.id, attempt = task.attempt, "scheduling retry");
                        task.attempt += 1;
                        let queue = Arc::clone(&self.queue);
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            queue.requeue(task);
                        });
                    }
                    RetryDecision::Exhausted | RetryDecision::NonRetryable => {
                        self.queue.complete(TaskStatus::Failed);
                    }
                }
            }
        }
    }

    fn spawn_scaling_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(pool.config.scaling_tick);
            loop {
                interval.tick().await;
                if pool.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let pending = pool.queue.pending_len();
                let target = target_workers_for(pending, &pool.config);
                pool.target_workers.store(target, Ordering::SeqCst);
                let active = pool.active_workers.load(Ordering::SeqCst);
                if active < target {
                    for _ in 0..(target - active) {
                        pool.spawn_worker();
                    }
                }
                info!(pending, target, active, "worker pool scaling tick");
            }
        })
    }

    /// Drains pending tasks, awaits in-flight completions up to `grace`,
    /// then stops retiring further workers (spec §4.10 "Cancellation").
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.store(true, Ordering::SeqCst);
        let deadline = tokio::time::Instant::now() + grace;
        while self.active_workers.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }
}

/// Pure scaling function (spec §4.10 table), split out for direct testing.
pub fn target_workers_for(pending: usize, config: &PoolConfig) -> usize {
    let w_min = config.worker_min as f64;
    let raw = if pending == 0 {
        w_min
    } else if pending < 100 {
        w_min + (pending as f64 / 20.0).floor()
    } else if pending < 10_000 {
        w_min + (10.0 * (pending as f64).log10()).ceil()
    } else {
        w_min + (15.0 * (pending as f64).log10()).ceil()
    };
    (raw as usize).clamp(config.worker_min, config.worker_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_floor_below_100() {
        let config = PoolConfig::default();
        assert_eq!(target_workers_for(0, &config), 5);
        assert_eq!(target_workers_for(19, &config), 5);
        assert_eq!(target_workers_for(20, &config), 6);
    }

    #[test]
    fn scaling_log_tier_rises_above_twenty_for_s3_scenario() {
        let config = PoolConfig::default();
        // Spec scenario S3: 2,000 pending tasks should push worker count
        // above 20 within one scaling tick.
        assert!(target_workers_for(2000, &config) > 20);
    }

    #[test]
    fn scaling_is_clamped_to_worker_max() {
        let config = PoolConfig {
            worker_max: 50,
            ..PoolConfig::default()
        };
        assert_eq!(target_workers_for(1_000_000, &config), 50);
    }

    #[test]
    fn scaling_uses_steeper_tier_above_ten_thousand() {
        let config = PoolConfig::default();
        let just_under = target_workers_for(9_999, &config);
        let just_over = target_workers_for(10_000, &config);
        assert!(just_over >= just_under);
    }
}
