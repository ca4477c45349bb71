//! Multi-worker dispatch: bucketed work distribution over a fixed pool.
//!
//! `next` turns an element list into an atomic-cursor bucket source;
//! `fold` runs one puller per worker, folds each bucket with the job, and
//! merges the per-worker partials. Cancellation is cooperative: a
//! cancelled worker finishes its current bucket and stops pulling.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Progress callback: `(total, finished)` element counts, fired per bucket.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Sync + 'a;

/// The worker pool could not be built (thread spawn failure, bad config).
#[derive(Debug, thiserror::Error)]
#[error("Failed to build worker pool: {0}")]
pub struct PoolBuildError(#[from] rayon::ThreadPoolBuildError);

/// Fixed pool of OS-level workers.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    cancelled: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Build a pool. `workers = 0` auto-detects from the machine.
    pub fn new(workers: usize) -> Result<Self, PoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("lattice-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Request cooperative cancellation of the current fold.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Clear the cancellation flag before a new run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

/// An atomic-cursor bucket source over an element list.
pub struct Bucketed<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
    bucket_size: usize,
}

impl<T> Bucketed<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    fn next_bucket(&self) -> Option<Range<usize>> {
        let start = self.cursor.fetch_add(self.bucket_size, Ordering::Relaxed);
        if start >= self.items.len() {
            return None;
        }
        Some(start..(start + self.bucket_size).min(self.items.len()))
    }
}

/// Split `items` into buckets sized for the pool.
pub fn next<T>(pool: &WorkerPool, items: Vec<T>) -> Bucketed<T> {
    let workers = pool.worker_count().max(1);
    let bucket_size = (items.len() / (workers * 4)).clamp(1, 128);
    Bucketed {
        items,
        cursor: AtomicUsize::new(0),
        bucket_size,
    }
}

/// Fold every element through `job`, one local accumulator per worker,
/// merging partials pairwise at the end.
pub fn fold<T, A, N, J, M>(
    pool: &WorkerPool,
    source: &Bucketed<T>,
    neutral: N,
    job: J,
    merge: M,
    progress: Option<&ProgressFn<'_>>,
) -> A
where
    T: Send + Sync,
    A: Send,
    N: Fn() -> A + Sync,
    J: Fn(A, &T) -> A + Sync,
    M: Fn(A, A) -> A,
{
    let workers = pool.worker_count().max(1);
    let total = source.len();
    let finished = AtomicUsize::new(0);
    let (tx, rx) = crossbeam_channel::unbounded::<A>();

    pool.pool.scope(|scope| {
        let finished = &finished;
        let neutral = &neutral;
        let job = &job;
        for _ in 0..workers {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let mut acc = neutral();
                while !pool.is_cancelled() {
                    let Some(range) = source.next_bucket() else {
                        break;
                    };
                    let bucket_len = range.len();
                    for item in &source.items()[range] {
                        acc = job(acc, item);
                    }
                    let done = finished.fetch_add(bucket_len, Ordering::Relaxed) + bucket_len;
                    if let Some(callback) = progress {
                        callback(total, done);
                    }
                }
                let _ = tx.send(acc);
            });
        }
    });
    drop(tx);

    rx.into_iter().fold(neutral(), |a, b| merge(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_visits_every_element_once() {
        let pool = WorkerPool::new(4).expect("worker pool");
        let items: Vec<u64> = (0..1000).collect();
        let expected: u64 = items.iter().sum();
        let source = next(&pool, items);
        let sum = fold(
            &pool,
            &source,
            || 0u64,
            |acc, item| acc + item,
            |a, b| a + b,
            None,
        );
        assert_eq!(sum, expected);
    }

    #[test]
    fn progress_reaches_the_total() {
        let pool = WorkerPool::new(2).expect("worker pool");
        let seen = AtomicUsize::new(0);
        let source = next(&pool, (0..100).collect::<Vec<_>>());
        fold(
            &pool,
            &source,
            || (),
            |_, _| (),
            |_, _| (),
            Some(&|total, done| {
                assert!(done <= total);
                seen.fetch_max(done, Ordering::Relaxed);
            }),
        );
        assert_eq!(seen.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn empty_input_yields_the_neutral_value() {
        let pool = WorkerPool::new(2).expect("worker pool");
        let source = next(&pool, Vec::<u32>::new());
        let out = fold(&pool, &source, || 7, |acc, _| acc, |a, _| a, None);
        assert_eq!(out, 7);
    }

    #[test]
    fn cancelled_pool_stops_after_current_buckets() {
        let pool = WorkerPool::new(2).expect("worker pool");
        pool.cancel();
        let source = next(&pool, (0..1000).collect::<Vec<_>>());
        let count = fold(&pool, &source, || 0usize, |acc, _| acc + 1, |a, b| a + b, None);
        assert_eq!(count, 0);
        pool.reset();
        assert!(!pool.is_cancelled());
    }
}
