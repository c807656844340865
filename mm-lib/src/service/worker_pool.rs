use anyhow::{anyhow, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Fixed-size pool for read-only fan-out. `map` blocks until every item is
/// processed and returns results in input order.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count.max(1))
            .thread_name(|i| format!("mm-worker-{}", i))
            .build()
            .map_err(|e| anyhow!("Failed to build worker pool: {}", e))?;

        Ok(WorkerPool { pool })
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_input_order() {
        let pool = WorkerPool::new(4).unwrap();
        let items: Vec<u64> = (0..1000).collect();

        let squares = pool.map(&items, |x| x * x);

        assert_eq!(pool.worker_count(), 4);
        assert_eq!(squares.len(), 1000);
        assert!(squares.iter().enumerate().all(|(i, v)| *v == (i * i) as u64));
    }
}
