//! Dedicated thread pool for thumbnail work.
//!
//! Decoding, resampling and encoding are blocking CPU work. They run on a
//! fixed-size rayon pool so they never stall the tokio runtime that accepts
//! connections and fetches origin images. Results come back over a oneshot
//! channel.

use std::any::Any;
use std::future::Future;

use thiserror::Error;
use tokio::sync::oneshot;

/// The job never delivered a result, most likely because it panicked
#[derive(Debug, Error)]
#[error("thumbnail worker stopped before producing a result")]
pub struct JobLost;

pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("thumbnail-worker-{index}"))
            .panic_handler(|panic| {
                tracing::error!(panic = panic_message(panic.as_ref()), "Thumbnail worker panicked");
            })
            .build()?;

        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `job` on the pool immediately and return a future for its result.
    ///
    /// Dropping the future does not stop the job; its result is discarded
    /// when it finishes.
    pub fn run<F, T>(&self, job: F) -> impl Future<Output = Result<T, JobLost>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            // Receiver gone means the request was abandoned
            let _ = tx.send(job());
        });
        async move { rx.await.map_err(|_| JobLost) }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
