use crate::error::{CrawlerError, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Bounded set of concurrent workers for one crawl.
///
/// Jobs are spawned onto the runtime but at most `size` of them run at once.
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: &'static str, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(CrawlerError::invalid_argument(format!("{} pool needs at least one worker", name)));
        }

        Ok(Self {
            name,
            size,
            permits: Arc::new(Semaphore::new(size)),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs every job and waits for all of them. Results come back in completion order;
    /// jobs that panic are logged and left out.
    ///
    /// The spawned tasks belong to this call: dropping the returned future before it
    /// resolves aborts every job still queued or running.
    pub async fn run_all<T>(&self, jobs: Vec<BoxFuture<'static, T>>) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        let total = jobs.len();
        debug!("[{} POOL] Running {} jobs on {} workers", self.name, total, self.size);

        let mut tasks = JoinSet::new();
        for job in jobs {
            let permit = Arc::clone(&self.permits).acquire_owned().await?;
            tasks.spawn(async move {
                let _permit = permit;
                job.await
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(value) => results.push(value),
                Err(e) => warn!("[{} POOL] Worker task failed: {}", self.name, e),
            }
        }

        Ok(results)
    }
}
