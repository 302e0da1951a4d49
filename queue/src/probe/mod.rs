pub mod condor;

use crate::job::Job;

/// Source of the global job queue.
///
/// Implementations poll whatever scheduler the deployment uses and return
/// a finite, unordered batch of jobs.
#[async_trait::async_trait]
pub trait QueueProbe: Send + Sync {
    async fn global_queue(&self) -> anyhow::Result<Vec<Job>>;
}
