//! Named serial execution contexts
//!
//! An [`ExecutionContext`] runs submitted jobs one at a time, in submission
//! order, on a dedicated tokio task. The orchestrator receives contexts as
//! explicit values: the main context for alerts and batch starts, and a
//! session's own context for repair.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, trace, warn};

use crate::error::OrchestratorError;

type Job = BoxFuture<'static, ()>;

/// A cloneable handle to a serial executor
#[derive(Clone)]
pub struct ExecutionContext {
    name: Arc<str>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl ExecutionContext {
    /// Spawn a serial context on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn serial(name: impl Into<String>) -> Self {
        Self::serial_on(name, &Handle::current())
    }

    /// Spawn a serial context on `runtime`
    pub fn serial_on(name: impl Into<String>, runtime: &Handle) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        let worker_name = Arc::clone(&name);
        runtime.spawn(async move {
            while let Some(job) = queue.recv().await {
                if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                    error!(context = %worker_name, "job panicked, context keeps running");
                }
            }
            trace!(context = %worker_name, "execution context drained");
        });

        Self { name, jobs }
    }

    /// Context name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `future` on this context and wait for its output.
    ///
    /// If the context has already shut down the job runs inline on the
    /// caller instead, so work handed to a dead context is not lost. A
    /// panicking job yields [`OrchestratorError::JobPanicked`] and leaves
    /// the context running.
    pub async fn run<F, T>(&self, future: F) -> Result<T, OrchestratorError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, output) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = reply.send(AssertUnwindSafe(future).catch_unwind().await);
        });

        if let Err(mpsc::error::SendError(job)) = self.jobs.send(job) {
            warn!(context = %self.name, "execution context closed, running job inline");
            job.await;
        }

        match output.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => {
                error!(context = %self.name, "job panicked");
                Err(OrchestratorError::job_panicked(self.name.as_ref()))
            }
            Err(_) => Err(OrchestratorError::context_closed(self.name.as_ref())),
        }
    }

    /// Whether the context stopped accepting jobs
    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_run_returns_output() {
        let ctx = ExecutionContext::serial("main");
        let value = ctx.run(async { 21 * 2 }).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(ctx.name(), "main");
    }

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let ctx = ExecutionContext::serial("main");
        let log = Arc::new(Mutex::new(Vec::new()));

        // join_all polls in order, so jobs are queued 0..5
        let runs = (0..5).map(|i| {
            let log = Arc::clone(&log);
            ctx.run(async move {
                tokio::task::yield_now().await;
                log.lock().unwrap().push(i);
            })
        });

        for result in futures::future::join_all(runs).await {
            result.unwrap();
        }

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panicking_job_leaves_context_running() {
        let ctx = ExecutionContext::serial("main");

        let err = ctx
            .run(async {
                panic!("handler failed");
            })
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::job_panicked("main"));

        assert!(!ctx.is_closed());
        assert_eq!(ctx.run(async { "still serving" }).await.unwrap(), "still serving");
    }

    #[tokio::test]
    async fn test_closed_context_runs_inline() {
        let (jobs, queue) = mpsc::unbounded_channel::<Job>();
        drop(queue);
        let ctx = ExecutionContext {
            name: Arc::from("gone"),
            jobs,
        };

        assert!(ctx.is_closed());
        let value = ctx.run(async { "inline" }).await.unwrap();
        assert_eq!(value, "inline");
    }
}
