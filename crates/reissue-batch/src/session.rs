//! Session repair
//!
//! When a batch failed because its session went bad, the orchestrator asks
//! the session to repair itself on the session's own execution context.
//! A successful repair re-submits every request in a fresh batch with the
//! reconnect and alert behaviors cleared; a failed repair closes the
//! affected sessions and hands every caller its original error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::context::ExecutionContext;
use crate::observer::RetryObserver;
use crate::outcome::RequestOutcome;
use crate::transport::{Connection, RetryBatch, SharedError, Transport};

/// An authenticated session requests run under
#[async_trait]
pub trait Session: Send + Sync {
    /// Identifier used in logs
    fn id(&self) -> &str;

    /// Whether the session is currently usable
    fn is_open(&self) -> bool;

    /// Whether a repair of this session is already running
    fn is_repairing(&self) -> bool;

    /// Context the session expects its calls on, if it has one
    fn affinitized_context(&self) -> Option<ExecutionContext>;

    /// Try to re-establish the session
    async fn repair(&self) -> Result<(), SharedError>;

    /// Close the session and clear its credentials, tagged with `error`
    fn close_and_clear_credentials(&self, error: Option<&SharedError>);
}

/// How a repair attempt ended for the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Session repaired and `requests` re-submitted
    Retried {
        /// Requests in the new batch
        requests: usize,
    },
    /// Session repaired but there was nothing to re-submit
    Repaired,
    /// Repair failed and `outcomes` were handed back with original errors
    Aborted {
        /// Outcomes resolved
        outcomes: usize,
    },
}

/// Drives one repair attempt for one failed batch
pub struct SessionRepairCoordinator {
    batch: String,
    connection: Arc<dyn Connection>,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn RetryObserver>,
}

impl SessionRepairCoordinator {
    /// Create a coordinator for the batch that ran on `connection`
    pub fn new(
        batch: impl Into<String>,
        connection: Arc<dyn Connection>,
        transport: Arc<dyn Transport>,
        observer: Arc<dyn RetryObserver>,
    ) -> Self {
        Self {
            batch: batch.into(),
            connection,
            transport,
            observer,
        }
    }

    /// Repair `session` on `context`, then retry or abort `outcomes`.
    ///
    /// The completion path runs on `context` as well.
    pub async fn run(
        self,
        session: Arc<dyn Session>,
        context: ExecutionContext,
        outcomes: Vec<RequestOutcome>,
    ) -> RepairOutcome {
        // Held until the completion path has finished
        let held = Arc::clone(&self.connection);
        self.observer.on_repair_started(&self.batch, session.id());

        let attempt = {
            let session = Arc::clone(&session);
            context.run(async move { session.repair().await }).await
        };

        let repaired = match attempt {
            Ok(Ok(())) => session.is_open(),
            Ok(Err(err)) => {
                debug!(batch = %self.batch, session = session.id(), error = %err, "repair returned an error");
                false
            }
            Err(err) => {
                warn!(batch = %self.batch, error = %err, "repair never completed");
                false
            }
        };
        self.observer
            .on_repair_finished(&self.batch, session.id(), repaired);

        let result = if repaired {
            self.retry_repaired(&context, &held, outcomes).await
        } else {
            self.abort_unrepaired(&context, &held, outcomes).await
        };

        drop(held);
        result
    }

    async fn retry_repaired(
        &self,
        context: &ExecutionContext,
        connection: &Arc<dyn Connection>,
        outcomes: Vec<RequestOutcome>,
    ) -> RepairOutcome {
        if outcomes.is_empty() {
            return RepairOutcome::Repaired;
        }

        let behavior = connection.error_behavior().for_repaired_retry();
        let mut batch = RetryBatch::new(behavior);
        for outcome in outcomes {
            outcome.request().set_allow_session_close_on_error(true);
            outcome.reattach_to(&mut batch);
        }
        let requests = batch.len();

        let transport = Arc::clone(&self.transport);
        match context.run(async move { transport.start_batch(batch) }).await {
            Ok(retry) => {
                debug!(batch = %self.batch, retry_connection = retry.id(), "repaired batch started");
                self.observer
                    .on_batch_restarted(&self.batch, requests, behavior);
            }
            Err(err) => {
                error!(batch = %self.batch, error = %err, "repaired batch was never started");
            }
        }

        RepairOutcome::Retried { requests }
    }

    async fn abort_unrepaired(
        &self,
        context: &ExecutionContext,
        connection: &Arc<dyn Connection>,
        outcomes: Vec<RequestOutcome>,
    ) -> RepairOutcome {
        let count = outcomes.len();
        let connection = Arc::clone(connection);

        let delivered = context
            .run(async move {
                let mut panicked = 0usize;
                for outcome in outcomes {
                    if let Some(session) = outcome.request().session() {
                        if session.is_open() && !session.is_repairing() {
                            session.close_and_clear_credentials(outcome.original_error());
                        }
                    }
                    if !outcome.resolve_isolated(&connection) {
                        panicked += 1;
                    }
                }
                panicked
            })
            .await;

        match delivered {
            Ok(panicked) => {
                if panicked > 0 {
                    warn!(batch = %self.batch, panicked, "completion handlers panicked during abort");
                }
                self.observer.on_aborted(&self.batch, count);
            }
            Err(err) => {
                error!(batch = %self.batch, error = %err, "original errors were not delivered");
            }
        }

        RepairOutcome::Aborted { outcomes: count }
    }
}
