//! Retry orchestrator
//!
//! One [`RetryOrchestrator`] is created per failed batch. Completion sites
//! record a [`RequestOutcome`] for every request that needs a second look,
//! optional pre-steps hold the decision back, and the owning routine fires
//! [`RetryOrchestrator::trigger`] once it is done. When the last arrival
//! lands the orchestrator shows any pending alert, waits for dismissal, and
//! then acts on the disposition exactly once:
//!
//! - `AbortRetries` hands every caller its original result or error
//! - `RepairSession` repairs the session and retries or aborts on the result
//! - `Normal` re-submits the requests in a fresh batch
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reissue_batch::{RetryManager, Transport};
//!
//! # async fn example(transport: Arc<dyn Transport>, connection: Arc<dyn reissue_batch::Connection>) {
//! let manager = RetryManager::builder()
//!     .with_transport(transport)
//!     .build()
//!     .unwrap();
//!
//! let orchestrator = manager.create(connection);
//! orchestrator.set_pending_alert_message("The service is briefly unavailable").unwrap();
//! orchestrator.trigger();
//! orchestrator.wait_settled().await;
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reissue_core::types::{Disposition, RuntimeConfig};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::alert::{AlertGate, AlertPresenter, DefaultLocalizer, HeadlessPresenter, Localizer};
use crate::context::ExecutionContext;
use crate::error::{OrchestratorError, RejectedOutcome};
use crate::join::{Arrival, CompletionLatch};
use crate::observer::{RetryObserver, TracingObserver};
use crate::outcome::RequestOutcome;
use crate::session::{Session, SessionRepairCoordinator};
use crate::transport::{Connection, RetryBatch, Transport};

/// Where an orchestrator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting outcomes and waiting for arrivals
    Accumulating,
    /// Decision started; a notice is on screen
    AwaitingAlert,
    /// Disposition action running
    Acting,
    /// Done; further input is rejected
    Settled,
}

/// Collaborators shared by every orchestrator of one manager
struct Shared {
    transport: Arc<dyn Transport>,
    main_context: ExecutionContext,
    alerts: AlertGate,
    observer: Arc<dyn RetryObserver>,
    runtime: Handle,
}

/// Builder for a [`RetryManager`]
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use reissue_batch::{RetryManager, StatsObserver, Transport};
/// use reissue_core::HierarchicalConfigLoader;
///
/// # fn example(transport: Arc<dyn Transport>) -> Result<(), Box<dyn std::error::Error>> {
/// let config = HierarchicalConfigLoader::new()?.load_runtime_config()?;
/// let manager = RetryManager::builder()
///     .with_config(config)
///     .with_transport(transport)
///     .with_observer(StatsObserver::new())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RetryManagerBuilder {
    config: RuntimeConfig,
    transport: Option<Arc<dyn Transport>>,
    main_context: Option<ExecutionContext>,
    presenter: Option<Arc<dyn AlertPresenter>>,
    localizer: Option<Arc<dyn Localizer>>,
    observer: Option<Arc<dyn RetryObserver>>,
    runtime: Option<Handle>,
}

impl RetryManagerBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for alert labels, the main context name and logging
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport that starts retry batches (required)
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Context for alerts, batch starts and aborts.
    ///
    /// Defaults to a new serial context named after `dispatch.main-context`.
    pub fn with_main_context(mut self, context: ExecutionContext) -> Self {
        self.main_context = Some(context);
        self
    }

    /// Notice presenter, [`HeadlessPresenter`] by default
    pub fn with_presenter(mut self, presenter: Arc<dyn AlertPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Localizer for the dismiss button, [`DefaultLocalizer`] by default
    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    /// Observer for lifecycle events, [`TracingObserver`] by default
    pub fn with_observer<O: RetryObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Runtime decisions are spawned on, the current one by default
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the manager
    pub fn build(self) -> Result<RetryManager, OrchestratorError> {
        let transport = self
            .transport
            .ok_or_else(|| OrchestratorError::missing_collaborator("transport"))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|_| OrchestratorError::missing_collaborator("tokio runtime"))?,
        };
        let main_context = self.main_context.unwrap_or_else(|| {
            ExecutionContext::serial_on(self.config.dispatch.main_context.clone(), &runtime)
        });

        let presenter = self
            .presenter
            .unwrap_or_else(|| Arc::new(HeadlessPresenter));
        let localizer = self
            .localizer
            .unwrap_or_else(|| Arc::new(DefaultLocalizer));
        let observer = self.observer.unwrap_or_else(|| {
            Arc::new(TracingObserver::new(self.config.logging.operation.clone()))
        });

        let alerts = AlertGate::new(
            presenter,
            localizer,
            main_context.clone(),
            self.config.alert.clone(),
        );

        Ok(RetryManager {
            shared: Arc::new(Shared {
                transport,
                main_context,
                alerts,
                observer,
                runtime,
            }),
        })
    }
}

/// Creates orchestrators that share one transport, main context and alert gate
#[derive(Clone)]
pub struct RetryManager {
    shared: Arc<Shared>,
}

impl RetryManager {
    /// Start building a manager
    pub fn builder() -> RetryManagerBuilder {
        RetryManagerBuilder::new()
    }

    /// Create an orchestrator for the failed batch that ran on `connection`
    pub fn create(&self, connection: Arc<dyn Connection>) -> Arc<RetryOrchestrator> {
        let id = Uuid::new_v4();
        let (phase, _) = watch::channel(Phase::Accumulating);
        debug!(batch = %id, connection = connection.id(), "retry orchestrator created");

        Arc::new(RetryOrchestrator {
            id,
            label: id.to_string(),
            connection,
            shared: Arc::clone(&self.shared),
            latch: CompletionLatch::new(),
            state: Mutex::new(BatchState::default()),
            phase,
        })
    }

    /// Main execution context
    pub fn main_context(&self) -> &ExecutionContext {
        &self.shared.main_context
    }

    /// Alert gate shared by this manager's orchestrators
    pub fn alert_gate(&self) -> &AlertGate {
        &self.shared.alerts
    }
}

impl fmt::Debug for RetryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryManager")
            .field("main_context", &self.shared.main_context)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct BatchState {
    outcomes: Vec<RequestOutcome>,
    pending_alert: Option<String>,
    disposition: Disposition,
    session: Option<Arc<dyn Session>>,
}

/// Per-batch retry coordinator
pub struct RetryOrchestrator {
    id: Uuid,
    label: String,
    connection: Arc<dyn Connection>,
    shared: Arc<Shared>,
    latch: CompletionLatch,
    state: Mutex<BatchState>,
    phase: watch::Sender<Phase>,
}

impl RetryOrchestrator {
    /// Orchestrator id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Connection of the batch that failed
    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Outcomes recorded and not yet acted on
    pub fn outcome_count(&self) -> usize {
        self.lock_state().outcomes.len()
    }

    /// Arrivals still needed before the decision runs
    pub fn pending_arrivals(&self) -> usize {
        self.latch.pending()
    }

    /// Record one request that needs a decision.
    ///
    /// Accepted until the latch releases; outcomes keep insertion order.
    /// A refused outcome is handed back in the error so its handler can
    /// still be resolved by the caller.
    pub fn add_outcome(&self, outcome: RequestOutcome) -> Result<(), RejectedOutcome> {
        let position = {
            let mut state = self.lock_state();
            if self.latch.is_released() {
                return Err(RejectedOutcome::new(
                    OrchestratorError::settled(&self.label, "add_outcome"),
                    outcome,
                ));
            }
            state.outcomes.push(outcome);
            state.outcomes.len()
        };
        self.shared
            .observer
            .on_outcome_recorded(&self.label, position);
        Ok(())
    }

    /// Choose what happens to the recorded outcomes
    pub fn set_disposition(&self, disposition: Disposition) -> Result<(), OrchestratorError> {
        self.update("set_disposition", |state| state.disposition = disposition)
    }

    /// Session to repair when the disposition is `RepairSession`
    pub fn set_session_to_reconnect(
        &self,
        session: Arc<dyn Session>,
    ) -> Result<(), OrchestratorError> {
        self.update("set_session_to_reconnect", |state| {
            state.session = Some(session)
        })
    }

    /// Notice to show before acting.
    ///
    /// Setting it again before the notice is shown replaces the message; an
    /// empty message clears it.
    pub fn set_pending_alert_message(
        &self,
        message: impl Into<String>,
    ) -> Result<(), OrchestratorError> {
        let message = message.into();
        self.update("set_pending_alert_message", |state| {
            state.pending_alert = (!message.is_empty()).then_some(message)
        })
    }

    /// Hold the decision back for one more arrival.
    ///
    /// Returns the number of arrivals now outstanding.
    pub fn increment_suppression_count(&self) -> Result<usize, OrchestratorError> {
        self.latch
            .register()
            .ok_or_else(|| OrchestratorError::settled(&self.label, "increment_suppression_count"))
    }

    /// Register an asynchronous pre-step.
    ///
    /// The returned guard arrives when finished or dropped.
    pub fn begin_pre_step(self: &Arc<Self>) -> Result<PreStep, OrchestratorError> {
        self.increment_suppression_count()?;
        Ok(PreStep {
            orchestrator: Some(Arc::clone(self)),
        })
    }

    /// Report one arrival; the last one starts the decision.
    pub fn trigger(self: &Arc<Self>) -> Arrival {
        let arrival = self.latch.arrive();
        match arrival {
            Arrival::Pending(remaining) => {
                self.shared
                    .observer
                    .on_trigger_suppressed(&self.label, remaining);
            }
            Arrival::Released => {
                let orchestrator = Arc::clone(self);
                self.shared.runtime.spawn(orchestrator.decide());
            }
            Arrival::AlreadyReleased => {
                debug!(batch = %self.label, "trigger after decision ignored");
            }
        }
        arrival
    }

    /// Wait until the decision has finished acting
    pub async fn wait_settled(&self) {
        let mut phase = self.phase.subscribe();
        // The sender lives in self, so the channel cannot close while waiting
        let _ = phase.wait_for(|p| *p == Phase::Settled).await;
    }

    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut BatchState),
    ) -> Result<(), OrchestratorError> {
        let mut state = self.lock_state();
        match self.phase() {
            Phase::Accumulating | Phase::AwaitingAlert => {
                apply(&mut state);
                Ok(())
            }
            Phase::Acting | Phase::Settled => {
                Err(OrchestratorError::settled(&self.label, operation))
            }
        }
    }

    async fn decide(self: Arc<Self>) {
        let (disposition, session, outcomes) = loop {
            let notice = {
                let mut state = self.lock_state();
                match state.pending_alert.take() {
                    Some(message) => {
                        self.phase.send_replace(Phase::AwaitingAlert);
                        message
                    }
                    None => {
                        self.phase.send_replace(Phase::Acting);
                        break (
                            state.disposition,
                            state.session.take(),
                            std::mem::take(&mut state.outcomes),
                        );
                    }
                }
            };
            self.present(notice).await;
        };

        self.act(disposition, session, outcomes).await;
        self.phase.send_replace(Phase::Settled);
        debug!(batch = %self.label, "retry orchestrator settled");
    }

    async fn present(&self, message: String) {
        // Keep the failed connection alive while the user reads the notice
        let held = Arc::clone(&self.connection);
        let observer = &self.shared.observer;
        let presented = || observer.on_alert_presented(&self.label, &message);
        if let Err(err) = self.shared.alerts.show_with(message.clone(), presented).await {
            warn!(batch = %self.label, error = %err, "notice could not be presented");
        }
        self.shared.observer.on_alert_dismissed(&self.label);
        drop(held);
    }

    async fn act(
        &self,
        disposition: Disposition,
        session: Option<Arc<dyn Session>>,
        outcomes: Vec<RequestOutcome>,
    ) {
        if outcomes.is_empty() {
            debug!(batch = %self.label, %disposition, "no outcomes recorded, nothing to do");
            return;
        }

        let effective = match (disposition, &session) {
            (Disposition::RepairSession, None) => {
                warn!(batch = %self.label, "repair requested without a session, aborting instead");
                Disposition::AbortRetries
            }
            (disposition, _) => disposition,
        };
        self.shared
            .observer
            .on_decision(&self.label, effective, outcomes.len());

        match (effective, session) {
            (Disposition::RepairSession, Some(session)) => self.repair(session, outcomes).await,
            (Disposition::Normal, _) => self.restart(outcomes).await,
            _ => self.abort(outcomes).await,
        }
    }

    async fn abort(&self, outcomes: Vec<RequestOutcome>) {
        let count = outcomes.len();
        let connection = Arc::clone(&self.connection);
        let delivered = self
            .shared
            .main_context
            .run(async move {
                // Handlers are isolated from each other's panics
                outcomes
                    .into_iter()
                    .map(|outcome| outcome.resolve_isolated(&connection))
                    .filter(|resolved| !resolved)
                    .count()
            })
            .await;

        match delivered {
            Ok(panicked) => {
                if panicked > 0 {
                    warn!(batch = %self.label, panicked, "completion handlers panicked during abort");
                }
                self.shared.observer.on_aborted(&self.label, count);
            }
            Err(err) => {
                error!(batch = %self.label, error = %err, "original results were not delivered");
            }
        }
    }

    async fn restart(&self, outcomes: Vec<RequestOutcome>) {
        let behavior = self.connection.error_behavior().for_plain_retry();
        let mut batch = RetryBatch::new(behavior);
        for outcome in outcomes {
            outcome.reattach_to(&mut batch);
        }
        let requests = batch.len();

        let transport = Arc::clone(&self.shared.transport);
        match self
            .shared
            .main_context
            .run(async move { transport.start_batch(batch) })
            .await
        {
            Ok(retry) => {
                debug!(batch = %self.label, retry_connection = retry.id(), "retry batch started");
                self.shared
                    .observer
                    .on_batch_restarted(&self.label, requests, behavior);
            }
            Err(err) => {
                error!(batch = %self.label, error = %err, "retry batch was never started");
            }
        }
    }

    async fn repair(&self, session: Arc<dyn Session>, outcomes: Vec<RequestOutcome>) {
        let context = session
            .affinitized_context()
            .unwrap_or_else(|| self.shared.main_context.clone());

        let result = SessionRepairCoordinator::new(
            self.label.clone(),
            Arc::clone(&self.connection),
            Arc::clone(&self.shared.transport),
            Arc::clone(&self.shared.observer),
        )
        .run(session, context, outcomes)
        .await;
        debug!(batch = %self.label, ?result, "session repair finished");
    }
}

impl fmt::Debug for RetryOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOrchestrator")
            .field("id", &self.id)
            .field("connection", &self.connection.id())
            .field("phase", &self.phase())
            .field("pending_arrivals", &self.pending_arrivals())
            .finish_non_exhaustive()
    }
}

/// A registered asynchronous pre-step.
///
/// Arrives at the orchestrator's latch exactly once, on [`PreStep::finish`]
/// or when dropped.
pub struct PreStep {
    orchestrator: Option<Arc<RetryOrchestrator>>,
}

impl PreStep {
    /// Report that the pre-step is done
    pub fn finish(mut self) -> Arrival {
        match self.orchestrator.take() {
            Some(orchestrator) => orchestrator.trigger(),
            None => Arrival::AlreadyReleased,
        }
    }
}

impl Drop for PreStep {
    fn drop(&mut self) {
        if let Some(orchestrator) = self.orchestrator.take() {
            orchestrator.trigger();
        }
    }
}

impl fmt::Debug for PreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreStep")
            .field("orchestrator", &self.orchestrator.as_ref().map(|o| o.id()))
            .finish()
    }
}
