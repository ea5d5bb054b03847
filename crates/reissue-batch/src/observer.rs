//! Retry orchestration observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring what an
//! orchestrator decides and a `TracingObserver` implementation that logs using
//! the `tracing` crate.

use std::sync::atomic::{AtomicU32, Ordering};

use reissue_core::{Disposition, ErrorBehavior};

/// Observer trait for orchestrator events
///
/// Implement this trait to receive callbacks as a failed batch moves through
/// its decision. Every callback carries the orchestrator id as `batch`.
///
/// # Example
///
/// ```rust
/// use reissue_batch::RetryObserver;
/// use reissue_core::Disposition;
///
/// struct DecisionCounter;
///
/// impl RetryObserver for DecisionCounter {
///     fn on_trigger_suppressed(&self, batch: &str, remaining: usize) {
///         // Record how many pre-steps are still outstanding
///     }
///
///     fn on_decision(&self, batch: &str, disposition: Disposition, outcomes: usize) {
///         // Record the chosen disposition
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when an outcome is recorded
    fn on_outcome_recorded(&self, batch: &str, position: usize) {
        let _ = (batch, position);
    }

    /// Called when a trigger arrives but other arrivals are still outstanding
    ///
    /// # Arguments
    ///
    /// * `batch` - The orchestrator id
    /// * `remaining` - Arrivals still outstanding after this one
    fn on_trigger_suppressed(&self, batch: &str, remaining: usize);

    /// Called once per batch when the disposition action starts
    ///
    /// # Arguments
    ///
    /// * `batch` - The orchestrator id
    /// * `disposition` - The disposition being executed
    /// * `outcomes` - Number of outcomes it applies to
    fn on_decision(&self, batch: &str, disposition: Disposition, outcomes: usize);

    /// Called when a blocking notice is handed to the presenter
    fn on_alert_presented(&self, batch: &str, message: &str) {
        let _ = (batch, message);
    }

    /// Called when the notice is dismissed and the decision resumes
    fn on_alert_dismissed(&self, batch: &str) {
        let _ = batch;
    }

    /// Called when a replacement batch is started
    fn on_batch_restarted(&self, batch: &str, requests: usize, behavior: ErrorBehavior) {
        let _ = (batch, requests, behavior);
    }

    /// Called when outcomes are handed back with their original errors
    fn on_aborted(&self, batch: &str, outcomes: usize) {
        let _ = (batch, outcomes);
    }

    /// Called when a session repair is dispatched
    fn on_repair_started(&self, batch: &str, session: &str) {
        let _ = (batch, session);
    }

    /// Called when the session repair completes
    fn on_repair_finished(&self, batch: &str, session: &str, repaired: bool) {
        let _ = (batch, session, repaired);
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_trigger_suppressed(&self, _batch: &str, _remaining: usize) {}

    fn on_decision(&self, _batch: &str, _disposition: Disposition, _outcomes: usize) {}
}

/// An observer that logs orchestrator events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_outcome_recorded`, `on_trigger_suppressed`: DEBUG
/// - `on_decision`, `on_batch_restarted`, `on_repair_finished` (repaired): INFO
/// - `on_alert_presented`, `on_alert_dismissed`, `on_repair_started`: INFO
/// - `on_aborted`, `on_repair_finished` (not repaired): WARN
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Operation label for log context
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("batch-retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_outcome_recorded(&self, batch: &str, position: usize) {
        tracing::debug!(
            operation = %self.operation,
            batch = batch,
            position = position,
            "outcome recorded"
        );
    }

    fn on_trigger_suppressed(&self, batch: &str, remaining: usize) {
        tracing::debug!(
            operation = %self.operation,
            batch = batch,
            remaining = remaining,
            "trigger suppressed, pre-steps outstanding"
        );
    }

    fn on_decision(&self, batch: &str, disposition: Disposition, outcomes: usize) {
        tracing::info!(
            operation = %self.operation,
            batch = batch,
            disposition = %disposition,
            outcomes = outcomes,
            "executing retry decision"
        );
    }

    fn on_alert_presented(&self, batch: &str, message: &str) {
        tracing::info!(
            operation = %self.operation,
            batch = batch,
            message = message,
            "alert presented, decision paused"
        );
    }

    fn on_alert_dismissed(&self, batch: &str) {
        tracing::info!(
            operation = %self.operation,
            batch = batch,
            "alert dismissed, re-evaluating"
        );
    }

    fn on_batch_restarted(&self, batch: &str, requests: usize, behavior: ErrorBehavior) {
        tracing::info!(
            operation = %self.operation,
            batch = batch,
            requests = requests,
            behavior = ?behavior,
            "retry batch started"
        );
    }

    fn on_aborted(&self, batch: &str, outcomes: usize) {
        tracing::warn!(
            operation = %self.operation,
            batch = batch,
            outcomes = outcomes,
            "retries aborted, original errors delivered"
        );
    }

    fn on_repair_started(&self, batch: &str, session: &str) {
        tracing::info!(
            operation = %self.operation,
            batch = batch,
            session = session,
            "repairing session"
        );
    }

    fn on_repair_finished(&self, batch: &str, session: &str, repaired: bool) {
        if repaired {
            tracing::info!(
                operation = %self.operation,
                batch = batch,
                session = session,
                "session repaired"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                batch = batch,
                session = session,
                "session repair failed"
            );
        }
    }
}

/// An observer that counts orchestrator events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    /// Outcomes recorded
    pub outcomes: AtomicU32,
    /// Suppressed triggers
    pub suppressed: AtomicU32,
    /// Decisions taken
    pub decisions: AtomicU32,
    /// Alerts presented
    pub alerts: AtomicU32,
    /// Alerts dismissed
    pub dismissals: AtomicU32,
    /// Retry batches started
    pub restarts: AtomicU32,
    /// Abort actions
    pub aborts: AtomicU32,
    /// Repairs that succeeded
    pub repairs: AtomicU32,
    /// Repairs that failed
    pub failed_repairs: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of recorded outcomes
    pub fn outcomes(&self) -> u32 {
        self.outcomes.load(Ordering::SeqCst)
    }

    /// Get the number of suppressed triggers
    pub fn suppressed(&self) -> u32 {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Get the number of decisions
    pub fn decisions(&self) -> u32 {
        self.decisions.load(Ordering::SeqCst)
    }

    /// Get the number of presented alerts
    pub fn alerts(&self) -> u32 {
        self.alerts.load(Ordering::SeqCst)
    }

    /// Get the number of dismissed alerts
    pub fn dismissals(&self) -> u32 {
        self.dismissals.load(Ordering::SeqCst)
    }

    /// Get the number of started retry batches
    pub fn restarts(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Get the number of abort actions
    pub fn aborts(&self) -> u32 {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Get the number of successful repairs
    pub fn repairs(&self) -> u32 {
        self.repairs.load(Ordering::SeqCst)
    }

    /// Get the number of failed repairs
    pub fn failed_repairs(&self) -> u32 {
        self.failed_repairs.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_outcome_recorded(&self, _batch: &str, _position: usize) {
        self.outcomes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_trigger_suppressed(&self, _batch: &str, _remaining: usize) {
        self.suppressed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_decision(&self, _batch: &str, _disposition: Disposition, _outcomes: usize) {
        self.decisions.fetch_add(1, Ordering::SeqCst);
    }

    fn on_alert_presented(&self, _batch: &str, _message: &str) {
        self.alerts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_alert_dismissed(&self, _batch: &str) {
        self.dismissals.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_restarted(&self, _batch: &str, _requests: usize, _behavior: ErrorBehavior) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_aborted(&self, _batch: &str, _outcomes: usize) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_repair_finished(&self, _batch: &str, _session: &str, repaired: bool) {
        if repaired {
            self.repairs.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed_repairs.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_outcome_recorded(&self, batch: &str, position: usize) {
        (**self).on_outcome_recorded(batch, position)
    }

    fn on_trigger_suppressed(&self, batch: &str, remaining: usize) {
        (**self).on_trigger_suppressed(batch, remaining)
    }

    fn on_decision(&self, batch: &str, disposition: Disposition, outcomes: usize) {
        (**self).on_decision(batch, disposition, outcomes)
    }

    fn on_alert_presented(&self, batch: &str, message: &str) {
        (**self).on_alert_presented(batch, message)
    }

    fn on_alert_dismissed(&self, batch: &str) {
        (**self).on_alert_dismissed(batch)
    }

    fn on_batch_restarted(&self, batch: &str, requests: usize, behavior: ErrorBehavior) {
        (**self).on_batch_restarted(batch, requests, behavior)
    }

    fn on_aborted(&self, batch: &str, outcomes: usize) {
        (**self).on_aborted(batch, outcomes)
    }

    fn on_repair_started(&self, batch: &str, session: &str) {
        (**self).on_repair_started(batch, session)
    }

    fn on_repair_finished(&self, batch: &str, session: &str, repaired: bool) {
        (**self).on_repair_finished(batch, session, repaired)
    }
}

/// Implement RetryObserver for Box<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_outcome_recorded(&self, batch: &str, position: usize) {
        (**self).on_outcome_recorded(batch, position)
    }

    fn on_trigger_suppressed(&self, batch: &str, remaining: usize) {
        (**self).on_trigger_suppressed(batch, remaining)
    }

    fn on_decision(&self, batch: &str, disposition: Disposition, outcomes: usize) {
        (**self).on_decision(batch, disposition, outcomes)
    }

    fn on_alert_presented(&self, batch: &str, message: &str) {
        (**self).on_alert_presented(batch, message)
    }

    fn on_alert_dismissed(&self, batch: &str) {
        (**self).on_alert_dismissed(batch)
    }

    fn on_batch_restarted(&self, batch: &str, requests: usize, behavior: ErrorBehavior) {
        (**self).on_batch_restarted(batch, requests, behavior)
    }

    fn on_aborted(&self, batch: &str, outcomes: usize) {
        (**self).on_aborted(batch, outcomes)
    }

    fn on_repair_started(&self, batch: &str, session: &str) {
        (**self).on_repair_started(batch, session)
    }

    fn on_repair_finished(&self, batch: &str, session: &str, repaired: bool) {
        (**self).on_repair_finished(batch, session, repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_observer() {
        let observer = NoOpObserver;

        observer.on_outcome_recorded("b", 0);
        observer.on_trigger_suppressed("b", 2);
        observer.on_decision("b", Disposition::Normal, 3);
        observer.on_repair_finished("b", "s", false);
    }

    #[test]
    fn test_stats_observer_counts() {
        let observer = StatsObserver::new();

        observer.on_outcome_recorded("b", 0);
        observer.on_outcome_recorded("b", 1);
        observer.on_trigger_suppressed("b", 1);
        observer.on_decision("b", Disposition::RepairSession, 2);
        observer.on_repair_finished("b", "s", true);
        observer.on_batch_restarted("b", 2, ErrorBehavior::RETRY);

        assert_eq!(observer.outcomes(), 2);
        assert_eq!(observer.suppressed(), 1);
        assert_eq!(observer.decisions(), 1);
        assert_eq!(observer.repairs(), 1);
        assert_eq!(observer.failed_repairs(), 0);
        assert_eq!(observer.restarts(), 1);
        assert_eq!(observer.aborts(), 0);
    }

    #[test]
    fn test_tracing_observer_creation() {
        let observer = TracingObserver::new("graph-batch");
        assert_eq!(observer.operation(), "graph-batch");

        let default_observer = TracingObserver::default();
        assert_eq!(default_observer.operation(), "batch-retry");
    }

    #[test]
    fn test_arc_observer() {
        let observer = std::sync::Arc::new(StatsObserver::new());

        observer.on_aborted("b", 4);
        observer.on_alert_presented("b", "Try again later");
        observer.on_alert_dismissed("b");

        assert_eq!(observer.aborts(), 1);
        assert_eq!(observer.alerts(), 1);
        assert_eq!(observer.dismissals(), 1);
    }
}
