//! Error types for the retry orchestrator
//!
//! These describe misuse of the orchestrator API. A request's own failure is
//! never wrapped in one of these: it is handed back to the caller untouched.

use thiserror::Error;

use crate::outcome::RequestOutcome;

/// Errors raised by the orchestrator API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The decision step already started; the batch no longer accepts input
    #[error("retry batch {batch} already settled its decision; {operation} rejected")]
    Settled {
        /// Orchestrator id
        batch: String,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// A required collaborator was not supplied to the builder
    #[error("missing collaborator: {name}")]
    MissingCollaborator {
        /// Collaborator name
        name: &'static str,
    },

    /// A job panicked while running on an execution context
    #[error("job panicked on execution context '{context}'")]
    JobPanicked {
        /// Context name
        context: String,
    },

    /// An execution context dropped a job it had accepted
    #[error("execution context '{context}' closed before finishing a job")]
    ContextClosed {
        /// Context name
        context: String,
    },
}

impl OrchestratorError {
    /// Create a settled error
    pub fn settled(batch: impl ToString, operation: &'static str) -> Self {
        OrchestratorError::Settled {
            batch: batch.to_string(),
            operation,
        }
    }

    /// Create a missing collaborator error
    pub fn missing_collaborator(name: &'static str) -> Self {
        OrchestratorError::MissingCollaborator { name }
    }

    /// Create a context closed error
    pub fn context_closed(context: impl Into<String>) -> Self {
        OrchestratorError::ContextClosed {
            context: context.into(),
        }
    }

    /// Create a job panicked error
    pub fn job_panicked(context: impl Into<String>) -> Self {
        OrchestratorError::JobPanicked {
            context: context.into(),
        }
    }

    /// Check if this error means the batch stopped accepting input
    pub fn is_settled(&self) -> bool {
        matches!(self, OrchestratorError::Settled { .. })
    }
}

/// An outcome the orchestrator refused, handed back unresolved.
///
/// The caller still owns the outcome and must resolve it itself.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RejectedOutcome {
    #[source]
    error: OrchestratorError,
    outcome: RequestOutcome,
}

impl RejectedOutcome {
    pub(crate) fn new(error: OrchestratorError, outcome: RequestOutcome) -> Self {
        Self { error, outcome }
    }

    /// Why the outcome was refused
    pub fn error(&self) -> &OrchestratorError {
        &self.error
    }

    /// Take the outcome back
    pub fn into_outcome(self) -> RequestOutcome {
        self.outcome
    }
}
