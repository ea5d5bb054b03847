//! # reissue-batch
//!
//! Decides, exactly once per failed batch, whether its requests are
//! retried, aborted with their original results, or retried after the
//! session they ran under has been repaired.
//!
//! - [`RetryManager`] holds the shared collaborators and creates one
//!   [`RetryOrchestrator`] per failed batch
//! - [`CompletionLatch`] joins asynchronous pre-steps with the owning
//!   routine's final trigger
//! - [`AlertGate`] shows blocking notices one at a time
//! - [`SessionRepairCoordinator`] repairs a session and retries or aborts

pub mod alert;
pub mod context;
pub mod error;
pub mod join;
pub mod observer;
pub mod orchestrator;
pub mod outcome;
pub mod session;
pub mod transport;

pub use alert::{
    AlertGate, AlertPresenter, DefaultLocalizer, DismissHandle, HeadlessPresenter, Localizer,
    Notice, StaticLocalizer,
};
pub use context::ExecutionContext;
pub use error::{OrchestratorError, RejectedOutcome};
pub use join::{Arrival, CompletionLatch};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use orchestrator::{Phase, PreStep, RetryManager, RetryManagerBuilder, RetryOrchestrator};
pub use outcome::RequestOutcome;
pub use session::{RepairOutcome, Session, SessionRepairCoordinator};
pub use transport::{
    BatchEntry, CompletionHandler, Connection, Request, RequestHandle, ResponseBody, RetryBatch,
    SharedError, Transport,
};

pub use reissue_core::{Disposition, ErrorBehavior};
