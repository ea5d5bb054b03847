//! Recorded outcome of one failed request

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::transport::{
    CompletionHandler, Connection, RequestHandle, ResponseBody, RetryBatch, SharedError,
};

/// The failed attempt of one request, pending a retry decision.
///
/// Every outcome ends in exactly one of: re-submission in a new batch, or
/// its handler invoked with the original result and error. Both consume the
/// outcome.
pub struct RequestOutcome {
    request: RequestHandle,
    original_result: Option<ResponseBody>,
    original_error: Option<SharedError>,
    handler: CompletionHandler,
    batch_entry_name: Option<String>,
}

impl RequestOutcome {
    /// Record an outcome for `request`, to be resolved through `handler`
    pub fn new<F>(request: RequestHandle, handler: F) -> Self
    where
        F: FnOnce(&Arc<dyn Connection>, Option<ResponseBody>, Option<SharedError>)
            + Send
            + 'static,
    {
        Self {
            request,
            original_result: None,
            original_error: None,
            handler: Box::new(handler),
            batch_entry_name: None,
        }
    }

    /// Set the result the failed attempt produced
    pub fn with_result(mut self, result: ResponseBody) -> Self {
        self.original_result = Some(result);
        self
    }

    /// Set the error the failed attempt produced
    pub fn with_error(mut self, error: SharedError) -> Self {
        self.original_error = Some(error);
        self
    }

    /// Set the entry name used when re-submitting in a batch
    pub fn with_batch_entry_name(mut self, name: impl Into<String>) -> Self {
        self.batch_entry_name = Some(name.into());
        self
    }

    /// The request that failed
    pub fn request(&self) -> &RequestHandle {
        &self.request
    }

    /// Result of the failed attempt
    pub fn original_result(&self) -> Option<&ResponseBody> {
        self.original_result.as_ref()
    }

    /// Error of the failed attempt
    pub fn original_error(&self) -> Option<&SharedError> {
        self.original_error.as_ref()
    }

    /// Entry name inside the batch
    pub fn batch_entry_name(&self) -> Option<&str> {
        self.batch_entry_name.as_deref()
    }

    /// Hand the original result and error to the caller's handler
    pub fn resolve(self, connection: &Arc<dyn Connection>) {
        (self.handler)(connection, self.original_result, self.original_error);
    }

    /// Like [`RequestOutcome::resolve`], but a panicking handler is logged
    /// instead of unwinding into the caller.
    ///
    /// Returns `false` if the handler panicked.
    pub(crate) fn resolve_isolated(self, connection: &Arc<dyn Connection>) -> bool {
        let entry = self.batch_entry_name.clone();
        let resolved = panic::catch_unwind(AssertUnwindSafe(|| self.resolve(connection))).is_ok();
        if !resolved {
            error!(connection = connection.id(), entry = ?entry, "completion handler panicked");
        }
        resolved
    }

    /// Move the request and its handler into a retry batch
    pub(crate) fn reattach_to(self, batch: &mut RetryBatch) {
        batch.reattach(self.request, self.handler, self.batch_entry_name);
    }
}

impl fmt::Debug for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOutcome")
            .field("batch_entry_name", &self.batch_entry_name)
            .field("original_result", &self.original_result)
            .field(
                "original_error",
                &self.original_error.as_ref().map(|e| e.to_string()),
            )
            .finish_non_exhaustive()
    }
}
