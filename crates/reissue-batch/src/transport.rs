//! Seams to the request transport layer
//!
//! The orchestrator never performs network I/O. It sees the original batch
//! as a [`Connection`], each failed request as a [`Request`], and starts
//! replacement batches through a [`Transport`].

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use reissue_core::ErrorBehavior;

use crate::session::Session;

/// Error produced by a failed request attempt, shared with its caller
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Decoded response body of a request
pub type ResponseBody = serde_json::Value;

/// Callback the caller supplied with its request.
///
/// Boxed `FnOnce`: the orchestrator cannot invoke it twice.
pub type CompletionHandler = Box<
    dyn FnOnce(&Arc<dyn Connection>, Option<ResponseBody>, Option<SharedError>) + Send + 'static,
>;

/// Shared handle to a request owned by the transport layer
pub type RequestHandle = Arc<dyn Request>;

/// A batch connection as seen by the orchestrator
pub trait Connection: Send + Sync {
    /// Identifier used in logs
    fn id(&self) -> &str;

    /// Error-handling capabilities the connection was started with
    fn error_behavior(&self) -> ErrorBehavior;
}

/// A single request inside a batch
pub trait Request: Send + Sync {
    /// Session the request authenticates with, if any
    fn session(&self) -> Option<Arc<dyn Session>>;

    /// Whether a failure of this request may close its session
    fn allow_session_close_on_error(&self) -> bool;

    /// Allow or forbid this request's failures to close its session
    fn set_allow_session_close_on_error(&self, allow: bool);
}

/// Starts batches on behalf of the orchestrator
pub trait Transport: Send + Sync {
    /// Start a batch and return its connection.
    ///
    /// The transport owns every handler in the batch from this point on.
    fn start_batch(&self, batch: RetryBatch) -> Arc<dyn Connection>;
}

/// One request re-added to a retry batch
pub struct BatchEntry {
    /// The request to submit again
    pub request: RequestHandle,
    /// The caller's original completion handler
    pub handler: CompletionHandler,
    /// Name of the entry inside the batch, if the caller named it
    pub batch_entry_name: Option<String>,
}

impl fmt::Debug for BatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchEntry")
            .field("batch_entry_name", &self.batch_entry_name)
            .finish_non_exhaustive()
    }
}

/// A replacement batch assembled by the orchestrator
#[derive(Debug)]
pub struct RetryBatch {
    error_behavior: ErrorBehavior,
    entries: Vec<BatchEntry>,
}

impl RetryBatch {
    /// Create an empty batch with the given error behavior
    pub fn new(error_behavior: ErrorBehavior) -> Self {
        Self {
            error_behavior,
            entries: Vec::new(),
        }
    }

    /// Re-add a request under its original handler and entry name
    pub fn reattach(
        &mut self,
        request: RequestHandle,
        handler: CompletionHandler,
        batch_entry_name: Option<String>,
    ) {
        self.entries.push(BatchEntry {
            request,
            handler,
            batch_entry_name,
        });
    }

    /// Error behavior the batch should be started with
    pub fn error_behavior(&self) -> ErrorBehavior {
        self.error_behavior
    }

    /// Entries in submission order
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Take the entries, in submission order
    pub fn into_entries(self) -> Vec<BatchEntry> {
        self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
