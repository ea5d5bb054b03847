//! Mock implementations of the transport and session seams

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reissue_batch::{
    AlertPresenter, BatchEntry, Connection, DismissHandle, ErrorBehavior, ExecutionContext,
    Notice, Request, ResponseBody, RetryBatch, Session, SharedError, Transport,
};

/// Connection with a fixed id and error behavior
#[derive(Debug)]
pub struct MockConnection {
    id: String,
    behavior: ErrorBehavior,
}

impl MockConnection {
    pub fn new(id: &str, behavior: ErrorBehavior) -> Arc<dyn Connection> {
        Arc::new(Self {
            id: id.to_string(),
            behavior,
        })
    }
}

impl Connection for MockConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn error_behavior(&self) -> ErrorBehavior {
        self.behavior
    }
}

/// Request that may reference a session
pub struct MockRequest {
    pub name: String,
    session: Option<Arc<dyn Session>>,
    allow_close: AtomicBool,
}

impl MockRequest {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            session: None,
            allow_close: AtomicBool::new(false),
        })
    }

    pub fn with_session(name: &str, session: Arc<dyn Session>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            session: Some(session),
            allow_close: AtomicBool::new(false),
        })
    }
}

impl Request for MockRequest {
    fn session(&self) -> Option<Arc<dyn Session>> {
        self.session.clone()
    }

    fn allow_session_close_on_error(&self) -> bool {
        self.allow_close.load(Ordering::SeqCst)
    }

    fn set_allow_session_close_on_error(&self, allow: bool) {
        self.allow_close.store(allow, Ordering::SeqCst);
    }
}

/// Session whose repair outcome is chosen up front
pub struct MockSession {
    id: String,
    open: AtomicBool,
    repairing: AtomicBool,
    repair_succeeds: bool,
    context: Option<ExecutionContext>,
    repair_calls: AtomicUsize,
    closed_with: Mutex<Vec<Option<String>>>,
}

impl MockSession {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            open: AtomicBool::new(true),
            repairing: AtomicBool::new(false),
            repair_succeeds: true,
            context: None,
            repair_calls: AtomicUsize::new(0),
            closed_with: Mutex::new(Vec::new()),
        }
    }

    pub fn closed(mut self) -> Self {
        self.open = AtomicBool::new(false);
        self
    }

    pub fn repairing(mut self) -> Self {
        self.repairing = AtomicBool::new(true);
        self
    }

    pub fn failing_repair(mut self) -> Self {
        self.repair_succeeds = false;
        self
    }

    pub fn on_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn is_open_now(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Simulate the server dropping the session
    pub fn drop_connection(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn repair_calls(&self) -> usize {
        self.repair_calls.load(Ordering::SeqCst)
    }

    /// Error messages `close_and_clear_credentials` was called with
    pub fn closed_with(&self) -> Vec<Option<String>> {
        self.closed_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn is_repairing(&self) -> bool {
        self.repairing.load(Ordering::SeqCst)
    }

    fn affinitized_context(&self) -> Option<ExecutionContext> {
        self.context.clone()
    }

    async fn repair(&self) -> Result<(), SharedError> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        if self.repair_succeeds {
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(Arc::new(std::io::Error::other("credentials rejected")))
        }
    }

    fn close_and_clear_credentials(&self, error: Option<&SharedError>) {
        self.open.store(false, Ordering::SeqCst);
        self.closed_with
            .lock()
            .unwrap()
            .push(error.map(|e| e.to_string()));
    }
}

/// Session whose repair reports success but leaves it closed
pub struct ClosingAfterRepair(pub Arc<MockSession>);

#[async_trait]
impl Session for ClosingAfterRepair {
    fn id(&self) -> &str {
        self.0.id()
    }

    fn is_open(&self) -> bool {
        self.0.is_open()
    }

    fn is_repairing(&self) -> bool {
        self.0.is_repairing()
    }

    fn affinitized_context(&self) -> Option<ExecutionContext> {
        self.0.affinitized_context()
    }

    async fn repair(&self) -> Result<(), SharedError> {
        self.0.repair().await?;
        self.0.drop_connection();
        Ok(())
    }

    fn close_and_clear_credentials(&self, error: Option<&SharedError>) {
        self.0.close_and_clear_credentials(error)
    }
}

/// A batch handed to [`RecordingTransport`]
#[derive(Debug)]
pub struct StartedBatch {
    pub connection_id: String,
    pub behavior: ErrorBehavior,
    pub entries: Vec<BatchEntry>,
}

impl StartedBatch {
    pub fn names(&self) -> Vec<Option<String>> {
        self.entries
            .iter()
            .map(|e| e.batch_entry_name.clone())
            .collect()
    }
}

/// Transport that records started batches instead of sending them
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<StartedBatch>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn behaviors(&self) -> Vec<ErrorBehavior> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.behavior)
            .collect()
    }

    pub fn names(&self, index: usize) -> Vec<Option<String>> {
        self.batches.lock().unwrap()[index].names()
    }

    /// Complete every entry of batch `index` with `result`
    pub fn complete(&self, index: usize, result: ResponseBody) {
        let batch = self.batches.lock().unwrap().remove(index);
        let connection = MockConnection::new(&batch.connection_id, batch.behavior);
        for entry in batch.entries {
            (entry.handler)(&connection, Some(result.clone()), None);
        }
    }
}

impl Transport for RecordingTransport {
    fn start_batch(&self, batch: RetryBatch) -> Arc<dyn Connection> {
        let mut batches = self.batches.lock().unwrap();
        let connection_id = format!("retry-{}", batches.len() + 1);
        let behavior = batch.error_behavior();
        batches.push(StartedBatch {
            connection_id: connection_id.clone(),
            behavior,
            entries: batch.into_entries(),
        });
        MockConnection::new(&connection_id, behavior)
    }
}

/// Keeps notices on screen until the test dismisses them
#[derive(Default)]
pub struct HoldingPresenter {
    shown: Mutex<Vec<(Notice, DismissHandle)>>,
    total: AtomicUsize,
}

impl HoldingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Notices currently on screen
    pub fn on_screen(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    /// Notices ever presented
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn dismiss_oldest(&self) -> Notice {
        let (notice, handle) = self.shown.lock().unwrap().remove(0);
        handle.dismiss();
        notice
    }
}

impl AlertPresenter for HoldingPresenter {
    fn show(&self, notice: Notice, on_dismiss: DismissHandle) {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.shown.lock().unwrap().push((notice, on_dismiss));
    }
}

/// One invocation of a caller's completion handler
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerCall {
    pub name: String,
    pub connection: String,
    pub result: Option<ResponseBody>,
    pub error: Option<String>,
}

/// Records handler invocations across requests, in call order
#[derive(Clone, Default)]
pub struct HandlerLog {
    calls: Arc<Mutex<Vec<HandlerCall>>>,
}

impl HandlerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that records itself under `name`
    pub fn handler(
        &self,
        name: &str,
    ) -> impl FnOnce(&Arc<dyn Connection>, Option<ResponseBody>, Option<SharedError>) + Send + 'static
    {
        let calls = Arc::clone(&self.calls);
        let name = name.to_string();
        move |connection, result, error| {
            calls.lock().unwrap().push(HandlerCall {
                name,
                connection: connection.id().to_string(),
                result,
                error: error.map(|e| e.to_string()),
            });
        }
    }

    pub fn calls(&self) -> Vec<HandlerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.name).collect()
    }
}
