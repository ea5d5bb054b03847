//! Builders for test fixtures

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reissue_batch::{
    AlertPresenter, ErrorBehavior, RequestOutcome, RetryManager, RetryOrchestrator,
    SharedError, StatsObserver,
};
use serde_json::json;

use super::mocks::{HandlerLog, MockRequest, RecordingTransport};

/// Behavior of the batch that failed
pub const ORIGINAL_BEHAVIOR: ErrorBehavior = ErrorBehavior::all();

/// Shared fixture: manager plus the mocks it talks to
pub struct Harness {
    pub manager: RetryManager,
    pub transport: Arc<RecordingTransport>,
    pub stats: Arc<StatsObserver>,
    pub log: HandlerLog,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_presenter(presenter: Arc<dyn AlertPresenter>) -> Self {
        Self::build(Some(presenter))
    }

    fn build(presenter: Option<Arc<dyn AlertPresenter>>) -> Self {
        let transport = RecordingTransport::new();
        let stats = Arc::new(StatsObserver::new());
        let mut builder = RetryManager::builder()
            .with_transport(transport.clone())
            .with_observer(Arc::clone(&stats));
        if let Some(presenter) = presenter {
            builder = builder.with_presenter(presenter);
        }

        Self {
            manager: builder.build().unwrap(),
            transport,
            stats,
            log: HandlerLog::new(),
        }
    }

    /// Orchestrator for a batch that failed on connection "original"
    pub fn orchestrator(&self) -> Arc<RetryOrchestrator> {
        self.manager.create(super::mocks::MockConnection::new(
            "original",
            ORIGINAL_BEHAVIOR,
        ))
    }

    /// Outcome for a request named `name` that failed with `message`
    pub fn failed(&self, name: &str, message: &str) -> RequestOutcome {
        let error: SharedError = Arc::new(std::io::Error::other(message.to_string()));
        RequestOutcome::new(MockRequest::new(name), self.log.handler(name))
            .with_result(json!({ "request": name }))
            .with_error(error)
            .with_batch_entry_name(name)
    }
}

/// Wait for the decision to finish, failing the test if it never does
pub async fn settle(orchestrator: &RetryOrchestrator) {
    tokio::time::timeout(Duration::from_secs(5), orchestrator.wait_settled())
        .await
        .expect("orchestrator did not settle");
}

/// Yield until `condition` holds, failing the test after a while
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
