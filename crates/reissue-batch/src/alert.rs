//! Alert gate: one blocking, dismissible notice at a time
//!
//! Orchestrators built from the same manager share one [`AlertGate`].
//! Notices are presented strictly one after another, in request order, on
//! the main execution context; a caller's `show` resolves only after the
//! user dismissed its notice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reissue_core::types::AlertConfig;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

use crate::context::ExecutionContext;
use crate::error::OrchestratorError;

/// A notice to show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Message body
    pub message: String,
    /// Label of the single dismiss button
    pub button_label: String,
}

/// Resumes the waiting orchestrator once the user dismisses the notice
#[derive(Debug)]
pub struct DismissHandle {
    resume: oneshot::Sender<()>,
}

impl DismissHandle {
    /// Report that the user dismissed the notice
    pub fn dismiss(self) {
        let _ = self.resume.send(());
    }
}

/// Presents notices to the user
pub trait AlertPresenter: Send + Sync {
    /// Show `notice` and call [`DismissHandle::dismiss`] once it is dismissed.
    ///
    /// Called on the main execution context. Must not block until dismissal.
    fn show(&self, notice: Notice, on_dismiss: DismissHandle);
}

/// Looks up user-facing strings
pub trait Localizer: Send + Sync {
    /// Translation for `key`, or `default` when there is none
    fn localized_string(&self, key: &str, default: &str) -> String;
}

/// Localizer with no translations
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLocalizer;

impl Localizer for DefaultLocalizer {
    fn localized_string(&self, _key: &str, default: &str) -> String {
        default.to_string()
    }
}

/// Map-backed localizer
#[derive(Debug, Clone, Default)]
pub struct StaticLocalizer {
    strings: HashMap<String, String>,
}

impl StaticLocalizer {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translation
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.strings.insert(key.into(), value.into());
        self
    }
}

impl Localizer for StaticLocalizer {
    fn localized_string(&self, key: &str, default: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Presenter for processes without a UI: logs the notice and dismisses it
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessPresenter;

impl AlertPresenter for HeadlessPresenter {
    fn show(&self, notice: Notice, on_dismiss: DismissHandle) {
        info!(message = %notice.message, "notice (headless, auto-dismissed)");
        on_dismiss.dismiss();
    }
}

/// Serializes notice presentation across orchestrators
pub struct AlertGate {
    presenter: Arc<dyn AlertPresenter>,
    localizer: Arc<dyn Localizer>,
    context: ExecutionContext,
    config: AlertConfig,
    slot: Mutex<()>,
    queued: AtomicUsize,
}

impl AlertGate {
    /// Create a gate presenting on `context`
    pub fn new(
        presenter: Arc<dyn AlertPresenter>,
        localizer: Arc<dyn Localizer>,
        context: ExecutionContext,
        config: AlertConfig,
    ) -> Self {
        Self {
            presenter,
            localizer,
            context,
            config,
            slot: Mutex::new(()),
            queued: AtomicUsize::new(0),
        }
    }

    /// Notices waiting behind the one currently shown
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Label for the dismiss button
    pub fn button_label(&self) -> String {
        self.localizer.localized_string(
            &self.config.button_label_key,
            &self.config.button_label_default,
        )
    }

    /// Show `message` and wait until the user dismisses it.
    ///
    /// A presenter that drops its [`DismissHandle`] counts as a dismissal.
    pub async fn show(&self, message: impl Into<String>) -> Result<(), OrchestratorError> {
        self.show_with(message, || {}).await
    }

    /// Like [`AlertGate::show`], calling `on_presented` once the notice has
    /// left the queue and is about to be handed to the presenter.
    pub async fn show_with<F>(
        &self,
        message: impl Into<String>,
        on_presented: F,
    ) -> Result<(), OrchestratorError>
    where
        F: FnOnce(),
    {
        self.queued.fetch_add(1, Ordering::SeqCst);
        let _slot = self.slot.lock().await;
        self.queued.fetch_sub(1, Ordering::SeqCst);
        on_presented();

        let notice = Notice {
            message: message.into(),
            button_label: self.button_label(),
        };
        let (resume, dismissed) = oneshot::channel();
        let presenter = Arc::clone(&self.presenter);

        self.context
            .run(async move { presenter.show(notice, DismissHandle { resume }) })
            .await?;

        if dismissed.await.is_err() {
            warn!(context = %self.context.name(), "presenter released notice without dismissal");
        }
        Ok(())
    }
}
