//! Connection error-behavior flags

use bitflags::bitflags;

bitflags! {
    /// Error-handling capabilities enabled on a batch connection.
    ///
    /// The transport consults these when a batch fails to decide whether to
    /// build a retry orchestrator at all, and whether to ask it to show an
    /// alert or repair the session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ErrorBehavior: u8 {
        /// Failed requests may be retried once
        const RETRY = 1 << 0;
        /// A user-facing alert may be shown for the failure
        const ALERT_USER = 1 << 1;
        /// A broken session may be repaired and the batch retried
        const RECONNECT_SESSION = 1 << 2;
    }
}

impl ErrorBehavior {
    /// Behavior for the batch started after a successful session repair.
    ///
    /// Reconnect and alert were already handled by the repair attempt.
    pub fn for_repaired_retry(self) -> Self {
        self - ErrorBehavior::RECONNECT_SESSION - ErrorBehavior::ALERT_USER
    }

    /// Behavior for a plain re-submission; a retried batch is not retried again.
    pub fn for_plain_retry(self) -> Self {
        self - ErrorBehavior::RETRY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repaired_retry_clears_reconnect_and_alert() {
        let behavior = ErrorBehavior::all().for_repaired_retry();
        assert_eq!(behavior, ErrorBehavior::RETRY);
    }

    #[test]
    fn test_repaired_retry_is_noop_on_empty() {
        assert_eq!(
            ErrorBehavior::empty().for_repaired_retry(),
            ErrorBehavior::empty()
        );
    }

    #[test]
    fn test_plain_retry_clears_retry_only() {
        let behavior = (ErrorBehavior::RETRY | ErrorBehavior::ALERT_USER).for_plain_retry();
        assert_eq!(behavior, ErrorBehavior::ALERT_USER);
    }
}
