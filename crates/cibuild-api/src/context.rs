//! Execution mode and cooperative cancellation

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Whether a run talks to the cluster or only simulates it
///
/// Simulated runs perform no external lookups and substitute fixed
/// placeholder values, so the whole recipe-generation path can be validated
/// offline and deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Perform lookups and submit builds
    #[default]
    Real,
    /// Dry run: placeholders instead of lookups, builds are only recorded
    Simulated,
}

impl ExecutionMode {
    /// True for `Simulated`
    #[inline]
    #[must_use]
    pub fn is_dry(self) -> bool {
        matches!(self, Self::Simulated)
    }
}

impl From<bool> for ExecutionMode {
    fn from(dry: bool) -> Self {
        if dry {
            Self::Simulated
        } else {
            Self::Real
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => f.write_str("real"),
            Self::Simulated => f.write_str("simulated"),
        }
    }
}

/// Cancellable context handed to a step run
///
/// Clones share the same cancellation state. Cancellation is cooperative:
/// long-running collaborators poll `is_cancelled` or await `cancelled`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cancel: Arc<watch::Sender<bool>>,
}

impl ExecutionContext {
    /// Create a live context
    #[must_use]
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
        }
    }

    /// Cancel this context and every clone of it
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Whether the context has been cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn mode_from_dry_flag() {
        assert_eq!(ExecutionMode::from(true), ExecutionMode::Simulated);
        assert_eq!(ExecutionMode::from(false), ExecutionMode::Real);
        assert!(ExecutionMode::Simulated.is_dry());
        assert!(!ExecutionMode::default().is_dry());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let ctx = ExecutionContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_waiters() {
        let ctx = ExecutionContext::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        ctx.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .expect("task should not panic");
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_cancelled() {
        let ctx = ExecutionContext::new();
        ctx.cancel();
        ctx.cancelled().await;
    }
}
