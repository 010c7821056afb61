//! Boundaries for user-initiated actions.
//!
//! Every mutating action runs through an [`ActionGate`]: a second invocation
//! while one is outstanding is rejected with [`AppError::Busy`] instead of
//! being queued, and any failure is turned into an [`ActionOutcome::Failed`]
//! carrying the inline message for the user.
//!
//! [`Epoch`] guards against applying a late response to state that has moved
//! on, since in-flight remote calls are never cancelled.

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::AppError;

#[derive(Debug, Clone, Default)]
pub struct ActionGate {
    busy: Arc<AtomicBool>,
}

/// Held while an action runs; releases the gate on drop.
#[derive(Debug)]
pub struct ActionGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl ActionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn try_begin(&self) -> Result<ActionGuard, AppError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::Busy)?;
        Ok(ActionGuard {
            busy: self.busy.clone(),
        })
    }

    /// Run one user action, converting its result into an [`ActionOutcome`].
    pub async fn run<T, F>(&self, label: &str, action: F) -> ActionOutcome<T>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(e) => {
                log::debug!("Rejected '{}': another action is running", label);
                return ActionOutcome::failed(e);
            }
        };

        match action.await {
            Ok(value) => {
                log::info!("Action '{}' completed", label);
                ActionOutcome::Completed { value }
            }
            Err(e) => {
                log::error!("Action '{}' failed: {}", label, e);
                ActionOutcome::failed(e)
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome<T> {
    Completed { value: T },
    Failed { message: String, error: AppError },
}

impl<T> ActionOutcome<T> {
    pub fn failed(error: AppError) -> Self {
        ActionOutcome::Failed {
            message: error.user_message(),
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Completed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ActionOutcome::Completed { value } => Some(value),
            ActionOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            ActionOutcome::Completed { .. } => None,
            ActionOutcome::Failed { error, .. } => Some(error),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ActionOutcome::Completed { .. } => None,
            ActionOutcome::Failed { message, .. } => Some(message),
        }
    }

    pub fn into_result(self) -> Result<T, AppError> {
        match self {
            ActionOutcome::Completed { value } => Ok(value),
            ActionOutcome::Failed { error, .. } => Err(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Monotonic counter identifying the request that local state is waiting on.
#[derive(Debug, Clone, Default)]
pub struct Epoch {
    current: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, invalidating every earlier ticket.
    pub fn advance(&self) -> Ticket {
        Ticket(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.current.load(Ordering::Acquire) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_rejects_reentry() {
        let gate = ActionGate::new();
        let guard = gate.try_begin().unwrap();
        assert!(gate.is_busy());
        assert!(matches!(gate.try_begin(), Err(AppError::Busy)));

        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.try_begin().is_ok());
    }

    #[tokio::test]
    async fn test_run_converts_failure_to_message() {
        let gate = ActionGate::new();
        let outcome: ActionOutcome<()> = gate
            .run("delete", async { Err(AppError::CredentialExpired) })
            .await;

        assert!(!outcome.is_success());
        assert_eq!(
            outcome.message(),
            Some("Video account access expired. Please reconnect.")
        );
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn test_run_while_busy_is_rejected() {
        let gate = ActionGate::new();
        let _held = gate.try_begin().unwrap();

        let outcome = gate.run("sync", async { Ok(1) }).await;
        assert!(matches!(outcome.error(), Some(AppError::Busy)));
    }

    #[test]
    fn test_epoch_invalidates_older_tickets() {
        let epoch = Epoch::new();
        let first = epoch.advance();
        assert!(epoch.is_current(first));

        let second = epoch.advance();
        assert!(!epoch.is_current(first));
        assert!(epoch.is_current(second));
    }
}
