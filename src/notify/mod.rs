//! Change-notification sink.
//!
//! The pipeline publishes one notice per successful mutation. Delivery is
//! best-effort: a sink failure is logged by the publishing behavior, never
//! propagated to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::Operation;

/// Published after a successful mutating command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Entity label (see [`Entity::entity_name`](crate::request::Entity::entity_name)).
    pub entity: String,
    /// What happened.
    pub operation: Operation,
    /// Acting principal's subject, when authenticated.
    pub principal: Option<String>,
    /// Completion timestamp.
    pub occurred_at: DateTime<Utc>,
}

/// Errors raised by notification sinks.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The sink could not accept the notice.
    #[error("notification sink unavailable: {reason}")]
    Unavailable {
        /// Error message.
        reason: String,
    },
}

/// Event bus seam receiving change notices.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Accepts one notice.
    async fn publish(&self, notice: ChangeNotice) -> Result<(), NotifyError>;
}

/// Recording sink for tests.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockSink {
    notices: parking_lot::Mutex<Vec<ChangeNotice>>,
    unavailable: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far.
    pub fn recorded(&self) -> Vec<ChangeNotice> {
        self.notices.lock().clone()
    }

    /// Simulates an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable
            .store(!available, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl NotificationSink for MockSink {
    async fn publish(&self, notice: ChangeNotice) -> Result<(), NotifyError> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotifyError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }
        self.notices.lock().push(notice);
        Ok(())
    }
}
