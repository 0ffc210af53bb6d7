//! Notification sink port.

use super::domain::Notification;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification delivery.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Fire-and-forget delivery contract.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Hands a notification to the delivery channel.
    async fn notify(&self, notification: &Notification) -> NotificationResult<()>;
}

/// Errors reported by notification adapters.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The sink refused or failed to accept the record.
    #[error("notification delivery failed: {0}")]
    Delivery(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationError {
    /// Wraps a delivery failure.
    pub fn delivery(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Arc::new(err))
    }
}
