//! In-memory notification sink that records deliveries.

use crate::notification::{
    domain::Notification,
    ports::{NotificationError, NotificationResult, NotificationSink},
};
use crate::task::domain::UserId;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct RecordingState {
    delivered: Vec<Notification>,
    failing: bool,
}

/// Notification sink that keeps every accepted record in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    state: Arc<RwLock<RecordingState>>,
}

impl InMemoryNotificationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail while `failing` is set.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Delivery`] when lock acquisition fails.
    pub fn set_failing(&self, failing: bool) -> NotificationResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| NotificationError::delivery(std::io::Error::other(err.to_string())))?;
        state.failing = failing;
        Ok(())
    }

    /// Returns every notification accepted so far, in delivery order.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Delivery`] when lock acquisition fails.
    pub fn delivered(&self) -> NotificationResult<Vec<Notification>> {
        let state = self
            .state
            .read()
            .map_err(|err| NotificationError::delivery(std::io::Error::other(err.to_string())))?;
        Ok(state.delivered.clone())
    }

    /// Returns the notifications accepted for one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::Delivery`] when lock acquisition fails.
    pub fn delivered_to(&self, recipient: &UserId) -> NotificationResult<Vec<Notification>> {
        Ok(self
            .delivered()?
            .into_iter()
            .filter(|notification| &notification.recipient_id == recipient)
            .collect())
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn notify(&self, notification: &Notification) -> NotificationResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| NotificationError::delivery(std::io::Error::other(err.to_string())))?;
        if state.failing {
            return Err(NotificationError::delivery(std::io::Error::other(
                "notification sink unavailable",
            )));
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}
