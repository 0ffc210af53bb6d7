//! Post-commit notification dispatch.

use super::{domain::Notification, ports::NotificationSink};
use crate::external::{ExternalService, call_with_timeout};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

/// Notifications queued during an operation, sent once its write commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    pending: Vec<Notification>,
}

/// Delivery outcome of one outbox dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Notifications the sink accepted.
    pub delivered: usize,
    /// Notifications dropped after a failure or timeout.
    pub failed: usize,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Queues a notification.
    pub fn push(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    /// Returns the number of queued notifications.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Sends every queued notification, each bounded by `timeout`.
    ///
    /// Failures never propagate: they are logged and counted in the report.
    pub async fn dispatch<N>(self, sink: &N, timeout: Duration) -> DispatchReport
    where
        N: NotificationSink + ?Sized,
    {
        let deliveries = self.pending.iter().map(|notification| async move {
            let outcome = call_with_timeout(
                ExternalService::NotificationSink,
                timeout,
                sink.notify(notification),
            )
            .await;
            if let Err(err) = &outcome {
                warn!(
                    recipient = %notification.recipient_id,
                    role = %notification.recipient_role,
                    task_id = ?notification.related_task_id,
                    error = %err,
                    "dropping notification after delivery failure"
                );
            }
            outcome.is_ok()
        });

        let outcomes = join_all(deliveries).await;
        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let report = DispatchReport {
            delivered,
            failed: outcomes.len().saturating_sub(delivered),
        };
        debug!(
            delivered = report.delivered,
            failed = report.failed,
            "outbox dispatched"
        );
        report
    }
}
