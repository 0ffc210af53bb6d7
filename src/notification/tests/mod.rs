//! Tests for post-commit notification dispatch.

use crate::notification::{
    adapters::memory::InMemoryNotificationSink,
    domain::{Notification, RecipientRole},
    outbox::{DispatchReport, Outbox},
    ports::{NotificationResult, NotificationSink},
};
use crate::task::domain::{TaskId, UserId};
use async_trait::async_trait;
use rstest::{fixture, rstest};
use std::time::Duration;

fn notice(recipient: &str, role: RecipientRole) -> Notification {
    Notification::about_task(
        TaskId::new(),
        UserId::new(recipient).expect("valid user id"),
        role,
        "Funds secured",
        "Escrow holds the budget.",
    )
}

#[fixture]
fn outbox() -> Outbox {
    let mut outbox = Outbox::new();
    outbox.push(notice("requester-1", RecipientRole::Requester));
    outbox.push(notice("worker-2", RecipientRole::Worker));
    outbox
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dispatch_delivers_every_queued_notice(outbox: Outbox) {
    let sink = InMemoryNotificationSink::new();
    assert_eq!(outbox.len(), 2);

    let report = outbox.dispatch(&sink, Duration::from_secs(1)).await;

    assert_eq!(
        report,
        DispatchReport {
            delivered: 2,
            failed: 0
        }
    );
    let worker = UserId::new("worker-2").expect("valid user id");
    let delivered = sink.delivered_to(&worker).expect("sink readable");
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].recipient_role, RecipientRole::Worker);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_sink_is_counted_not_raised(outbox: Outbox) {
    let sink = InMemoryNotificationSink::new();
    sink.set_failing(true).expect("sink writable");

    let report = outbox.dispatch(&sink, Duration::from_secs(1)).await;

    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 2);
    assert!(sink.delivered().expect("sink readable").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_outbox_dispatches_nothing() {
    let outbox = Outbox::new();
    assert!(outbox.is_empty());

    let report = outbox
        .dispatch(&InMemoryNotificationSink::new(), Duration::from_secs(1))
        .await;

    assert_eq!(report, DispatchReport::default());
}

struct StalledSink;

#[async_trait]
impl NotificationSink for StalledSink {
    async fn notify(&self, _notification: &Notification) -> NotificationResult<()> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_sink_times_out_per_notice() {
    let mut outbox = Outbox::new();
    outbox.push(notice("ops-desk", RecipientRole::Administrator));

    let report = outbox.dispatch(&StalledSink, Duration::from_millis(100)).await;

    assert_eq!(report.failed, 1);
}

#[rstest]
#[case(RecipientRole::Requester, "requester")]
#[case(RecipientRole::Worker, "worker")]
#[case(RecipientRole::Administrator, "administrator")]
fn recipient_roles_have_stable_names(#[case] role: RecipientRole, #[case] expected: &str) {
    assert_eq!(role.as_str(), expected);
    assert_eq!(role.to_string(), expected);
}
