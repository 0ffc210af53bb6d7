//! Message exchange between requester and selected worker.

use super::helpers::{Marketplace, REQUESTER, marketplace, user};
use gigflow::message::{
    domain::SenderRole,
    services::{AttachmentUpload, MessagingError, PostMessageRequest},
};
use gigflow::task::domain::TaskStatus;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conversation_survives_until_approval(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .messaging
        .post_message(PostMessageRequest::new(
            task.id(),
            user(REQUESTER),
            SenderRole::Requester,
            "Door code is 4312.",
        ))
        .await?;
    marketplace
        .messaging
        .post_message(
            PostMessageRequest::new(task.id(), user("worker-2"), SenderRole::Worker, "Done, photo attached.")
                .with_attachment(AttachmentUpload::new("shelf.jpg", "image/jpeg", vec![0xff_u8, 0xd8, 0xff])),
        )
        .await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    let approved = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;
    eyre::ensure!(approved.status() == TaskStatus::Approved);

    let thread = marketplace.messaging.list_messages(task.id()).await?;
    eyre::ensure!(thread.len() == 2);
    eyre::ensure!(thread[0].sender_role() == SenderRole::Requester);
    eyre::ensure!(thread[1].attachments().len() == 1);
    eyre::ensure!(marketplace.blobs.object_count()? == 1);

    let read = marketplace
        .messaging
        .mark_messages_read(task.id(), &user(REQUESTER))
        .await?;
    eyre::ensure!(read == 1);

    let message_notices = marketplace
        .sink
        .delivered()?
        .into_iter()
        .filter(|notice| notice.title == "New message")
        .count();
    eyre::ensure!(message_notices == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_applicant_cannot_join_channel(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post().await?;
    marketplace.apply(&task, "worker-1").await?;
    let chosen = marketplace.apply(&task, "worker-2").await?;
    marketplace
        .lifecycle
        .select_applicant(task.id(), chosen.id(), &user(REQUESTER))
        .await?;

    let result = marketplace
        .messaging
        .post_message(PostMessageRequest::new(
            task.id(),
            user("worker-1"),
            SenderRole::Worker,
            "Still available if needed!",
        ))
        .await;

    eyre::ensure!(matches!(result, Err(MessagingError::Forbidden { .. })));
    eyre::ensure!(marketplace.messages.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_task_keeps_history_readable(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post().await?;
    marketplace
        .lifecycle
        .close(task.id(), &user(REQUESTER))
        .await?;

    let history = marketplace.messaging.list_messages(task.id()).await?;

    eyre::ensure!(history.is_empty());
    Ok(())
}
