//! End-to-end marketplace flows from posting to payout.

use super::helpers::{ADMIN, Marketplace, REQUESTER, marketplace, user};
use gigflow::escrow::adapters::memory::EscrowOperation;
use gigflow::notification::domain::RecipientRole;
use gigflow::task::{
    domain::{ApplicationStatus, EscrowStatus, TaskDomainError, TaskStatus},
    ports::CommissionRepository,
    services::{ApplyRequest, TaskLifecycleError},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn selection_settles_every_application(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post().await?;
    eyre::ensure!(task.status() == TaskStatus::Open);
    let first = marketplace.apply(&task, "worker-1").await?;
    let second = marketplace.apply(&task, "worker-2").await?;
    eyre::ensure!(first.status() == ApplicationStatus::Pending);
    eyre::ensure!(second.status() == ApplicationStatus::Pending);

    let selection = marketplace
        .lifecycle
        .select_applicant(task.id(), second.id(), &user(REQUESTER))
        .await?;

    eyre::ensure!(selection.task.status() == TaskStatus::Accepted);
    eyre::ensure!(selection.task.is_selected_worker(&user("worker-2")));
    eyre::ensure!(selection.rejected == vec![first.id()]);
    for application in marketplace.lifecycle.list_applications(task.id()).await? {
        let expected = if application.id() == second.id() {
            ApplicationStatus::Approved
        } else {
            ApplicationStatus::Rejected
        };
        eyre::ensure!(
            application.status() == expected,
            "application {} is {}",
            application.id(),
            application.status()
        );
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn funded_task_refuses_new_applications(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;

    eyre::ensure!(task.escrow_deposited());
    let EscrowStatus::Deposited { reference, .. } = task.escrow() else {
        eyre::bail!("escrow should be deposited, found {}", task.escrow().label());
    };
    eyre::ensure!(!reference.transaction_id().is_empty());
    eyre::ensure!(marketplace.custodian.is_holding(task.id())?);

    let late = marketplace
        .lifecycle
        .apply(ApplyRequest::new(task.id(), "worker-3"))
        .await;

    eyre::ensure!(
        matches!(
            late,
            Err(TaskLifecycleError::InvalidState(
                TaskDomainError::OperationNotAllowed { .. }
            ))
        ),
        "unexpected late application outcome {late:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_pays_out_net_of_commission(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    let completed = marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    eyre::ensure!(completed.status() == TaskStatus::Completed);

    let approved = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;

    eyre::ensure!(approved.status() == TaskStatus::Approved);
    let Some(record) = marketplace.store.find_commission(task.id()).await? else {
        eyre::bail!("commission record missing after approval");
    };
    eyre::ensure!(record.gross().minor_units() == 100);
    eyre::ensure!(record.commission().minor_units() == 5);
    eyre::ensure!(record.net().minor_units() == 95);
    eyre::ensure!(!marketplace.custodian.is_holding(task.id())?);

    let paid = marketplace.sink.delivered_to(&user("worker-2"))?;
    eyre::ensure!(paid.iter().any(|notice| notice.title == "Payment released"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_retry_is_a_no_op(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    let approved = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;
    let notices_before = marketplace.sink.delivered()?.len();

    let retried = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;

    eyre::ensure!(retried == approved);
    eyre::ensure!(marketplace.store.commission_count()? == 1);
    eyre::ensure!(
        marketplace
            .custodian
            .call_count(EscrowOperation::Release, task.id())?
            == 1
    );
    eyre::ensure!(marketplace.sink.delivered()?.len() == notices_before);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn work_started_before_completion(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;

    let started = marketplace
        .lifecycle
        .start_work(task.id(), &user("worker-2"))
        .await?;
    let completed = marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;

    eyre::ensure!(started.status() == TaskStatus::InProgress);
    eyre::ensure!(completed.status() == TaskStatus::Completed);
    let requester_notices = marketplace.sink.delivered_to(&user(REQUESTER))?;
    let titles: Vec<&str> = requester_notices
        .iter()
        .map(|notice| notice.title.as_str())
        .collect();
    eyre::ensure!(titles.contains(&"Work started"));
    eyre::ensure!(titles.contains(&"Work submitted"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn administrator_sees_postings_and_resolves_disputes(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    marketplace
        .lifecycle
        .dispute(task.id(), &user(REQUESTER))
        .await?;

    let closed = marketplace.lifecycle.close(task.id(), &user(ADMIN)).await?;

    eyre::ensure!(closed.status() == TaskStatus::Closed);
    eyre::ensure!(matches!(closed.escrow(), EscrowStatus::Refunded { .. }));
    eyre::ensure!(marketplace.store.commission_count()? == 0);
    let admin_notices = marketplace.sink.delivered_to(&user(ADMIN))?;
    eyre::ensure!(
        admin_notices
            .iter()
            .any(|notice| notice.recipient_role == RecipientRole::Administrator
                && notice.related_task_id == Some(task.id()))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_by_worker_is_forbidden(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;

    let result = marketplace
        .lifecycle
        .approve_task(task.id(), &user("worker-2"))
        .await;

    eyre::ensure!(matches!(result, Err(TaskLifecycleError::Forbidden { .. })));
    eyre::ensure!(
        marketplace
            .custodian
            .call_count(EscrowOperation::Release, task.id())?
            == 0
    );
    Ok(())
}
