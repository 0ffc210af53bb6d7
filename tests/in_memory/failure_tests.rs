//! Behaviour when collaborators fail.

use super::helpers::{Marketplace, REQUESTER, marketplace, user};
use gigflow::escrow::adapters::memory::EscrowOperation;
use gigflow::task::{
    domain::{EscrowStatus, TaskStatus},
    ports::CommissionRepository,
    services::TaskLifecycleError,
};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn notification_outage_does_not_block_lifecycle(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    marketplace.sink.set_failing(true)?;

    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    let approved = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;

    eyre::ensure!(approved.status() == TaskStatus::Approved);
    eyre::ensure!(marketplace.sink.delivered()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn custodian_outage_on_release_is_retryable(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    marketplace.custodian.fail_next(EscrowOperation::Release)?;

    let failed = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await;
    let Err(err) = failed else {
        eyre::bail!("approval should fail while the custodian is down");
    };
    eyre::ensure!(err.is_retryable());
    eyre::ensure!(marketplace.lifecycle.get_task(task.id()).await?.status() == TaskStatus::Completed);
    eyre::ensure!(marketplace.custodian.is_holding(task.id())?);

    let approved = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;
    eyre::ensure!(matches!(approved.escrow(), EscrowStatus::Released { .. }));
    eyre::ensure!(marketplace.store.find_commission(task.id()).await?.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn slow_custodian_times_out_without_funding(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post().await?;
    let application = marketplace.apply(&task, "worker-2").await?;
    marketplace
        .lifecycle
        .select_applicant(task.id(), application.id(), &user(REQUESTER))
        .await?;
    marketplace
        .custodian
        .set_latency(Some(Duration::from_secs(2)))?;

    let result = marketplace
        .lifecycle
        .deposit_escrow(task.id(), &user(REQUESTER), None)
        .await;

    eyre::ensure!(
        matches!(&result, Err(TaskLifecycleError::ExternalService(err)) if err.is_timeout()),
        "expected timeout, got {result:?}"
    );
    let current = marketplace.lifecycle.get_task(task.id()).await?;
    eyre::ensure!(current.status() == TaskStatus::Accepted);
    eyre::ensure!(!current.escrow_deposited());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn lost_commission_write_is_reconciled(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;
    marketplace.store.set_commission_writes_failing(true)?;
    marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;
    eyre::ensure!(marketplace.store.commission_count()? == 0);

    marketplace.store.set_commission_writes_failing(false)?;
    let healed = marketplace
        .lifecycle
        .approve_task(task.id(), &user(REQUESTER))
        .await?;

    eyre::ensure!(healed.status() == TaskStatus::Approved);
    eyre::ensure!(marketplace.store.commission_count()? == 1);
    eyre::ensure!(
        marketplace
            .custodian
            .call_count(EscrowOperation::Release, task.id())?
            == 1,
        "retrying approval must not release funds again"
    );
    let report = marketplace.lifecycle.reconcile_commissions().await?;
    eyre::ensure!(report.recorded == 0 && report.failed == 0);
    Ok(())
}
