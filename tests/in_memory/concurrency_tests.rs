//! Competing writers against the same task.

use std::{sync::Arc, time::Duration};

use super::helpers::{ADMIN, Marketplace, REQUESTER, marketplace, user};
use gigflow::escrow::adapters::memory::EscrowOperation;
use gigflow::task::{
    domain::{ApplicationStatus, EscrowStatus, TaskDomainError, TaskStatus},
    services::{ApplyRequest, TaskLifecycleError},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_selections_yield_one_winner(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post().await?;
    let first = marketplace.apply(&task, "worker-1").await?;
    let second = marketplace.apply(&task, "worker-2").await?;

    let handles: Vec<_> = [first.id(), second.id()]
        .into_iter()
        .map(|application_id| {
            let lifecycle = Arc::clone(&marketplace.lifecycle);
            let task_id = task.id();
            tokio::spawn(async move {
                lifecycle
                    .select_applicant(task_id, application_id, &user(REQUESTER))
                    .await
            })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await?);
    }

    let winners: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    eyre::ensure!(winners.len() == 1, "expected exactly one winner: {outcomes:?}");
    eyre::ensure!(
        outcomes
            .iter()
            .filter(|o| matches!(o, Err(TaskLifecycleError::Conflict(_))))
            .count()
            == 1,
        "loser must observe a conflict: {outcomes:?}"
    );

    let winner = winners[0];
    let stored = marketplace.lifecycle.get_task(task.id()).await?;
    eyre::ensure!(stored.status() == TaskStatus::Accepted);
    eyre::ensure!(
        stored
            .selected_worker()
            .is_some_and(|selected| selected.application_id == winner.application.id())
    );
    let approved = marketplace
        .lifecycle
        .list_applications(task.id())
        .await?
        .into_iter()
        .filter(|application| application.status() == ApplicationStatus::Approved)
        .count();
    eyre::ensure!(approved == 1, "exactly one application may be approved");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_concurrent_applications_keep_one_pending(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let task = marketplace.post().await?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lifecycle = Arc::clone(&marketplace.lifecycle);
            let task_id = task.id();
            tokio::spawn(async move { lifecycle.apply(ApplyRequest::new(task_id, "worker-1")).await })
        })
        .collect();
    let mut accepted = 0_usize;
    for handle in handles {
        match handle.await? {
            Ok(_) => accepted += 1,
            Err(TaskLifecycleError::InvalidState(TaskDomainError::AlreadyApplied { .. })) => {}
            Err(other) => eyre::bail!("unexpected application failure: {other}"),
        }
    }

    eyre::ensure!(accepted == 1);
    eyre::ensure!(marketplace.lifecycle.list_applications(task.id()).await?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_settle_once(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.funded_task("worker-2").await?;
    marketplace
        .lifecycle
        .mark_complete(task.id(), &user("worker-2"))
        .await?;

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let lifecycle = Arc::clone(&marketplace.lifecycle);
            let task_id = task.id();
            tokio::spawn(async move { lifecycle.approve_task(task_id, &user(REQUESTER)).await })
        })
        .collect();
    for handle in handles {
        let approved = handle.await??;
        eyre::ensure!(approved.status() == TaskStatus::Approved);
    }

    eyre::ensure!(marketplace.store.commission_count()? == 1);
    eyre::ensure!(!marketplace.custodian.is_holding(task.id())?);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_during_deposit_refunds_locked_funds(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post().await?;
    let application = marketplace.apply(&task, "worker-2").await?;
    marketplace
        .lifecycle
        .select_applicant(task.id(), application.id(), &user(REQUESTER))
        .await?;
    marketplace
        .custodian
        .set_latency(Some(Duration::from_millis(100)))?;

    let deposit = {
        let lifecycle = Arc::clone(&marketplace.lifecycle);
        let task_id = task.id();
        tokio::spawn(async move {
            lifecycle
                .deposit_escrow(task_id, &user(REQUESTER), None)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let closed = marketplace.lifecycle.close(task.id(), &user(ADMIN)).await?;
    eyre::ensure!(closed.status() == TaskStatus::Closed);
    eyre::ensure!(matches!(closed.escrow(), EscrowStatus::NotDeposited));

    let outcome = deposit.await?;
    eyre::ensure!(
        matches!(outcome, Err(TaskLifecycleError::Conflict(_))),
        "deposit must lose to the close: {outcome:?}"
    );
    eyre::ensure!(
        !marketplace.custodian.is_holding(task.id())?,
        "funds locked for a closed task must be refunded"
    );
    eyre::ensure!(
        marketplace
            .custodian
            .call_count(EscrowOperation::Refund, task.id())?
            == 1
    );
    Ok(())
}
