//! Tests for the in-memory custodian and bounded external calls.

use crate::escrow::{
    adapters::memory::{EscrowOperation, InMemoryEscrowCustodian},
    domain::{EscrowReference, EscrowRequest},
    ports::{EscrowCustodian, EscrowError},
};
use crate::external::{ExternalService, call_with_timeout};
use crate::task::domain::{CurrencyCode, Money, PayoutAddress, TaskId};
use chrono::{Duration as ChronoDuration, Utc};
use eyre::{bail, ensure};
use rstest::{fixture, rstest};
use std::time::Duration;

#[fixture]
fn custodian() -> InMemoryEscrowCustodian {
    InMemoryEscrowCustodian::new()
}

fn request(task_id: TaskId) -> eyre::Result<EscrowRequest> {
    Ok(EscrowRequest {
        task_id,
        amount: Money::new(2_500, CurrencyCode::new("USDT")?),
        deadline: Utc::now() + ChronoDuration::days(1),
        beneficiary: PayoutAddress::new("T-worker")?,
    })
}

#[rstest]
fn reference_display_includes_contract_address() {
    let plain = EscrowReference::new("tx-1");
    let located = EscrowReference::new("tx-1").with_contract_address("0xabc");

    assert_eq!(plain.to_string(), "tx-1");
    assert_eq!(located.to_string(), "tx-1@0xabc");
    assert_eq!(located.contract_address(), Some("0xabc"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_create_returns_original_receipt(
    custodian: InMemoryEscrowCustodian,
) -> eyre::Result<()> {
    let task_id = TaskId::new();
    let first = custodian.create_escrow(&request(task_id)?).await?;
    let second = custodian.create_escrow(&request(task_id)?).await?;

    ensure!(first == second);
    ensure!(custodian.is_holding(task_id)?);
    ensure!(custodian.call_count(EscrowOperation::Create, task_id)? == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn release_is_idempotent(custodian: InMemoryEscrowCustodian) -> eyre::Result<()> {
    let task_id = TaskId::new();
    custodian.create_escrow(&request(task_id)?).await?;
    custodian.mark_complete(task_id).await?;

    let first = custodian.release_escrow(task_id).await?;
    let second = custodian.release_escrow(task_id).await?;

    ensure!(first == second);
    ensure!(!custodian.is_holding(task_id)?);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn refund_after_release_is_rejected(custodian: InMemoryEscrowCustodian) -> eyre::Result<()> {
    let task_id = TaskId::new();
    custodian.create_escrow(&request(task_id)?).await?;
    custodian.release_escrow(task_id).await?;

    let result = custodian.refund_escrow(task_id).await;

    ensure!(
        matches!(result, Err(EscrowError::Rejected { task_id: id, .. }) if id == task_id),
        "unexpected refund outcome {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn operations_on_unknown_task_report_not_found(custodian: InMemoryEscrowCustodian) {
    let task_id = TaskId::new();
    let result = custodian.release_escrow(task_id).await;
    assert!(matches!(result, Err(EscrowError::NotFound(id)) if id == task_id));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn injected_failure_applies_to_one_call(custodian: InMemoryEscrowCustodian) -> eyre::Result<()> {
    let task_id = TaskId::new();
    custodian.fail_next(EscrowOperation::Create)?;

    let failed = custodian.create_escrow(&request(task_id)?).await;
    ensure!(matches!(failed, Err(EscrowError::Unavailable(_))));
    ensure!(!custodian.is_holding(task_id)?);

    custodian.create_escrow(&request(task_id)?).await?;
    ensure!(custodian.is_holding(task_id)?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn bounded_call_reports_timeout() -> eyre::Result<()> {
    let custodian = InMemoryEscrowCustodian::new();
    custodian.set_latency(Some(Duration::from_secs(10)))?;
    let task_id = TaskId::new();
    let pending = request(task_id)?;

    let result = call_with_timeout(
        ExternalService::EscrowCustodian,
        Duration::from_millis(200),
        custodian.create_escrow(&pending),
    )
    .await;

    let Err(err) = result else {
        bail!("call should time out");
    };
    ensure!(err.is_timeout());
    ensure!(err.service() == ExternalService::EscrowCustodian);
    ensure!(err.to_string() == "escrow custodian call timed out after 200 ms");
    ensure!(!custodian.is_holding(task_id)?, "abandoned call must not lock funds");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bounded_call_wraps_remote_failure(custodian: InMemoryEscrowCustodian) -> eyre::Result<()> {
    let result = call_with_timeout(
        ExternalService::EscrowCustodian,
        Duration::from_secs(1),
        custodian.refund_escrow(TaskId::new()),
    )
    .await;

    let Err(err) = result else {
        bail!("refund of an unknown escrow should fail");
    };
    ensure!(!err.is_timeout());
    ensure!(err.to_string().starts_with("escrow custodian call failed"));
    Ok(())
}
