//! Builders shared by the task unit tests.

use crate::escrow::domain::{EscrowReference, PayoutTxId};
use crate::task::domain::{
    ApplicationId, CommissionPercent, CurrencyCode, Money, NewTask, PayoutAddress, SelectedWorker,
    Task, TaskListing, TaskStatus, UserId,
};
use chrono::{Duration, Utc};
use mockable::DefaultClock;

pub(super) fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}

pub(super) fn usdt(minor_units: u64) -> Money {
    Money::new(minor_units, CurrencyCode::new("USDT").expect("valid currency"))
}

pub(super) fn new_task(budget: u64) -> NewTask {
    NewTask {
        listing: TaskListing::new("Translate landing page", "English to Spanish, 400 words")
            .expect("valid listing"),
        requester_id: user("requester-1"),
        requester_name: "Rita Requester".to_owned(),
        budget: usdt(budget),
        deadline: Utc::now() + Duration::days(7),
        commission: CommissionPercent::STANDARD,
    }
}

pub(super) fn open_task(budget: u64) -> Task {
    Task::post(new_task(budget), &DefaultClock).expect("valid task")
}

pub(super) fn worker(id: &str) -> SelectedWorker {
    SelectedWorker {
        application_id: ApplicationId::new(),
        worker_id: user(id),
        worker_name: format!("Worker {id}"),
    }
}

pub(super) fn payout_address() -> PayoutAddress {
    PayoutAddress::new("TXYZ-worker-wallet").expect("valid address")
}

pub(super) fn deposit_reference() -> EscrowReference {
    EscrowReference::new("deposit-tx-1").with_contract_address("escrow:USDT")
}

/// Drives a fresh task through the domain operations until it reaches
/// `status`, funding escrow on the way for every post-selection status.
pub(super) fn task_in(status: TaskStatus) -> Task {
    let clock = DefaultClock;
    let mut task = open_task(100);
    if status == TaskStatus::Open {
        return task;
    }
    if status == TaskStatus::Closed {
        task.close(&clock).expect("open task closes");
        return task;
    }
    task.assign_worker(worker("worker-2"), Some(payout_address()), &clock)
        .expect("open task accepts a worker");
    task.record_escrow_deposit(deposit_reference(), payout_address(), &clock)
        .expect("accepted task records deposit");
    if status == TaskStatus::Accepted {
        return task;
    }
    task.start_work(&clock).expect("funded task starts");
    if status == TaskStatus::InProgress {
        return task;
    }
    task.complete_work(&clock)
        .expect("in-progress task completes");
    match status {
        TaskStatus::Approved => task
            .approve(PayoutTxId::new("payout-1"), &clock)
            .expect("completed task approves"),
        TaskStatus::Disputed => task
            .transition_to(TaskStatus::Disputed, &clock)
            .expect("completed task disputes"),
        _ => {}
    }
    task
}
