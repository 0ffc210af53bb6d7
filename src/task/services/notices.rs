//! Notification texts for task lifecycle events.

use crate::notification::domain::{Notification, RecipientRole};
use crate::task::domain::{Application, Task, UserId};

pub(super) fn task_posted(task: &Task, administrator: UserId) -> Notification {
    Notification::about_task(
        task.id(),
        administrator,
        RecipientRole::Administrator,
        "New task posted",
        format!(
            "{} posted \"{}\" with a budget of {}.",
            task.requester_name(),
            task.listing().title(),
            task.budget()
        ),
    )
}

pub(super) fn application_received(task: &Task, application: &Application) -> Notification {
    Notification::about_task(
        task.id(),
        task.requester_id().clone(),
        RecipientRole::Requester,
        "New application",
        format!(
            "{} applied to \"{}\".",
            application.worker_name(),
            task.listing().title()
        ),
    )
}

pub(super) fn worker_selected(task: &Task, application: &Application) -> Notification {
    let payout_prompt = if task.worker_payout_address().is_some() {
        "The requester will now fund the escrow."
    } else {
        "Bind a payout address so the requester can fund the escrow."
    };
    Notification::about_task(
        task.id(),
        application.worker_id().clone(),
        RecipientRole::Worker,
        "You were selected",
        format!(
            "Your application to \"{}\" was approved. {payout_prompt}",
            task.listing().title()
        ),
    )
}

pub(super) fn application_rejected(task: &Task, application: &Application) -> Notification {
    Notification::about_task(
        task.id(),
        application.worker_id().clone(),
        RecipientRole::Worker,
        "Application not selected",
        format!(
            "Another applicant was chosen for \"{}\".",
            task.listing().title()
        ),
    )
}

pub(super) fn escrow_funded(task: &Task, worker: UserId) -> Notification {
    Notification::about_task(
        task.id(),
        worker,
        RecipientRole::Worker,
        "Funds secured",
        format!(
            "{} is held in escrow for \"{}\". You can begin work.",
            task.budget(),
            task.listing().title()
        ),
    )
}

pub(super) fn work_started(task: &Task) -> Notification {
    Notification::about_task(
        task.id(),
        task.requester_id().clone(),
        RecipientRole::Requester,
        "Work started",
        format!("Work on \"{}\" has started.", task.listing().title()),
    )
}

pub(super) fn work_completed(task: &Task) -> Notification {
    Notification::about_task(
        task.id(),
        task.requester_id().clone(),
        RecipientRole::Requester,
        "Work submitted",
        format!(
            "\"{}\" was marked complete. Review and approve to release payment.",
            task.listing().title()
        ),
    )
}

pub(super) fn payment_released(task: &Task, worker: UserId) -> Notification {
    let split = task.commission_split();
    Notification::about_task(
        task.id(),
        worker,
        RecipientRole::Worker,
        "Payment released",
        format!(
            "\"{}\" was approved. {} was released to you after a {} platform fee.",
            task.listing().title(),
            split.net(),
            split.commission()
        ),
    )
}

/// Builds the same notice for the requester and, when selected, the worker.
pub(super) fn to_both_parties(
    task: &Task,
    title: &str,
    body: &str,
) -> impl Iterator<Item = Notification> {
    let requester = Notification::about_task(
        task.id(),
        task.requester_id().clone(),
        RecipientRole::Requester,
        title,
        body,
    );
    let worker = task.selected_worker().map(|worker| {
        Notification::about_task(
            task.id(),
            worker.worker_id.clone(),
            RecipientRole::Worker,
            title,
            body,
        )
    });
    std::iter::once(requester).chain(worker)
}
