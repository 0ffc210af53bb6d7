//! Given steps for marketplace BDD scenarios.

use super::world::{MarketplaceWorld, REQUESTER, run_async, user};
use chrono::{Duration, Utc};
use eyre::WrapErr;
use gigflow::task::services::{ApplyRequest, CreateTaskRequest};
use rstest_bdd_macros::given;

fn post_task(
    world: &mut MarketplaceWorld,
    budget: u64,
    currency: String,
) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(
        REQUESTER,
        "Walk the dog",
        "Two walks a day while I am away",
        budget,
        currency,
        Utc::now() + Duration::days(3),
    );
    let task = run_async(world.service.create_task(request)).wrap_err("post task")?;
    world.task = Some(task);
    Ok(())
}

fn submit_application(world: &mut MarketplaceWorld, worker: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let application = run_async(
        world
            .service
            .apply(ApplyRequest::new(task_id, worker.as_str()).with_payout_address(format!("T-{worker}"))),
    )
    .wrap_err("submit application")?;
    world.applications.insert(worker, application);
    Ok(())
}

#[given(r#"a requester posts a task with a budget of {budget:u64} "{currency}""#)]
fn requester_posts_task(
    world: &mut MarketplaceWorld,
    budget: u64,
    currency: String,
) -> Result<(), eyre::Report> {
    post_task(world, budget, currency)
}

#[given(r#"worker "{worker}" applies to the task"#)]
fn worker_applies(world: &mut MarketplaceWorld, worker: String) -> Result<(), eyre::Report> {
    submit_application(world, worker)
}

#[given(r#"a funded task for worker "{worker}" with a budget of {budget:u64} "{currency}""#)]
fn funded_task(
    world: &mut MarketplaceWorld,
    worker: String,
    budget: u64,
    currency: String,
) -> Result<(), eyre::Report> {
    post_task(world, budget, currency)?;
    submit_application(world, worker.clone())?;
    let task_id = world.task()?.id();
    let application_id = world.application_of(&worker)?.id();
    let requester = user(REQUESTER)?;
    run_async(world.service.select_applicant(task_id, application_id, &requester))
        .wrap_err("select applicant")?;
    let funded = run_async(world.service.deposit_escrow(task_id, &requester, None))
        .wrap_err("deposit escrow")?;
    world.task = Some(funded);
    Ok(())
}

#[given(r#"worker "{worker}" has completed the task"#)]
fn worker_has_completed(world: &mut MarketplaceWorld, worker: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let completed = run_async(world.service.mark_complete(task_id, &user(&worker)?))
        .wrap_err("mark complete")?;
    world.task = Some(completed);
    Ok(())
}

#[given("the requester has approved the task")]
fn requester_has_approved(world: &mut MarketplaceWorld) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let approved = run_async(world.service.approve_task(task_id, &user(REQUESTER)?))
        .wrap_err("approve task")?;
    world.task = Some(approved);
    Ok(())
}
