//! Given steps for marketplace settlement BDD scenarios.

use super::world::{MarketplaceWorld, run_async, user};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskmarket::task::domain::TaskDetails;
use taskmarket::wallet::domain::Money;

#[given(r#""{name}" has a wallet balance of {dollars:i64} dollars"#)]
fn wallet_balance(
    world: &mut MarketplaceWorld,
    name: String,
    dollars: i64,
) -> Result<(), eyre::Report> {
    let owner = user(&name)?;
    run_async(world.service.wallet().credit(
        &owner,
        Money::from_dollars(dollars),
        "top-up",
        None,
    ))
    .wrap_err("fund scenario wallet")?;
    Ok(())
}

#[given(r#""{name}" has posted a task "{title}" priced at {dollars:i64} dollars"#)]
fn posted_task(
    world: &mut MarketplaceWorld,
    name: String,
    title: String,
    dollars: i64,
) -> Result<(), eyre::Report> {
    let creator = user(&name)?;
    let task = run_async(
        world
            .service
            .create_task(&creator, TaskDetails::new(title, Money::from_dollars(dollars))),
    )
    .wrap_err("post scenario task")?;
    world.current_task = Some(task);
    Ok(())
}

#[given(r#""{name}" has accepted the task"#)]
fn accepted_task(world: &mut MarketplaceWorld, name: String) -> Result<(), eyre::Report> {
    let performer = user(&name)?;
    let task_id = world.task()?.id();
    let accepted = run_async(world.service.accept(task_id, &performer))
        .wrap_err("accept scenario task")?;
    world.current_task = Some(accepted);
    Ok(())
}

#[given(r#""{name}" has already cancelled {count:u32} tasks"#)]
fn prior_cancellations(
    world: &mut MarketplaceWorld,
    name: String,
    count: u32,
) -> Result<(), eyre::Report> {
    let creator = user(&name)?;
    for round in 0..count {
        let task = run_async(world.service.create_task(
            &creator,
            TaskDetails::new(format!("Abandoned errand {round}"), Money::ZERO),
        ))
        .wrap_err("post task to cancel")?;
        run_async(world.service.cancel(task.id(), &creator, "no longer needed"))
            .wrap_err("cancel scenario task")?;
    }
    Ok(())
}
