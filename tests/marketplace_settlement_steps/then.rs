//! Then steps for marketplace settlement BDD scenarios.

use super::world::{MarketplaceWorld, run_async, user};
use rstest_bdd_macros::then;
use taskmarket::task::{domain::TaskStatus, services::TaskLifecycleError};
use taskmarket::wallet::domain::Money;

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &MarketplaceWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world.task()?.id();
    let stored = run_async(world.service.get_task(task_id))?;

    if stored.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            stored.status()
        ));
    }
    Ok(())
}

#[then(r#""{name}" ends with a balance of {dollars:i64} dollars"#)]
fn ends_with_balance(
    world: &MarketplaceWorld,
    name: String,
    dollars: i64,
) -> Result<(), eyre::Report> {
    let owner = user(&name)?;
    let balance = run_async(world.service.wallet().get_balance(&owner))?;
    let expected = Money::from_dollars(dollars);

    if balance != expected {
        return Err(eyre::eyre!("expected {name} to hold {expected}, found {balance}"));
    }
    Ok(())
}

#[then(r#""{name}" has cancelled {count:u32} tasks"#)]
fn has_cancelled(world: &MarketplaceWorld, name: String, count: u32) -> Result<(), eyre::Report> {
    let owner = user(&name)?;
    let recorded = run_async(world.service.cancellation_count(&owner))?;

    if recorded != count {
        return Err(eyre::eyre!(
            "expected {count} cancellations for {name}, found {recorded}"
        ));
    }
    Ok(())
}

#[then("the update is rejected for insufficient funds")]
fn rejected_for_insufficient_funds(world: &MarketplaceWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing update result"))?;

    if !matches!(result, Err(TaskLifecycleError::InsufficientFunds { .. })) {
        return Err(eyre::eyre!("expected InsufficientFunds error, got {result:?}"));
    }
    Ok(())
}

#[then("the update is rejected because the actor is not the performer")]
fn rejected_not_performer(world: &MarketplaceWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing update result"))?;

    if !matches!(result, Err(TaskLifecycleError::NotPerformer(_))) {
        return Err(eyre::eyre!("expected NotPerformer error, got {result:?}"));
    }
    Ok(())
}
