//! When steps for marketplace settlement BDD scenarios.

use super::world::{MarketplaceWorld, run_async, user};
use rstest_bdd_macros::when;
use taskmarket::task::domain::TaskStatus;

#[when(r#""{name}" advances the task to "{target}""#)]
fn advance_task(
    world: &mut MarketplaceWorld,
    name: String,
    target: String,
) -> Result<(), eyre::Report> {
    let actor = user(&name)?;
    let target_status = TaskStatus::try_from(target.as_str())
        .map_err(|err| eyre::eyre!("invalid target status in scenario: {err}"))?;
    let task_id = world.task()?.id();

    let result = run_async(world.service.advance(task_id, &actor, target_status, None));
    if let Ok(ref updated) = result {
        world.current_task = Some(updated.clone());
    }
    world.last_result = Some(result);
    Ok(())
}

#[when(r#""{name}" cancels the task because "{reason}""#)]
fn cancel_task(
    world: &mut MarketplaceWorld,
    name: String,
    reason: String,
) -> Result<(), eyre::Report> {
    let actor = user(&name)?;
    let task_id = world.task()?.id();

    let result = run_async(world.service.cancel(task_id, &actor, &reason))
        .map(|outcome| outcome.task);
    if let Ok(ref cancelled) = result {
        world.current_task = Some(cancelled.clone());
    }
    world.last_result = Some(result);
    Ok(())
}
