//! In-memory integration tests for chat binding across tasks.

use super::helpers::{Marketplace, marketplace, user};
use eyre::ensure;
use rstest::rstest;
use taskmarket::chat::services::PostMessage;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeat_partners_share_one_thread(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    let first = marketplace.post(&creator, "Errand 1", 0).await?;
    let second = marketplace.post(&creator, "Errand 2", 0).await?;

    marketplace.service.accept(first.id(), &performer).await?;
    let chat = marketplace.service.chat();
    let thread_id = chat.resolve(&creator, &performer, None).await?;
    chat.post_message(
        PostMessage::text(thread_id, performer.clone(), creator.clone(), "On it")
            .about_task(first.id()),
    )
    .await?;

    marketplace.service.accept(second.id(), &performer).await?;
    chat.post_message(
        PostMessage::text(thread_id, creator.clone(), performer.clone(), "Same place as before")
            .about_task(second.id()),
    )
    .await?;

    let threads = chat.threads_for_user(&performer).await?;
    ensure!(threads.len() == 1);
    let thread = threads
        .first()
        .ok_or_else(|| eyre::eyre!("performer has no thread"))?;
    ensure!(thread.id() == thread_id);
    ensure!(thread.last_task_id() == Some(second.id()));
    ensure!(thread.last_message() == Some("Same place as before"));

    ensure!(chat.messages_in_thread(thread_id).await?.len() == 2);
    ensure!(chat.messages_for_task(first.id()).await?.len() == 1);
    ensure!(chat.messages_for_task(second.id()).await?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn different_partners_get_different_threads(marketplace: Marketplace) -> eyre::Result<()> {
    let creator = user("u1");
    let first = marketplace.post(&creator, "Errand 1", 0).await?;
    let second = marketplace.post(&creator, "Errand 2", 0).await?;

    marketplace.service.accept(first.id(), &user("u2")).await?;
    marketplace.service.accept(second.id(), &user("u3")).await?;

    let threads = marketplace.service.chat().threads_for_user(&creator).await?;
    ensure!(threads.len() == 2);
    Ok(())
}
