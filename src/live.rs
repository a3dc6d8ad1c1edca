//! Push-based live queries.
//!
//! A [`Subscription`] receives the full matching result set once on
//! registration and again after every underlying change. Snapshots arrive in
//! commit order. Cancelling (or dropping) the subscription closes the channel;
//! the publisher prunes closed subscribers on its next change.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Live stream of result-set snapshots.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<Vec<T>>,
}

impl<T> Subscription<T> {
    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the publisher has gone away.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        self.receiver.recv().await
    }

    /// Returns an already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Vec<T>> {
        self.receiver.try_recv().ok()
    }

    /// Stops delivery and discards any snapshots not yet read.
    pub fn cancel(mut self) {
        self.receiver.close();
        debug!("live subscription cancelled");
    }
}

/// Registry of live queries held by a publishing adapter.
#[derive(Debug)]
pub struct SubscriberSet<Q, T> {
    subscribers: Vec<(Q, mpsc::UnboundedSender<Vec<T>>)>,
}

impl<Q, T> Default for SubscriberSet<Q, T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<Q, T> SubscriberSet<Q, T> {
    /// Registers a query and delivers its initial snapshot.
    pub fn register(&mut self, query: Q, initial: Vec<T>) -> Subscription<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        if sender.send(initial).is_ok() {
            self.subscribers.push((query, sender));
        }
        Subscription { receiver }
    }

    /// Delivers a fresh snapshot to every live subscriber.
    ///
    /// Must be called while the caller still holds the lock that serialised
    /// the change, so snapshots are delivered in commit order.
    pub fn publish(&mut self, mut snapshot: impl FnMut(&Q) -> Vec<T>) {
        self.subscribers.retain(|(query, sender)| {
            if sender.is_closed() {
                return false;
            }
            sender.send(snapshot(query)).is_ok()
        });
    }

    /// Like [`SubscriberSet::publish`], but only subscribers whose query
    /// passes `affected` receive a snapshot. Closed subscribers are pruned
    /// either way.
    pub fn publish_where(
        &mut self,
        mut affected: impl FnMut(&Q) -> bool,
        mut snapshot: impl FnMut(&Q) -> Vec<T>,
    ) {
        self.subscribers.retain(|(query, sender)| {
            if sender.is_closed() {
                return false;
            }
            !affected(query) || sender.send(snapshot(query)).is_ok()
        });
    }

    /// Returns the number of registered subscribers, including any whose
    /// consumer has cancelled since the last publish.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns `true` when no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Builds a subscription for stores without change notification by
/// re-running `fetch` every `interval` and pushing only changed snapshots.
///
/// The polling task ends when the subscription is cancelled or dropped.
/// Must be called from within a Tokio runtime.
pub fn poll_subscription<T, E, F, Fut>(interval: Duration, mut fetch: F) -> Subscription<T>
where
    T: Clone + PartialEq + Send + 'static,
    E: Display + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut last: Option<Vec<T>> = None;
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if sender.is_closed() {
                break;
            }
            match fetch().await {
                Ok(snapshot) if last.as_ref() != Some(&snapshot) => {
                    if sender.send(snapshot.clone()).is_err() {
                        break;
                    }
                    last = Some(snapshot);
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "live query poll failed"),
            }
        }
        debug!("polling subscription stopped");
    });
    Subscription { receiver }
}
