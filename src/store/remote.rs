//! Remote store client contract
//!
//! The engine consumes a document store through three primitives: live
//! subscriptions (a stream of full replacement snapshots plus a cancel
//! handle), merge upserts, and deletes. `MongoStore` implements the
//! contract against MongoDB; `MemoryStore` backs tests and offline use.
//! Both notify subscriptions through a process-local broadcast of store
//! events and re-run the subscribed query on each matching event, so every
//! delivered snapshot fully supersedes the previous one.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use crate::category::{Category, GoalKey};
use crate::store::docs::{EntryDoc, EntryKey, EntryValues, MonthQuery, UserDoc};
use crate::types::{DaybookError, OwnerId, Result};

type CancelFn = Box<dyn FnOnce() -> Result<()> + Send>;

/// Idempotent cancellation handle for a subscription.
///
/// The first `cancel` runs the underlying teardown; every later call is a
/// no-op returning `Ok`. Clones share the same one-shot teardown.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<Mutex<Option<CancelFn>>>,
}

impl CancelHandle {
    pub fn new(teardown: impl FnOnce() -> Result<()> + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(teardown)))),
        }
    }

    /// Handle that has nothing to cancel
    pub fn noop() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn cancel(&self) -> Result<()> {
        let teardown = self
            .inner
            .lock()
            .map_err(|_| DaybookError::Cancellation("cancel state poisoned".into()))?
            .take();
        match teardown {
            Some(teardown) => teardown(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CancelHandle")
    }
}

/// A live subscription: a stream of replacement snapshots plus its cancel
/// handle. Dropping the receiver also ends the subscription.
pub struct Subscription<T> {
    pub snapshots: mpsc::Receiver<T>,
    pub cancel: CancelHandle,
}

/// Store change notification, emitted after every successful write
#[derive(Debug, Clone)]
pub enum StoreEvent {
    EntryWritten {
        owner: OwnerId,
        category: Category,
        date_key: String,
    },
    EntryDeleted {
        owner: OwnerId,
        category: Category,
        date_key: String,
    },
    UserWritten {
        owner: OwnerId,
    },
}

/// Document store consumed by the engine
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Subscribe to all entries of one `(owner, category)` whose `month`
    /// equals the query's month key. Every snapshot is the complete result
    /// set for the window.
    async fn subscribe_month(&self, query: MonthQuery) -> Result<Subscription<Vec<EntryDoc>>>;

    /// Subscribe to a single entry document
    async fn subscribe_entry(&self, key: EntryKey) -> Result<Subscription<Option<EntryDoc>>>;

    /// Subscribe to an owner's preference document
    async fn subscribe_user(&self, owner: OwnerId) -> Result<Subscription<Option<UserDoc>>>;

    /// Merge-upsert an entry document; `updatedAt` is assigned by the store
    async fn upsert_entry(&self, key: &EntryKey, values: EntryValues) -> Result<()>;

    /// Delete an entry document; a no-op when the document is absent
    async fn delete_entry(&self, key: &EntryKey) -> Result<()>;

    /// Merge-upsert `preferences.primaryGoal` on the owner's document
    async fn set_primary_goal(&self, owner: &OwnerId, goal: GoalKey) -> Result<()>;
}

/// Drive one subscription: emit the query result immediately, then re-run
/// and re-emit it whenever a matching store event arrives. A failed re-query
/// is logged and the previous snapshot stays current.
pub(crate) fn spawn_requery_task<T, M, Q, Fut>(
    capacity: usize,
    mut events: broadcast::Receiver<StoreEvent>,
    matches: M,
    query: Q,
) -> Subscription<T>
where
    T: Send + 'static,
    M: Fn(&StoreEvent) -> bool + Send + 'static,
    Q: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        match query().await {
            Ok(snapshot) => {
                if tx.send(snapshot).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "initial subscription query failed"),
        }

        loop {
            tokio::select! {
                _ = cancel_rx.changed() => {
                    debug!("subscription canceled");
                    break;
                }
                event = events.recv() => {
                    let relevant = match event {
                        Ok(ref ev) => matches(ev),
                        // Dropped events may have been relevant; re-query to
                        // be sure.
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscription lagged behind store events");
                            true
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    };
                    if !relevant {
                        continue;
                    }
                    match query().await {
                        Ok(snapshot) => {
                            if tx.send(snapshot).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            // Soft-fail: keep serving the last good snapshot.
                            warn!(error = %e, "subscription re-query failed, keeping last snapshot");
                        }
                    }
                }
            }
        }
    });

    let cancel = CancelHandle::new(move || {
        // The task may already be gone; that is still a successful cancel.
        let _ = cancel_tx.send(true);
        Ok(())
    });

    Subscription {
        snapshots: rx,
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_handle_runs_once() {
        let count = Arc::new(Mutex::new(0u32));
        let counted = Arc::clone(&count);
        let handle = CancelHandle::new(move || {
            *counted.lock().expect("lock") += 1;
            Ok(())
        });

        assert!(handle.cancel().is_ok());
        assert!(handle.cancel().is_ok());
        assert!(handle.clone().cancel().is_ok());
        assert_eq!(*count.lock().expect("lock"), 1);
    }

    #[test]
    fn test_cancel_handle_surfaces_teardown_error_once() {
        let handle =
            CancelHandle::new(|| Err(DaybookError::Cancellation("listener gone".into())));
        assert!(handle.cancel().is_err());
        // Idempotent: the failure does not repeat.
        assert!(handle.cancel().is_ok());
    }

    #[test]
    fn test_noop_handle() {
        assert!(CancelHandle::noop().cancel().is_ok());
    }

    #[tokio::test]
    async fn test_requery_task_emits_initial_and_event_snapshots() {
        let (events_tx, _) = broadcast::channel(16);
        let counter = Arc::new(Mutex::new(0u32));
        let counted = Arc::clone(&counter);

        let mut sub = spawn_requery_task(
            8,
            events_tx.subscribe(),
            |ev| matches!(ev, StoreEvent::UserWritten { .. }),
            move || {
                let counted = Arc::clone(&counted);
                async move {
                    let mut n = counted.lock().expect("lock");
                    *n += 1;
                    Ok(*n)
                }
            },
        );

        assert_eq!(sub.snapshots.recv().await, Some(1));

        // Irrelevant event: no new snapshot is queued for it.
        events_tx
            .send(StoreEvent::EntryDeleted {
                owner: OwnerId::from("u1"),
                category: Category::Water,
                date_key: "2025-08-06".into(),
            })
            .expect("send");
        events_tx
            .send(StoreEvent::UserWritten {
                owner: OwnerId::from("u1"),
            })
            .expect("send");

        assert_eq!(sub.snapshots.recv().await, Some(2));

        sub.cancel.cancel().expect("cancel");
        assert_eq!(sub.snapshots.recv().await, None);
    }
}
