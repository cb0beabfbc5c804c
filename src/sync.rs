//! Live month-scoped entry synchronization
//!
//! `EntrySync` turns a store subscription into a reactive date→entry map.
//! Every remote snapshot fully replaces the in-memory index; there is no
//! incremental patching, so a late or reordered partial update can never
//! leave the map merged from two generations of data.
//!
//! `MonthSession` adds owner/month switching on top: the old subscription
//! is canceled and the published index cleared before a new subscription
//! opens, so a stale owner's entries are never visible, even transiently.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::calendar::{self, CalendarDay};
use crate::category::Category;
use crate::store::docs::{EntryDoc, MonthQuery};
use crate::store::remote::{CancelHandle, RemoteStore};
use crate::types::{OwnerId, Result};

/// Date-keyed entries of exactly one `(owner, category, month)` window.
///
/// Absence of a key means "no meaningful data" for that day, never
/// "unknown".
pub type EntryIndex = BTreeMap<String, EntryDoc>;

/// A live entry index for one `(owner, category, month)` window
pub struct EntryFeed {
    index: watch::Receiver<EntryIndex>,
    cancel: CancelHandle,
}

impl EntryFeed {
    /// Watch handle on the index; each published value fully replaces the
    /// previous one.
    pub fn index(&self) -> watch::Receiver<EntryIndex> {
        self.index.clone()
    }

    /// Clone of the current index
    pub fn current(&self) -> EntryIndex {
        self.index.borrow().clone()
    }

    /// Cancel the underlying subscription. Idempotent.
    pub fn cancel(&self) -> Result<()> {
        self.cancel.cancel()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// Builds live entry feeds from a remote store
#[derive(Clone)]
pub struct EntrySync {
    store: Arc<dyn RemoteStore>,
}

impl EntrySync {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Open a feed for one `(owner, category, month)` window.
    ///
    /// Without an owner the feed immediately holds the empty index and no
    /// remote subscription is opened.
    pub async fn subscribe(
        &self,
        owner: Option<&OwnerId>,
        category: Category,
        month: &str,
    ) -> Result<EntryFeed> {
        let (tx, rx) = watch::channel(EntryIndex::new());

        let Some(owner) = owner else {
            return Ok(EntryFeed {
                index: rx,
                cancel: CancelHandle::noop(),
            });
        };

        let subscription = self
            .store
            .subscribe_month(MonthQuery {
                owner: owner.clone(),
                category,
                month: month.to_string(),
            })
            .await?;

        let month = month.to_string();
        let mut snapshots = subscription.snapshots;
        tokio::spawn(async move {
            while let Some(batch) = snapshots.recv().await {
                let mut next = EntryIndex::new();
                for entry in batch {
                    // The query filters on month equality; anything else in
                    // the snapshot is a store bug and is dropped.
                    if entry.month != month {
                        warn!(
                            month = %month,
                            entry_month = %entry.month,
                            date = %entry.date,
                            "dropping entry outside the subscribed month window"
                        );
                        continue;
                    }
                    next.insert(entry.date.clone(), entry);
                }
                if tx.send(next).is_err() {
                    break;
                }
            }
            debug!(month = %month, "entry feed ended");
        });

        Ok(EntryFeed {
            index: rx,
            cancel: subscription.cancel,
        })
    }
}

/// Cancellation handles collected for shared teardown.
///
/// `cancel_all` invokes every handle; an individual failure is logged and
/// never re-thrown, so one bad cancel cannot block the others.
#[derive(Default)]
pub struct Teardown {
    handles: Vec<(String, CancelHandle)>,
}

impl Teardown {
    pub fn push(&mut self, label: impl Into<String>, handle: CancelHandle) {
        self.handles.push((label.into(), handle));
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn cancel_all(&self) {
        for (label, handle) in &self.handles {
            if let Err(e) = handle.cancel() {
                warn!(subscription = %label, error = %e, "cancellation failed during teardown");
            }
        }
    }
}

/// One owner's view of one category month: a stable published index that
/// survives owner and month switches.
pub struct MonthSession {
    sync: EntrySync,
    category: Category,
    owner: Option<OwnerId>,
    anchor: NaiveDate,
    published: Arc<watch::Sender<EntryIndex>>,
    index: watch::Receiver<EntryIndex>,
    feed: Option<EntryFeed>,
    pipe: Option<JoinHandle<()>>,
}

impl MonthSession {
    /// Open a session anchored at the given date's month
    pub async fn open(
        store: Arc<dyn RemoteStore>,
        category: Category,
        owner: Option<OwnerId>,
        anchor: NaiveDate,
    ) -> Result<Self> {
        let (tx, rx) = watch::channel(EntryIndex::new());
        let mut session = Self {
            sync: EntrySync::new(store),
            category,
            owner,
            anchor: calendar::first_of_month(anchor),
            published: Arc::new(tx),
            index: rx,
            feed: None,
            pipe: None,
        };
        session.resubscribe().await?;
        Ok(session)
    }

    /// Watch handle on the session's index; stable across owner and month
    /// switches.
    pub fn index(&self) -> watch::Receiver<EntryIndex> {
        self.index.clone()
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn month_key(&self) -> String {
        calendar::month_key(self.anchor)
    }

    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }

    /// Build the calendar grid for the current index
    pub fn grid(&self, today: NaiveDate) -> Vec<CalendarDay> {
        calendar::build_month_grid(self.anchor, &self.index.borrow(), today)
    }

    /// Switch owners. The old subscription is torn down and the index
    /// cleared before the new owner's subscription opens.
    pub async fn set_owner(&mut self, owner: Option<OwnerId>) -> Result<()> {
        self.teardown().await;
        self.owner = owner;
        self.resubscribe().await
    }

    /// Move the window one month back
    pub async fn prev_month(&mut self) -> Result<()> {
        let anchor = calendar::prev_month(self.anchor);
        self.set_anchor(anchor).await
    }

    /// Move the window one month forward
    pub async fn next_month(&mut self) -> Result<()> {
        let anchor = calendar::next_month(self.anchor);
        self.set_anchor(anchor).await
    }

    async fn set_anchor(&mut self, anchor: NaiveDate) -> Result<()> {
        self.teardown().await;
        self.anchor = anchor;
        self.resubscribe().await
    }

    /// Tear the session down explicitly
    pub async fn close(&mut self) {
        self.teardown().await;
    }

    async fn resubscribe(&mut self) -> Result<()> {
        let month = self.month_key();
        let feed = self
            .sync
            .subscribe(self.owner.as_ref(), self.category, &month)
            .await?;

        let mut feed_rx = feed.index();
        let published = Arc::clone(&self.published);
        let pipe = tokio::spawn(async move {
            loop {
                let snapshot = feed_rx.borrow_and_update().clone();
                if published.send(snapshot).is_err() {
                    break;
                }
                if feed_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        self.feed = Some(feed);
        self.pipe = Some(pipe);
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(pipe) = self.pipe.take() {
            pipe.abort();
            // Wait the pipe out so a stale snapshot cannot land after the
            // index is cleared.
            let _ = pipe.await;
        }
        if let Some(feed) = self.feed.take() {
            if let Err(e) = feed.cancel() {
                warn!(error = %e, "subscription cancel failed");
            }
        }
        let _ = self.published.send(EntryIndex::new());
    }
}

impl Drop for MonthSession {
    fn drop(&mut self) {
        if let Some(pipe) = self.pipe.take() {
            pipe.abort();
        }
        if let Some(feed) = self.feed.take() {
            if let Err(e) = feed.cancel() {
                warn!(error = %e, "subscription cancel failed on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::docs::{EntryKey, EntryValues, Scalar};
    use crate::store::memory::MemoryStore;
    use std::time::Duration;
    use tokio::time::timeout;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn glasses(n: f64) -> EntryValues {
        let mut values = EntryValues::new();
        values.insert("glasses".into(), Scalar::Number(n));
        values
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<EntryIndex>, predicate: F) -> EntryIndex
    where
        F: Fn(&EntryIndex) -> bool,
    {
        for _ in 0..20 {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            timeout(Duration::from_secs(1), rx.changed())
                .await
                .expect("index update timed out")
                .expect("index channel closed");
        }
        panic!("index never reached the expected state");
    }

    #[tokio::test]
    async fn test_absent_owner_yields_empty_index_without_subscription() {
        let store = Arc::new(MemoryStore::new());
        let sync = EntrySync::new(store);
        let feed = sync
            .subscribe(None, Category::Water, "2025-08")
            .await
            .expect("subscribe");
        assert!(feed.current().is_empty());
        assert!(feed.cancel().is_ok());
        assert!(feed.cancel().is_ok());
    }

    #[tokio::test]
    async fn test_feed_tracks_writes_in_window() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::from("u1");
        let sync = EntrySync::new(Arc::clone(&store) as Arc<dyn RemoteStore>);

        let feed = sync
            .subscribe(Some(&owner), Category::Water, "2025-08")
            .await
            .expect("subscribe");
        let mut rx = feed.index();

        store
            .upsert_entry(
                &EntryKey::new(owner.clone(), Category::Water, "2025-08-06"),
                glasses(6.0),
            )
            .await
            .expect("upsert");

        let index = wait_for(&mut rx, |index| index.contains_key("2025-08-06")).await;
        assert_eq!(index.len(), 1);
        assert_eq!(index["2025-08-06"].values["glasses"], Scalar::Number(6.0));

        store
            .delete_entry(&EntryKey::new(owner, Category::Water, "2025-08-06"))
            .await
            .expect("delete");
        let index = wait_for(&mut rx, |index| index.is_empty()).await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_owner_switch_leaves_no_stale_entries() {
        let store = Arc::new(MemoryStore::new());
        let alice = OwnerId::from("alice");
        let bob = OwnerId::from("bob");

        store
            .upsert_entry(
                &EntryKey::new(alice.clone(), Category::Water, "2025-08-06"),
                glasses(6.0),
            )
            .await
            .expect("alice upsert");
        store
            .upsert_entry(
                &EntryKey::new(bob.clone(), Category::Water, "2025-08-07"),
                glasses(2.0),
            )
            .await
            .expect("bob upsert");

        let mut session = MonthSession::open(
            Arc::clone(&store) as Arc<dyn RemoteStore>,
            Category::Water,
            Some(alice),
            date(2025, 8, 1),
        )
        .await
        .expect("open");
        let mut rx = session.index();

        let index = wait_for(&mut rx, |index| index.contains_key("2025-08-06")).await;
        assert_eq!(index.len(), 1);

        session.set_owner(Some(bob)).await.expect("switch owner");
        let index = wait_for(&mut rx, |index| index.contains_key("2025-08-07")).await;
        assert_eq!(index.len(), 1);
        assert!(!index.contains_key("2025-08-06"));

        session.set_owner(None).await.expect("sign out");
        let index = wait_for(&mut rx, |index| index.is_empty()).await;
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_month_step_rescopes_the_window() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::from("u1");

        store
            .upsert_entry(
                &EntryKey::new(owner.clone(), Category::Sleep, "2025-07-31"),
                glasses(8.0),
            )
            .await
            .expect("july upsert");
        store
            .upsert_entry(
                &EntryKey::new(owner.clone(), Category::Sleep, "2025-08-01"),
                glasses(7.0),
            )
            .await
            .expect("august upsert");

        let mut session = MonthSession::open(
            Arc::clone(&store) as Arc<dyn RemoteStore>,
            Category::Sleep,
            Some(owner),
            date(2025, 8, 15),
        )
        .await
        .expect("open");
        assert_eq!(session.month_key(), "2025-08");
        let mut rx = session.index();
        wait_for(&mut rx, |index| index.contains_key("2025-08-01")).await;

        session.prev_month().await.expect("step back");
        assert_eq!(session.month_key(), "2025-07");
        let index = wait_for(&mut rx, |index| index.contains_key("2025-07-31")).await;
        assert!(!index.contains_key("2025-08-01"));

        session.close().await;
    }

    #[tokio::test]
    async fn test_teardown_logs_and_continues_past_failures() {
        let mut teardown = Teardown::default();
        let flag = Arc::new(std::sync::Mutex::new(false));
        let flagged = Arc::clone(&flag);

        teardown.push(
            "bad",
            CancelHandle::new(|| Err(crate::types::DaybookError::Cancellation("boom".into()))),
        );
        teardown.push(
            "good",
            CancelHandle::new(move || {
                *flagged.lock().expect("lock") = true;
                Ok(())
            }),
        );

        teardown.cancel_all();
        assert!(*flag.lock().expect("lock"), "later handles still cancel");

        // Safe to run again: every handle is already spent.
        teardown.cancel_all();
    }
}
