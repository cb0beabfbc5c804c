//! In-memory store backend
//!
//! Same contract and notification loop as the MongoDB backend, with a
//! `DashMap` standing in for the database. Used by tests and by hosts that
//! run without a remote store.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::category::{Category, GoalKey};
use crate::config::StoreConfig;
use crate::store::docs::{EntryDoc, EntryKey, EntryValues, MonthQuery, Preferences, UserDoc};
use crate::store::remote::{spawn_requery_task, RemoteStore, StoreEvent, Subscription};
use crate::types::{OwnerId, Result};

#[derive(Debug, Clone)]
struct StoredEntry {
    owner: OwnerId,
    entry: EntryDoc,
}

/// Memory-backed document store
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<(Category, String), StoredEntry>>,
    users: Arc<DashMap<OwnerId, UserDoc>>,
    events: broadcast::Sender<StoreEvent>,
    snapshot_capacity: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            entries: Arc::new(DashMap::new()),
            users: Arc::new(DashMap::new()),
            events,
            snapshot_capacity: config.snapshot_capacity,
        }
    }

    /// Direct read of one entry, for assertions in tests
    pub fn entry(&self, key: &EntryKey) -> Option<EntryDoc> {
        self.entries
            .get(&(key.category, key.doc_id()))
            .map(|stored| stored.entry.clone())
    }

    fn month_entries(&self, query: &MonthQuery) -> Vec<EntryDoc> {
        let mut found: Vec<EntryDoc> = self
            .entries
            .iter()
            .filter(|stored| {
                stored.key().0 == query.category
                    && stored.owner == query.owner
                    && stored.entry.month == query.month
            })
            .map(|stored| stored.entry.clone())
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date));
        found
    }

    fn user(&self, owner: &OwnerId) -> Option<UserDoc> {
        self.users.get(owner).map(|user| user.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe_month(&self, query: MonthQuery) -> Result<Subscription<Vec<EntryDoc>>> {
        let store = self.clone();
        let scope = query.clone();
        Ok(spawn_requery_task(
            self.snapshot_capacity,
            self.events.subscribe(),
            move |event| match event {
                StoreEvent::EntryWritten {
                    owner,
                    category,
                    date_key,
                }
                | StoreEvent::EntryDeleted {
                    owner,
                    category,
                    date_key,
                } => {
                    *category == scope.category
                        && *owner == scope.owner
                        && date_key.starts_with(&scope.month)
                }
                StoreEvent::UserWritten { .. } => false,
            },
            move || {
                let store = store.clone();
                let query = query.clone();
                async move { Ok(store.month_entries(&query)) }
            },
        ))
    }

    async fn subscribe_entry(&self, key: EntryKey) -> Result<Subscription<Option<EntryDoc>>> {
        let store = self.clone();
        let scope = key.clone();
        Ok(spawn_requery_task(
            self.snapshot_capacity,
            self.events.subscribe(),
            move |event| match event {
                StoreEvent::EntryWritten {
                    owner,
                    category,
                    date_key,
                }
                | StoreEvent::EntryDeleted {
                    owner,
                    category,
                    date_key,
                } => {
                    *category == scope.category
                        && *owner == scope.owner
                        && *date_key == scope.date_key
                }
                StoreEvent::UserWritten { .. } => false,
            },
            move || {
                let store = store.clone();
                let key = key.clone();
                async move { Ok(store.entry(&key)) }
            },
        ))
    }

    async fn subscribe_user(&self, owner: OwnerId) -> Result<Subscription<Option<UserDoc>>> {
        let store = self.clone();
        let scope = owner.clone();
        Ok(spawn_requery_task(
            self.snapshot_capacity,
            self.events.subscribe(),
            move |event| {
                matches!(event, StoreEvent::UserWritten { owner } if *owner == scope)
            },
            move || {
                let store = store.clone();
                let owner = owner.clone();
                async move { Ok(store.user(&owner)) }
            },
        ))
    }

    async fn upsert_entry(&self, key: &EntryKey, values: EntryValues) -> Result<()> {
        let entry = EntryDoc {
            values,
            month: key.month_key().to_string(),
            date: key.date_key.clone(),
            category: key.category,
            updated_at: Some(bson::DateTime::now()),
        };
        self.entries.insert(
            (key.category, key.doc_id()),
            StoredEntry {
                owner: key.owner.clone(),
                entry,
            },
        );
        let _ = self.events.send(StoreEvent::EntryWritten {
            owner: key.owner.clone(),
            category: key.category,
            date_key: key.date_key.clone(),
        });
        Ok(())
    }

    async fn delete_entry(&self, key: &EntryKey) -> Result<()> {
        let removed = self.entries.remove(&(key.category, key.doc_id())).is_some();
        if removed {
            let _ = self.events.send(StoreEvent::EntryDeleted {
                owner: key.owner.clone(),
                category: key.category,
                date_key: key.date_key.clone(),
            });
        }
        Ok(())
    }

    async fn set_primary_goal(&self, owner: &OwnerId, goal: GoalKey) -> Result<()> {
        let mut user = self.users.entry(owner.clone()).or_insert_with(|| UserDoc {
            preferences: Preferences::default(),
            profile: None,
        });
        user.preferences.primary_goal = goal;
        drop(user);
        let _ = self.events.send(StoreEvent::UserWritten {
            owner: owner.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::docs::Scalar;

    fn key(owner: &str, date: &str) -> EntryKey {
        EntryKey::new(OwnerId::from(owner), Category::Water, date)
    }

    fn glasses(n: f64) -> EntryValues {
        let mut values = EntryValues::new();
        values.insert("glasses".into(), Scalar::Number(n));
        values
    }

    #[tokio::test]
    async fn test_upsert_then_delete() {
        let store = MemoryStore::new();
        let key = key("u1", "2025-08-06");

        store.upsert_entry(&key, glasses(6.0)).await.expect("upsert");
        let entry = store.entry(&key).expect("entry present");
        assert_eq!(entry.month, "2025-08");
        assert_eq!(entry.values["glasses"], Scalar::Number(6.0));
        assert!(entry.updated_at.is_some());

        store.delete_entry(&key).await.expect("delete");
        assert!(store.entry(&key).is_none());

        // Deleting an absent document is a no-op.
        store.delete_entry(&key).await.expect("delete absent");
    }

    #[tokio::test]
    async fn test_month_subscription_replaces_snapshots() {
        let store = MemoryStore::new();
        let query = MonthQuery {
            owner: OwnerId::from("u1"),
            category: Category::Water,
            month: "2025-08".into(),
        };

        let mut sub = store.subscribe_month(query).await.expect("subscribe");
        assert_eq!(sub.snapshots.recv().await, Some(vec![]));

        store
            .upsert_entry(&key("u1", "2025-08-06"), glasses(6.0))
            .await
            .expect("upsert");
        let snapshot = sub.snapshots.recv().await.expect("snapshot");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].date, "2025-08-06");

        // A different owner's write does not disturb the window.
        store
            .upsert_entry(&key("u2", "2025-08-07"), glasses(2.0))
            .await
            .expect("upsert other owner");
        // A different month's write does not disturb the window either.
        store
            .upsert_entry(&key("u1", "2025-09-01"), glasses(2.0))
            .await
            .expect("upsert other month");

        store
            .upsert_entry(&key("u1", "2025-08-07"), glasses(3.0))
            .await
            .expect("second upsert");
        let snapshot = sub.snapshots.recv().await.expect("snapshot");
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|e| e.month == "2025-08"));
    }

    #[tokio::test]
    async fn test_goal_subscription_reflects_set_primary_goal() {
        let store = MemoryStore::new();
        let owner = OwnerId::from("u1");

        let mut sub = store
            .subscribe_user(owner.clone())
            .await
            .expect("subscribe");
        assert_eq!(sub.snapshots.recv().await, Some(None));

        store
            .set_primary_goal(&owner, GoalKey::HydrateMore)
            .await
            .expect("set goal");
        let user = sub.snapshots.recv().await.expect("snapshot").expect("doc");
        assert_eq!(user.preferences.primary_goal, GoalKey::HydrateMore);
    }
}
