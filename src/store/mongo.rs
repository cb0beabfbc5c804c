//! MongoDB store backend
//!
//! One collection per category (`waterLogs`, `dietLogs`, `exerciseLogs`,
//! `sleepLogs`) plus a `users` collection for preference documents. Entry
//! documents are keyed `"{ownerId}:{dateKey}"` and carry `ownerId` and
//! `month` fields for the month-window equality filter; `updatedAt` is
//! assigned server-side on every merge write.
//!
//! Subscriptions re-run their query when this process writes to the scoped
//! documents. Writes from other processes become visible on the next
//! re-query; cross-process push freshness is a transport concern outside
//! the engine's contract.

use bson::doc;
use futures_util::StreamExt;
use mongodb::options::UpdateOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::category::{Category, GoalKey};
use crate::config::StoreConfig;
use crate::store::docs::{EntryDoc, EntryKey, EntryValues, MonthQuery, UserDoc};
use crate::store::remote::{spawn_requery_task, RemoteStore, StoreEvent, Subscription};
use crate::types::{DaybookError, OwnerId, Result};

/// Entry document as stored in a category collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    #[serde(rename = "_id")]
    id: String,
    owner_id: OwnerId,
    #[serde(flatten)]
    entry: EntryDoc,
}

/// Preference document as stored in the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(rename = "_id")]
    id: OwnerId,
    #[serde(flatten)]
    user: UserDoc,
}

/// MongoDB-backed document store
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
    events: broadcast::Sender<StoreEvent>,
    snapshot_capacity: usize,
}

impl MongoStore {
    /// Connect, verify with a ping, and make sure indexes exist
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        info!("Connecting to MongoDB at {}", config.uri);

        // Bounded server selection so an unreachable MongoDB fails fast
        // instead of hanging the caller.
        let timeout = config.connect_timeout_ms;
        let timeout_uri = if config.uri.contains('?') {
            format!(
                "{}&serverSelectionTimeoutMS={}&connectTimeoutMS={}",
                config.uri, timeout, timeout
            )
        } else {
            format!(
                "{}?serverSelectionTimeoutMS={}&connectTimeoutMS={}",
                config.uri, timeout, timeout
            )
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| DaybookError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(&config.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DaybookError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", config.db_name);

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let store = Self {
            client,
            db_name: config.db_name.clone(),
            events,
            snapshot_capacity: config.snapshot_capacity,
        };
        store.ensure_indexes().await;
        Ok(store)
    }

    fn entries(&self, category: Category) -> Collection<StoredEntry> {
        self.client
            .database(&self.db_name)
            .collection(category.collection())
    }

    fn users(&self) -> Collection<StoredUser> {
        self.client.database(&self.db_name).collection("users")
    }

    /// Create the month-window index on each category collection.
    /// Failures are logged and non-fatal; queries still work unindexed.
    async fn ensure_indexes(&self) {
        for category in Category::ALL {
            let index = IndexModel::builder()
                .keys(doc! { "ownerId": 1, "month": 1 })
                .build();
            if let Err(e) = self.entries(category).create_index(index).await {
                warn!(collection = category.collection(), "Failed to create index: {}", e);
            }
        }
    }

    async fn month_entries(&self, query: &MonthQuery) -> Result<Vec<EntryDoc>> {
        let filter = doc! {
            "ownerId": query.owner.as_str(),
            "month": &query.month,
        };
        let cursor = self
            .entries(query.category)
            .find(filter)
            .sort(doc! { "date": 1 })
            .await
            .map_err(|e| DaybookError::Database(format!("Month query failed: {}", e)))?;

        let entries: Vec<EntryDoc> = cursor
            .filter_map(|stored| async {
                match stored {
                    Ok(stored) => Some(stored.entry),
                    Err(e) => {
                        error!("Error reading entry document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(entries)
    }

    async fn find_entry(&self, key: &EntryKey) -> Result<Option<EntryDoc>> {
        let found = self
            .entries(key.category)
            .find_one(doc! { "_id": key.doc_id() })
            .await
            .map_err(|e| DaybookError::Database(format!("Entry lookup failed: {}", e)))?;
        Ok(found.map(|stored| stored.entry))
    }

    async fn find_user(&self, owner: &OwnerId) -> Result<Option<UserDoc>> {
        let found = self
            .users()
            .find_one(doc! { "_id": owner.as_str() })
            .await
            .map_err(|e| DaybookError::Database(format!("User lookup failed: {}", e)))?;
        Ok(found.map(|stored| stored.user))
    }
}

#[async_trait::async_trait]
impl RemoteStore for MongoStore {
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
                async move { store.month_entries(&query).await }
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
                async move { store.find_entry(&key).await }
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
                async move { store.find_user(&owner).await }
            },
        ))
    }

    async fn upsert_entry(&self, key: &EntryKey, values: EntryValues) -> Result<()> {
        let update = doc! {
            "$set": {
                "ownerId": key.owner.as_str(),
                "values": bson::to_bson(&values)?,
                "month": key.month_key(),
                "date": &key.date_key,
                "category": key.category.key(),
            },
            "$currentDate": { "updatedAt": true },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        self.entries(key.category)
            .update_one(doc! { "_id": key.doc_id() }, update)
            .with_options(options)
            .await
            .map_err(|e| DaybookError::Database(format!("Upsert failed: {}", e)))?;

        let _ = self.events.send(StoreEvent::EntryWritten {
            owner: key.owner.clone(),
            category: key.category,
            date_key: key.date_key.clone(),
        });
        Ok(())
    }

    async fn delete_entry(&self, key: &EntryKey) -> Result<()> {
        let result = self
            .entries(key.category)
            .delete_one(doc! { "_id": key.doc_id() })
            .await
            .map_err(|e| DaybookError::Database(format!("Delete failed: {}", e)))?;

        if result.deleted_count > 0 {
            let _ = self.events.send(StoreEvent::EntryDeleted {
                owner: key.owner.clone(),
                category: key.category,
                date_key: key.date_key.clone(),
            });
        }
        Ok(())
    }

    async fn set_primary_goal(&self, owner: &OwnerId, goal: GoalKey) -> Result<()> {
        let update = doc! {
            "$set": { "preferences.primaryGoal": goal.as_str() },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        self.users()
            .update_one(doc! { "_id": owner.as_str() }, update)
            .with_options(options)
            .await
            .map_err(|e| DaybookError::Database(format!("Goal update failed: {}", e)))?;

        let _ = self.events.send(StoreEvent::UserWritten {
            owner: owner.clone(),
        });
        Ok(())
    }
}
