//! Remote document store client
//!
//! The engine talks to its store through the `RemoteStore` trait: live
//! query subscriptions delivering full replacement snapshots, merge
//! upserts, and deletes. Two backends implement it:
//!
//! - **MongoStore**: one collection per category plus a `users` collection,
//!   keyed `owners/{ownerId}/{collection}/{dateKey}` (document id
//!   `"{ownerId}:{dateKey}"`)
//! - **MemoryStore**: DashMap-backed, for tests and offline hosts

pub mod docs;
pub mod memory;
pub mod mongo;
pub mod remote;

pub use docs::{EntryDoc, EntryKey, EntryValues, MonthQuery, Preferences, Scalar, UserDoc};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use remote::{CancelHandle, RemoteStore, StoreEvent, Subscription};
