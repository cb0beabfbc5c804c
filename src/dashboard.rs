//! Feedback dashboard: the data source behind the per-category coaching
//!
//! For an owner, the dashboard holds one subscription to the preference
//! document and one previous-day entry subscription per category, all
//! independent and concurrent. Every update re-runs the pure feedback
//! rules and publishes a fresh board. Teardown cancels the collected
//! handles together; an individual cancellation failure is logged and
//! never re-thrown.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::calendar::date_key;
use crate::category::{Category, GoalKey};
use crate::feedback::{classify, signed_out_feedback, Feedback};
use crate::store::docs::{EntryDoc, EntryKey, EntryValues, UserDoc};
use crate::store::remote::RemoteStore;
use crate::sync::Teardown;
use crate::types::{OwnerId, Result};

/// Current goal plus the per-category feedback board
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub goal: GoalKey,
    pub feedback: BTreeMap<Category, Feedback>,
}

impl DashboardState {
    fn signed_out() -> Self {
        Self {
            goal: GoalKey::default(),
            feedback: signed_out_feedback(),
        }
    }

    fn compute(goal: GoalKey, entries: &BTreeMap<Category, Option<EntryValues>>) -> Self {
        let feedback = Category::ALL
            .into_iter()
            .map(|category| {
                let values = entries.get(&category).and_then(|v| v.as_ref());
                (category, classify(category, goal, values))
            })
            .collect();
        Self { goal, feedback }
    }
}

enum BoardEvent {
    Goal(Option<UserDoc>),
    Entry(Category, Option<EntryDoc>),
}

/// Live feedback board for one owner (or the signed-out placeholder)
pub struct Dashboard {
    state: watch::Receiver<DashboardState>,
    teardown: Teardown,
}

impl Dashboard {
    /// Open the board for yesterday relative to `today`.
    ///
    /// Without an owner the board holds the signed-out placeholder and no
    /// subscriptions are opened. Re-open on owner change.
    pub async fn open(
        store: Arc<dyn RemoteStore>,
        owner: Option<OwnerId>,
        today: NaiveDate,
    ) -> Result<Self> {
        let Some(owner) = owner else {
            let (_, state) = watch::channel(DashboardState::signed_out());
            return Ok(Self {
                state,
                teardown: Teardown::default(),
            });
        };

        let yesterday = date_key(today - Duration::days(1));
        let mut teardown = Teardown::default();
        let (event_tx, event_rx) = mpsc::channel::<BoardEvent>(16);

        let mut user_sub = store.subscribe_user(owner.clone()).await?;
        teardown.push("users", user_sub.cancel.clone());
        let goal_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(user) = user_sub.snapshots.recv().await {
                if goal_tx.send(BoardEvent::Goal(user)).await.is_err() {
                    break;
                }
            }
        });

        for category in Category::ALL {
            let key = EntryKey::new(owner.clone(), category, yesterday.clone());
            let mut entry_sub = store.subscribe_entry(key).await?;
            teardown.push(category.collection(), entry_sub.cancel.clone());
            let entry_tx = event_tx.clone();
            tokio::spawn(async move {
                while let Some(entry) = entry_sub.snapshots.recv().await {
                    if entry_tx
                        .send(BoardEvent::Entry(category, entry))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
        drop(event_tx);

        let initial: BTreeMap<Category, Option<EntryValues>> = Category::ALL
            .into_iter()
            .map(|category| (category, None))
            .collect();
        let (state_tx, state_rx) = watch::channel(DashboardState::compute(
            GoalKey::default(),
            &initial,
        ));
        tokio::spawn(run_board(event_rx, state_tx, initial));

        Ok(Self {
            state: state_rx,
            teardown,
        })
    }

    /// Watch handle on the board state
    pub fn state(&self) -> watch::Receiver<DashboardState> {
        self.state.clone()
    }

    /// Clone of the current board state
    pub fn current(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Cancel every subscription. Individual failures are logged, never
    /// returned.
    pub fn close(self) {
        self.teardown.cancel_all();
    }
}

async fn run_board(
    mut events: mpsc::Receiver<BoardEvent>,
    state_tx: watch::Sender<DashboardState>,
    mut entries: BTreeMap<Category, Option<EntryValues>>,
) {
    let mut goal = GoalKey::default();
    while let Some(event) = events.recv().await {
        match event {
            BoardEvent::Goal(user) => {
                goal = user
                    .map(|u| u.preferences.primary_goal)
                    .unwrap_or_default();
            }
            BoardEvent::Entry(category, entry) => {
                entries.insert(category, entry.map(|e| e.values));
            }
        }
        if state_tx
            .send(DashboardState::compute(goal, &entries))
            .is_err()
        {
            break;
        }
    }
    debug!("feedback board ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Tone;
    use crate::store::docs::Scalar;
    use crate::store::memory::MemoryStore;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<DashboardState>, predicate: F) -> DashboardState
    where
        F: Fn(&DashboardState) -> bool,
    {
        for _ in 0..20 {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            timeout(StdDuration::from_secs(1), rx.changed())
                .await
                .expect("board update timed out")
                .expect("board channel closed");
        }
        panic!("board never reached the expected state");
    }

    #[tokio::test]
    async fn test_signed_out_board_is_static_placeholder() {
        let store = Arc::new(MemoryStore::new());
        let board = Dashboard::open(store, None, date(2025, 8, 7))
            .await
            .expect("open");
        let state = board.current();
        assert_eq!(state.goal, GoalKey::General);
        assert!(state.feedback.values().all(|f| f.tone == Tone::Neutral));
        board.close();
    }

    #[tokio::test]
    async fn test_board_reflects_yesterdays_entries_and_goal() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::from("u1");
        let today = date(2025, 8, 7);

        // Yesterday's water: 12 glasses.
        let mut values = EntryValues::new();
        values.insert("glasses".into(), Scalar::Number(12.0));
        store
            .upsert_entry(
                &EntryKey::new(owner.clone(), Category::Water, "2025-08-06"),
                values,
            )
            .await
            .expect("upsert water");

        let board = Dashboard::open(
            Arc::clone(&store) as Arc<dyn RemoteStore>,
            Some(owner.clone()),
            today,
        )
        .await
        .expect("open");
        let mut rx = board.state();

        let state = wait_for(&mut rx, |s| {
            s.feedback[&Category::Water].tone == Tone::Positive
        })
        .await;
        assert!(state.feedback[&Category::Water].message.contains("12"));
        // Untouched categories still encourage logging.
        assert_eq!(state.feedback[&Category::Diet].tone, Tone::Encourage);

        // Switching the goal re-runs the rules: 12 glasses still beats the
        // hydrate_more target of 10.
        store
            .set_primary_goal(&owner, GoalKey::HydrateMore)
            .await
            .expect("set goal");
        let state = wait_for(&mut rx, |s| s.goal == GoalKey::HydrateMore).await;
        assert_eq!(state.feedback[&Category::Water].tone, Tone::Positive);

        board.close();
    }

    #[tokio::test]
    async fn test_todays_entry_does_not_feed_the_board() {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::from("u1");
        let today = date(2025, 8, 7);

        let mut values = EntryValues::new();
        values.insert("hours".into(), Scalar::Number(8.0));
        store
            .upsert_entry(
                &EntryKey::new(owner.clone(), Category::Sleep, "2025-08-07"),
                values,
            )
            .await
            .expect("upsert today");

        let board = Dashboard::open(Arc::clone(&store) as Arc<dyn RemoteStore>, Some(owner), today)
            .await
            .expect("open");
        // The board watches yesterday only; today's entry leaves sleep
        // unlogged from its point of view.
        let state = board.current();
        assert_eq!(state.feedback[&Category::Sleep].tone, Tone::Encourage);
        board.close();
    }
}
