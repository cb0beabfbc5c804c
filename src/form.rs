//! Form state and the edit/save session state machine
//!
//! `FormState` holds the editable values for one entry, derived from a
//! category's field schema. `FormSession` wraps it in the session state
//! machine: Idle → Editing → Saving → back to Idle on success, or back to
//! Editing with a recoverable error and the values intact on failure.

use chrono::NaiveDate;
use tracing::warn;

use crate::calendar::date_key;
use crate::category::Category;
use crate::save::{commit, reconcile, SaveAction};
use crate::schema::{FieldDef, FieldKind};
use crate::store::docs::{EntryKey, EntryValues, Scalar};
use crate::store::remote::RemoteStore;
use crate::types::OwnerId;

/// Editable values for one entry, always schema-complete
#[derive(Debug, Clone)]
pub struct FormState {
    fields: &'static [FieldDef],
    values: EntryValues,
}

/// A field plus its current value, for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWidget<'a> {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: &'a FieldKind,
    pub value: Scalar,
}

impl FormState {
    pub fn new(fields: &'static [FieldDef]) -> Self {
        let mut state = Self {
            fields,
            values: EntryValues::new(),
        };
        state.reset(None);
        state
    }

    pub fn for_category(category: Category) -> Self {
        Self::new(category.fields())
    }

    /// Restore every field to its schema default, then overlay a stored
    /// entry's values coerced per kind (numbers become display strings,
    /// toggle values become booleans, choices pass through).
    pub fn reset(&mut self, seed: Option<&EntryValues>) {
        self.values = self
            .fields
            .iter()
            .map(|field| (field.key.to_string(), field.kind.default_value()))
            .collect();

        if let Some(seed) = seed {
            for field in self.fields {
                if let Some(stored) = seed.get(field.key) {
                    self.values
                        .insert(field.key.to_string(), field.kind.coerce_stored(stored));
                }
            }
        }
    }

    /// Apply one edit. Returns false when the key is unknown or the value
    /// is rejected by the field kind (a non-digit numeric keystroke, an
    /// undeclared choice value), leaving the state untouched.
    pub fn set_value(&mut self, key: &str, value: Scalar) -> bool {
        let Some(field) = self.fields.iter().find(|f| f.key == key) else {
            return false;
        };
        if !field.kind.accepts(&value) {
            return false;
        }
        self.values.insert(key.to_string(), value);
        true
    }

    pub fn current_values(&self) -> &EntryValues {
        &self.values
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    /// Widget descriptors in schema order
    pub fn widgets(&self) -> Vec<FieldWidget<'_>> {
        self.fields
            .iter()
            .map(|field| FieldWidget {
                key: field.key,
                label: field.label,
                kind: &field.kind,
                value: self
                    .values
                    .get(field.key)
                    .cloned()
                    .unwrap_or_else(|| field.kind.default_value()),
            })
            .collect()
    }
}

/// Session phase; saving is single-flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Editing,
    Saving,
}

/// Result of a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The plan was committed; the session is Idle again
    Saved(SaveAction),
    /// A save is already in flight; the request was dropped
    InFlight,
    /// Nothing is being edited
    NotEditing,
    /// The write failed; the session is back in Editing with the values
    /// intact and an error message attached
    Failed,
}

/// One entry's edit/save session
#[derive(Debug)]
pub struct FormSession {
    category: Category,
    form: FormState,
    phase: SessionPhase,
    date_key: Option<String>,
    error: Option<String>,
}

impl FormSession {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            form: FormState::for_category(category),
            phase: SessionPhase::Idle,
            date_key: None,
            error: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Date being edited, when a session is open
    pub fn date_key(&self) -> Option<&str> {
        self.date_key.as_deref()
    }

    /// Error from the last failed save, cleared on the next open or save
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    /// Begin editing a date, seeded from its current entry (or schema
    /// defaults when none exists). Ignored while a save is in flight.
    pub fn open(&mut self, date: NaiveDate, seed: Option<&EntryValues>) {
        if self.phase == SessionPhase::Saving {
            return;
        }
        self.date_key = Some(date_key(date));
        self.form.reset(seed);
        self.error = None;
        self.phase = SessionPhase::Editing;
    }

    /// Apply one edit; only accepted while editing
    pub fn set_value(&mut self, key: &str, value: Scalar) -> bool {
        if self.phase != SessionPhase::Editing {
            return false;
        }
        self.form.set_value(key, value)
    }

    /// Abandon the session without saving. Ignored while a save is in
    /// flight.
    pub fn close(&mut self) {
        if self.phase == SessionPhase::Saving {
            return;
        }
        self.phase = SessionPhase::Idle;
        self.date_key = None;
        self.error = None;
        self.form.reset(None);
    }

    /// Reconcile and commit the session's values.
    ///
    /// Single-flight: a request while Saving is dropped, not queued. On
    /// success the session returns to Idle; on failure it returns to
    /// Editing with the values preserved so the user can retry.
    pub async fn save(&mut self, store: &dyn RemoteStore, owner: &OwnerId) -> SaveOutcome {
        match self.phase {
            SessionPhase::Saving => return SaveOutcome::InFlight,
            SessionPhase::Idle => return SaveOutcome::NotEditing,
            SessionPhase::Editing => {}
        }
        let Some(date_key) = self.date_key.clone() else {
            return SaveOutcome::NotEditing;
        };

        self.phase = SessionPhase::Saving;
        self.error = None;

        let plan = reconcile(self.category.fields(), self.form.current_values());
        let key = EntryKey::new(owner.clone(), self.category, date_key);

        match commit(store, &key, plan).await {
            Ok(action) => {
                self.phase = SessionPhase::Idle;
                self.date_key = None;
                self.form.reset(None);
                SaveOutcome::Saved(action)
            }
            Err(e) => {
                warn!(path = %key.path(), error = %e, "entry save failed");
                self.error = Some(format!("Could not save your entry. {}", e));
                self.phase = SessionPhase::Editing;
                SaveOutcome::Failed
            }
        }
    }
}
