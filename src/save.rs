//! Save reconciliation: decide upsert vs. delete from form values
//!
//! An entry only deserves to exist while it says something. Per field kind:
//! a numeric is meaningful when its trimmed text parses to a finite nonzero
//! number, a toggle when it is on, a choice when it differs from its
//! declared default. The entry is meaningful when any field is. A
//! meaningful form upserts the computed payload; anything else deletes the
//! document for that date (a no-op when absent).

use tracing::debug;

use crate::schema::{number_to_display, FieldDef, FieldKind};
use crate::store::docs::{EntryKey, EntryValues, Scalar};
use crate::store::remote::RemoteStore;
use crate::types::{DaybookError, Result};

/// Outcome of reconciling one form against the meaningful-data predicate
#[derive(Debug, Clone, PartialEq)]
pub enum SavePlan {
    /// Write this payload; numeric fields carry parsed numbers
    Upsert(EntryValues),
    /// Remove any stored document for the date
    Delete,
}

/// What a committed save did to the stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    Upserted,
    Deleted,
}

/// Compute the save plan for one form. Pure.
///
/// Re-running with identical values always yields the same plan and
/// payload, which is what makes saving idempotent end to end.
pub fn reconcile(fields: &[FieldDef], values: &EntryValues) -> SavePlan {
    let mut payload = EntryValues::new();
    let mut meaningful = false;

    for field in fields {
        let raw = values.get(field.key);
        match &field.kind {
            FieldKind::Numeric { .. } => {
                let text = match raw {
                    Some(Scalar::Text(t)) => t.trim().to_string(),
                    Some(Scalar::Number(n)) => number_to_display(*n),
                    _ => String::new(),
                };
                if text.is_empty() {
                    continue;
                }
                // Unparseable text is omitted from the payload entirely.
                if let Ok(parsed) = text.parse::<f64>() {
                    if parsed.is_finite() {
                        payload.insert(field.key.to_string(), Scalar::Number(parsed));
                        if parsed != 0.0 {
                            meaningful = true;
                        }
                    }
                }
            }
            FieldKind::Boolean { .. } => {
                let on = raw.map(Scalar::coerce_bool).unwrap_or(false);
                payload.insert(field.key.to_string(), Scalar::Bool(on));
                if on {
                    meaningful = true;
                }
            }
            FieldKind::Choice { default, .. } => {
                let value = raw.cloned().unwrap_or_else(|| default.clone());
                if value != *default {
                    meaningful = true;
                }
                payload.insert(field.key.to_string(), value);
            }
        }
    }

    if meaningful {
        SavePlan::Upsert(payload)
    } else {
        SavePlan::Delete
    }
}

/// Apply a save plan to the store. Last write wins; concurrent editors of
/// the same date are not detected or merged.
pub async fn commit(store: &dyn RemoteStore, key: &EntryKey, plan: SavePlan) -> Result<SaveAction> {
    match plan {
        SavePlan::Upsert(values) => {
            debug!(path = %key.path(), "upserting entry");
            store
                .upsert_entry(key, values)
                .await
                .map_err(|e| DaybookError::Save(e.to_string()))?;
            Ok(SaveAction::Upserted)
        }
        SavePlan::Delete => {
            debug!(path = %key.path(), "deleting entry");
            store
                .delete_entry(key)
                .await
                .map_err(|e| DaybookError::Save(e.to_string()))?;
            Ok(SaveAction::Deleted)
        }
    }
}
