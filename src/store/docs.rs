//! Wire document shapes shared by every store backend
//!
//! Field names follow the stored convention (`values`, `month`, `date`,
//! `category`, `updatedAt`, `preferences.primaryGoal`), so the same
//! documents can be read by other clients of the collection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{Category, GoalKey};
use crate::types::OwnerId;

/// A single field value, both on the wire and in form state.
///
/// Untagged: serializes as a plain JSON/BSON boolean, number, or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric reading of a value: finite numbers pass through, numeric
    /// strings are parsed, everything else reads as zero.
    pub fn coerce_number(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_finite() => *n,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return 0.0;
                }
                match trimmed.parse::<f64>() {
                    Ok(parsed) if parsed.is_finite() => parsed,
                    _ => 0.0,
                }
            }
            _ => 0.0,
        }
    }

    /// Truthiness of a value: false for zero, empty text, and `false`.
    pub fn coerce_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }
}

/// Field values of one entry, keyed by field key.
pub type EntryValues = BTreeMap<String, Scalar>;

/// One day's entry for one category, as stored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDoc {
    #[serde(default)]
    pub values: EntryValues,

    /// `"YYYY-MM"` month window the entry belongs to
    pub month: String,

    /// `"YYYY-MM-DD"` day the entry is recorded for
    pub date: String,

    pub category: Category,

    /// Server-assigned write timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<bson::DateTime>,
}

/// Per-owner preference document.
///
/// Only `preferences.primaryGoal` is read by the engine; `profile.*` passes
/// through untouched for the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub primary_goal: GoalKey,
}

/// Identity of one entry document: `(owner, category, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub owner: OwnerId,
    pub category: Category,
    pub date_key: String,
}

impl EntryKey {
    pub fn new(owner: OwnerId, category: Category, date_key: impl Into<String>) -> Self {
        Self {
            owner,
            category,
            date_key: date_key.into(),
        }
    }

    /// Document id within the category collection
    pub fn doc_id(&self) -> String {
        format!("{}:{}", self.owner, self.date_key)
    }

    /// `"YYYY-MM"` month window the keyed date falls in
    pub fn month_key(&self) -> &str {
        self.date_key.get(..7).unwrap_or(&self.date_key)
    }

    /// Human-readable key path, used in logs
    pub fn path(&self) -> String {
        format!(
            "owners/{}/{}/{}",
            self.owner,
            self.category.collection(),
            self.date_key
        )
    }
}

/// Month-window query: all entries of one `(owner, category)` whose `month`
/// field equals the requested month key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthQuery {
    pub owner: OwnerId,
    pub category: Category,
    pub month: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_coerce_number() {
        assert_eq!(Scalar::Number(6.0).coerce_number(), 6.0);
        assert_eq!(Scalar::Text(" 12 ".into()).coerce_number(), 12.0);
        assert_eq!(Scalar::Text("".into()).coerce_number(), 0.0);
        assert_eq!(Scalar::Text("abc".into()).coerce_number(), 0.0);
        assert_eq!(Scalar::Bool(true).coerce_number(), 0.0);
        assert_eq!(Scalar::Number(f64::NAN).coerce_number(), 0.0);
    }

    #[test]
    fn test_scalar_coerce_bool() {
        assert!(Scalar::Bool(true).coerce_bool());
        assert!(!Scalar::Bool(false).coerce_bool());
        assert!(Scalar::Number(3.0).coerce_bool());
        assert!(!Scalar::Number(0.0).coerce_bool());
        assert!(Scalar::Text("x".into()).coerce_bool());
        assert!(!Scalar::Text("".into()).coerce_bool());
    }

    #[test]
    fn test_scalar_untagged_serde() {
        let json = serde_json::json!({ "glasses": 6.0, "done": true, "note": "ok" });
        let values: EntryValues = serde_json::from_value(json).expect("decode");
        assert_eq!(values["glasses"], Scalar::Number(6.0));
        assert_eq!(values["done"], Scalar::Bool(true));
        assert_eq!(values["note"], Scalar::Text("ok".into()));
    }

    #[test]
    fn test_entry_key_paths() {
        let key = EntryKey::new(OwnerId::from("u1"), Category::Water, "2024-02-29");
        assert_eq!(key.doc_id(), "u1:2024-02-29");
        assert_eq!(key.month_key(), "2024-02");
        assert_eq!(key.path(), "owners/u1/waterLogs/2024-02-29");
    }

    #[test]
    fn test_entry_doc_wire_names() {
        let doc = EntryDoc {
            values: EntryValues::new(),
            month: "2025-08".into(),
            date: "2025-08-06".into(),
            category: Category::Diet,
            updated_at: None,
        };
        let json = serde_json::to_value(&doc).expect("encode");
        assert_eq!(json["category"], "diet");
        assert_eq!(json["month"], "2025-08");
        assert!(json.get("updatedAt").is_none());
    }
}
