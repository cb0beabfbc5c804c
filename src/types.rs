//! Error types and core identifiers for Daybook

use serde::{Deserialize, Serialize};

/// Main error type for Daybook operations
#[derive(Debug, thiserror::Error)]
pub enum DaybookError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Save failed: {0}")]
    Save(String),

    #[error("Cancellation failed: {0}")]
    Cancellation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<mongodb::error::Error> for DaybookError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for DaybookError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode error: {}", err))
    }
}

impl From<bson::de::Error> for DaybookError {
    fn from(err: bson::de::Error) -> Self {
        Self::Database(format!("BSON decode error: {}", err))
    }
}

/// Result type alias for Daybook operations
pub type Result<T> = std::result::Result<T, DaybookError>;

/// Opaque identifier for the authenticated owner of a set of records.
///
/// The engine never inspects it; identity management lives with the
/// embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaybookError::Save("network down".into());
        assert_eq!(err.to_string(), "Save failed: network down");
    }

    #[test]
    fn test_owner_id_roundtrip() {
        let owner = OwnerId::from("user-123");
        assert_eq!(owner.as_str(), "user-123");
        assert_eq!(owner.to_string(), "user-123");
    }
}
