//! Configuration for the remote store client
//!
//! Environment variable handling follows the same shape as the rest of the
//! codebase: a struct with sensible defaults and a `from_env` constructor.

/// Remote store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// MongoDB connection URI
    pub uri: String,

    /// MongoDB database name
    pub db_name: String,

    /// Connection / server selection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Buffered snapshots per subscription before the producer blocks
    pub snapshot_capacity: usize,

    /// Buffered store events before slow subscribers start lagging
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            db_name: "daybook".to_string(),
            connect_timeout_ms: 3000,
            snapshot_capacity: 32,
            event_capacity: 256,
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            uri: std::env::var("DAYBOOK_MONGODB_URI").unwrap_or(defaults.uri),
            db_name: std::env::var("DAYBOOK_MONGODB_DB").unwrap_or(defaults.db_name),
            connect_timeout_ms: std::env::var("DAYBOOK_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.connect_timeout_ms),
            snapshot_capacity: std::env::var("DAYBOOK_SNAPSHOT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.snapshot_capacity),
            event_capacity: std::env::var("DAYBOOK_EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.event_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.db_name, "daybook");
        assert_eq!(config.connect_timeout_ms, 3000);
    }
}
