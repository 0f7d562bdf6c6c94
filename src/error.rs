//! Error type shared by the store and its helpers.

use std::path::PathBuf;

/// Errors raised by the persistence layer.
///
/// Lookups never fail for a missing record; they return `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The database file could not be opened or migrated.
  #[error("failed to initialize database at {}: {source}", path.display())]
  Init {
    path: PathBuf,
    #[source]
    source: rusqlite::Error,
  },

  #[error("failed to create data directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("database schema version {found} is newer than supported version {supported}")]
  SchemaTooNew { found: i64, supported: i64 },

  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  #[error("payload serialization failed: {0}")]
  Json(#[from] serde_json::Error),

  /// A payload was rejected before reaching the store.
  #[error("invalid payload: {0}")]
  InvalidPayload(String),

  #[error("table '{0}' does not exist in this database")]
  UnknownTable(String),

  #[error("ttl overflows the timestamp range")]
  InvalidTtl,

  #[error("failed to parse stored timestamp '{0}'")]
  Timestamp(String),

  #[error("database lock poisoned")]
  Poisoned,
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
