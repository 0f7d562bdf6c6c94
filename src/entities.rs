//! Record shapes stored in the frontend and backend-mock databases.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::clock::truncate_to_stored;
use crate::error::Result;

// ============================================================================
// Frontend-local records
// ============================================================================

/// A user preference, unique by `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
  pub id: i64,
  pub key: String,
  pub value: Value,
  pub updated_at: DateTime<Utc>,
}

/// Unsaved work, keyed by `(draft_type, reference_id)` when a reference is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
  pub id: i64,
  /// e.g. "item", "document", "content"
  #[serde(rename = "type")]
  pub draft_type: String,
  /// Id of the backend entity being edited, if any
  pub reference_id: Option<i64>,
  pub content: Value,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl DraftRecord {
  /// Decode the content into a caller-defined shape.
  pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_value(self.content.clone())?)
  }
}

/// A cached payload with an absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
  pub id: i64,
  pub key: String,
  pub data: Value,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl CacheRecord {
  /// Compared at stored precision, so this agrees with the bulk sweep.
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.expires_at < truncate_to_stored(now)
  }
}

/// One entry in the per-type view history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentItemRecord {
  pub id: i64,
  pub item_type: String,
  pub item_id: i64,
  pub viewed_at: DateTime<Utc>,
}

// ============================================================================
// Backend-mock records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub price: i64,
  pub category: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
  pub id: i64,
  pub email: String,
  pub username: String,
  pub full_name: String,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

/// Shared content addressable by id or by its URL-friendly alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
  pub id: i64,
  pub alias: String,
  pub title: String,
  pub content: String,
  pub author: String,
  pub is_public: bool,
  pub view_count: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating shared content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContent {
  pub alias: String,
  pub title: String,
  pub content: String,
  pub author: String,
  #[serde(default = "default_public")]
  pub is_public: bool,
}

fn default_public() -> bool {
  true
}
