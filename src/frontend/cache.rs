//! Expiring cache entries.
//!
//! Expired entries are removed lazily when read, or in bulk by
//! [`Cache::clear_expired`], which runs on every frontend initialization.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::debug;

use super::FrontendDb;
use crate::clock::{format_timestamp, parse_timestamp};
use crate::entities::CacheRecord;
use crate::error::{Result, StoreError};
use crate::payload;

/// TTL used when the caller does not pass one.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache helpers bound to a frontend database.
pub struct Cache<'a> {
  ctx: &'a FrontendDb,
}

impl<'a> Cache<'a> {
  pub(super) fn new(ctx: &'a FrontendDb) -> Self {
    Self { ctx }
  }

  /// Cached data for `key`, decoded as `T`.
  ///
  /// An entry whose `expires_at` has passed is deleted and reported as absent.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    match self.get_record(key)? {
      Some(record) => Ok(Some(serde_json::from_value(record.data)?)),
      None => Ok(None),
    }
  }

  /// Like [`Cache::get`] but returns the whole record.
  pub fn get_record(&self, key: &str) -> Result<Option<CacheRecord>> {
    let now = self.ctx.clock.now();

    self.ctx.db.transaction(|tx| {
      let raw = tx
        .query_row(
          "SELECT id, key, data, expires_at, created_at FROM cache WHERE key = ?",
          params![key],
          RawCache::from_row,
        )
        .optional()?;

      let Some(record) = raw.map(RawCache::into_record).transpose()? else {
        return Ok(None);
      };

      if record.is_expired(now) {
        tx.execute("DELETE FROM cache WHERE id = ?", params![record.id])?;
        debug!(key, "expired cache entry removed on read");
        return Ok(None);
      }

      Ok(Some(record))
    })
  }

  /// Store `data` under `key` for `ttl` (one hour, or the configured default, if `None`).
  ///
  /// An existing entry is overwritten, including its `created_at`.
  pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Option<Duration>) -> Result<()> {
    let data = payload::structured("cache data", data)?;
    let encoded = serde_json::to_string(&data)?;
    let now = self.ctx.clock.now();
    let expires_at = expiry(now, ttl.unwrap_or(self.ctx.default_ttl))?;

    let now = format_timestamp(now);
    let expires_at = format_timestamp(expires_at);

    self.ctx.db.transaction(|tx| {
      let existing: Option<i64> = tx
        .query_row("SELECT id FROM cache WHERE key = ?", params![key], |row| {
          row.get(0)
        })
        .optional()?;

      match existing {
        Some(id) => {
          tx.execute(
            "UPDATE cache SET data = ?, expires_at = ?, created_at = ? WHERE id = ?",
            params![encoded, expires_at, now, id],
          )?;
        }
        None => {
          tx.execute(
            "INSERT INTO cache (key, data, expires_at, created_at) VALUES (?, ?, ?, ?)",
            params![key, encoded, expires_at, now],
          )?;
        }
      }
      Ok(())
    })
  }

  /// Delete every entry that expired strictly before now. Returns the number removed.
  pub fn clear_expired(&self) -> Result<usize> {
    let now = format_timestamp(self.ctx.clock.now());
    self.ctx.db.with_conn(|conn| {
      Ok(conn.execute("DELETE FROM cache WHERE expires_at < ?", params![now])?)
    })
  }

  /// Delete every entry. Returns the number removed.
  pub fn clear_all(&self) -> Result<usize> {
    self.ctx.db.clear_table("cache")
  }

  /// Number of stored entries, expired or not.
  pub fn len(&self) -> Result<usize> {
    self.ctx.db.count("cache")
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }
}

/// `now + ttl`, kept within the range where stored timestamps sort lexically.
fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
  let ttl = chrono::Duration::from_std(ttl).map_err(|_| StoreError::InvalidTtl)?;
  let expires_at = now.checked_add_signed(ttl).ok_or(StoreError::InvalidTtl)?;
  if expires_at.year() > 9999 {
    return Err(StoreError::InvalidTtl);
  }
  Ok(expires_at)
}

struct RawCache {
  id: i64,
  key: String,
  data: String,
  expires_at: String,
  created_at: String,
}

impl RawCache {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      key: row.get(1)?,
      data: row.get(2)?,
      expires_at: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  fn into_record(self) -> Result<CacheRecord> {
    Ok(CacheRecord {
      id: self.id,
      key: self.key,
      data: serde_json::from_str(&self.data)?,
      expires_at: parse_timestamp(&self.expires_at)?,
      created_at: parse_timestamp(&self.created_at)?,
    })
  }
}
