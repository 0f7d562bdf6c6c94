//! Settings: one value per unique key.

use rusqlite::{params, OptionalExtension, Row};
use serde::{de::DeserializeOwned, Serialize};

use super::FrontendDb;
use crate::clock::{format_timestamp, parse_timestamp};
use crate::entities::SettingRecord;
use crate::error::Result;
use crate::payload;

/// Settings helpers bound to a frontend database.
pub struct Settings<'a> {
  ctx: &'a FrontendDb,
}

impl<'a> Settings<'a> {
  pub(super) fn new(ctx: &'a FrontendDb) -> Self {
    Self { ctx }
  }

  /// Value stored for `key`, decoded as `T`. `None` if the key is unknown.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    match self.get_record(key)? {
      Some(record) => Ok(Some(serde_json::from_value(record.value)?)),
      None => Ok(None),
    }
  }

  pub fn get_record(&self, key: &str) -> Result<Option<SettingRecord>> {
    self.ctx.db.with_conn(|conn| {
      let raw = conn
        .query_row(
          "SELECT id, key, value, updated_at FROM settings WHERE key = ?",
          params![key],
          RawSetting::from_row,
        )
        .optional()?;
      raw.map(RawSetting::into_record).transpose()
    })
  }

  /// Insert or overwrite the value for `key`.
  pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
    let value = payload::setting_value(value)?;
    let encoded = serde_json::to_string(&value)?;
    let now = format_timestamp(self.ctx.clock.now());

    self.ctx.db.transaction(|tx| {
      let existing: Option<i64> = tx
        .query_row(
          "SELECT id FROM settings WHERE key = ?",
          params![key],
          |row| row.get(0),
        )
        .optional()?;

      match existing {
        Some(id) => {
          tx.execute(
            "UPDATE settings SET value = ?, updated_at = ? WHERE id = ?",
            params![encoded, now, id],
          )?;
        }
        None => {
          tx.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, encoded, now],
          )?;
        }
      }
      Ok(())
    })
  }

  /// Remove `key`; a no-op when absent.
  pub fn delete(&self, key: &str) -> Result<()> {
    self.ctx.db.with_conn(|conn| {
      conn.execute("DELETE FROM settings WHERE key = ?", params![key])?;
      Ok(())
    })
  }

  /// Every setting, ordered by key.
  pub fn list(&self) -> Result<Vec<SettingRecord>> {
    self.ctx.db.with_conn(|conn| {
      let mut stmt =
        conn.prepare("SELECT id, key, value, updated_at FROM settings ORDER BY key")?;
      let raws = stmt
        .query_map([], RawSetting::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      raws.into_iter().map(RawSetting::into_record).collect()
    })
  }
}

struct RawSetting {
  id: i64,
  key: String,
  value: String,
  updated_at: String,
}

impl RawSetting {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      key: row.get(1)?,
      value: row.get(2)?,
      updated_at: row.get(3)?,
    })
  }

  fn into_record(self) -> Result<SettingRecord> {
    Ok(SettingRecord {
      id: self.id,
      key: self.key,
      value: serde_json::from_str(&self.value)?,
      updated_at: parse_timestamp(&self.updated_at)?,
    })
  }
}
