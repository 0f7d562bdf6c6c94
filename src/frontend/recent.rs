//! Recently viewed items, capped per item type.

use rusqlite::{params, Row};
use tracing::debug;

use super::FrontendDb;
use crate::clock::{format_timestamp, parse_timestamp};
use crate::entities::RecentItemRecord;
use crate::error::Result;

/// Records kept per item type; older ones are evicted on insert.
pub const RECENT_ITEMS_CAP: usize = 50;

/// Default number of records returned by [`RecentItems::get`].
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Recent-items helpers bound to a frontend database.
pub struct RecentItems<'a> {
  ctx: &'a FrontendDb,
}

impl<'a> RecentItems<'a> {
  pub(super) fn new(ctx: &'a FrontendDb) -> Self {
    Self { ctx }
  }

  /// Record a view of `(item_type, item_id)`, moving it to the front.
  ///
  /// The remove, insert and eviction run in one transaction, so concurrent
  /// callers never push a type past [`RECENT_ITEMS_CAP`].
  pub fn add(&self, item_type: &str, item_id: i64) -> Result<()> {
    let now = format_timestamp(self.ctx.clock.now());

    self.ctx.db.transaction(|tx| {
      tx.execute(
        "DELETE FROM recent_items WHERE item_type = ? AND item_id = ?",
        params![item_type, item_id],
      )?;

      tx.execute(
        "INSERT INTO recent_items (item_type, item_id, viewed_at) VALUES (?, ?, ?)",
        params![item_type, item_id, now],
      )?;

      let evicted = tx.execute(
        "DELETE FROM recent_items
         WHERE item_type = ?1 AND id NOT IN (
           SELECT id FROM recent_items
           WHERE item_type = ?1
           ORDER BY viewed_at DESC, id DESC
           LIMIT ?2
         )",
        params![item_type, RECENT_ITEMS_CAP as i64],
      )?;
      if evicted > 0 {
        debug!(item_type, evicted, "evicted old recent items");
      }

      Ok(())
    })
  }

  /// Up to `limit` (default 10) most recent records for `item_type`, newest first.
  pub fn get(&self, item_type: &str, limit: Option<usize>) -> Result<Vec<RecentItemRecord>> {
    let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT) as i64;

    self.ctx.db.with_conn(|conn| {
      let mut stmt = conn.prepare(
        "SELECT id, item_type, item_id, viewed_at FROM recent_items
         WHERE item_type = ?
         ORDER BY viewed_at DESC, id DESC
         LIMIT ?",
      )?;
      let raws = stmt
        .query_map(params![item_type, limit], RawRecent::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      raws.into_iter().map(RawRecent::into_record).collect()
    })
  }

  /// Remove the history of one type, or of every type when `item_type` is `None`.
  pub fn clear(&self, item_type: Option<&str>) -> Result<usize> {
    match item_type {
      Some(item_type) => self.ctx.db.with_conn(|conn| {
        Ok(conn.execute(
          "DELETE FROM recent_items WHERE item_type = ?",
          params![item_type],
        )?)
      }),
      None => self.ctx.db.clear_table("recent_items"),
    }
  }

  /// Number of records held for `item_type`.
  pub fn count(&self, item_type: &str) -> Result<usize> {
    self.ctx.db.with_conn(|conn| {
      let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM recent_items WHERE item_type = ?",
        params![item_type],
        |row| row.get(0),
      )?;
      Ok(n as usize)
    })
  }
}

struct RawRecent {
  id: i64,
  item_type: String,
  item_id: i64,
  viewed_at: String,
}

impl RawRecent {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      item_type: row.get(1)?,
      item_id: row.get(2)?,
      viewed_at: row.get(3)?,
    })
  }

  fn into_record(self) -> Result<RecentItemRecord> {
    Ok(RecentItemRecord {
      id: self.id,
      item_type: self.item_type,
      item_id: self.item_id,
      viewed_at: parse_timestamp(&self.viewed_at)?,
    })
  }
}
