//! Backend-mock database: seeded items and users plus shared content.
//!
//! Stands in for a real backend during development. Lifecycle functions seed
//! empty tables, wipe them, or do both.

mod seed;

pub use seed::{SEED_ITEMS, SEED_USERS};

use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::clock::{format_timestamp, parse_timestamp, Clock, SystemClock};
use crate::entities::{ContentRecord, ItemRecord, NewContent, UserRecord};
use crate::error::{Result, StoreError};
use crate::store::{Database, DatabaseKind};

/// Rows inserted by one [`BackendDb::initialize`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
  pub items: usize,
  pub users: usize,
}

impl SeedReport {
  pub fn is_empty(&self) -> bool {
    self.items == 0 && self.users == 0
  }
}

/// Handle to the backend-mock database. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct BackendDb {
  db: Arc<Database>,
  clock: Arc<dyn Clock>,
}

impl BackendDb {
  pub fn new(db: Database) -> Self {
    Self::with_clock(Arc::new(db), Arc::new(SystemClock))
  }

  /// Panics if `db` is not a backend database.
  pub fn with_clock(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
    assert_eq!(
      db.kind(),
      DatabaseKind::Backend,
      "backend handle needs a backend database"
    );
    Self { db, clock }
  }

  pub fn database(&self) -> &Database {
    &self.db
  }

  pub fn count(&self, table: &str) -> Result<usize> {
    self.db.count(table)
  }

  // ==========================================================================
  // Lifecycle
  // ==========================================================================

  /// Seed every empty seedable table. Tables that already hold rows are left alone.
  pub fn initialize(&self) -> Result<SeedReport> {
    let report = self.seed().inspect_err(|e| {
      error!(db = self.db.kind().name(), error = %e, "failed to initialize backend database");
    })?;
    info!(
      db = self.db.kind().name(),
      items = report.items,
      users = report.users,
      "backend database initialized"
    );
    Ok(report)
  }

  fn seed(&self) -> Result<SeedReport> {
    let report = SeedReport {
      items: self.db.transaction(|tx| seed_if_empty(tx, "items", insert_seed_items))?,
      users: self.db.transaction(|tx| seed_if_empty(tx, "users", insert_seed_users))?,
    };

    if report.items > 0 {
      info!(rows = report.items, "seeded items table");
    }
    if report.users > 0 {
      info!(rows = report.users, "seeded users table");
    }

    Ok(report)
  }

  /// Empty every backend table.
  pub fn clear(&self) -> Result<()> {
    for table in self.db.kind().tables() {
      self.db.clear_table(table)?;
    }
    info!(db = self.db.kind().name(), "backend database cleared");
    Ok(())
  }

  /// Clear and re-seed. Not atomic: a failure in between leaves an empty
  /// store, which the next `initialize` repairs.
  pub fn reset(&self) -> Result<SeedReport> {
    self.clear()?;
    let report = self.initialize()?;
    info!(db = self.db.kind().name(), "backend database reset to seed state");
    Ok(report)
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub fn items(&self) -> Result<Vec<ItemRecord>> {
    self.db.with_conn(|conn| {
      let mut stmt = conn.prepare(
        "SELECT id, name, description, price, category, created_at, updated_at
         FROM items ORDER BY id",
      )?;
      let rows = stmt
        .query_map([], |row| {
          Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
          ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

      rows
        .into_iter()
        .map(
          |(id, name, description, price, category, created_at, updated_at)| {
            Ok(ItemRecord {
              id,
              name,
              description,
              price,
              category,
              created_at: parse_timestamp(&created_at)?,
              updated_at: parse_timestamp(&updated_at)?,
            })
          },
        )
        .collect()
    })
  }

  pub fn users(&self) -> Result<Vec<UserRecord>> {
    self.db.with_conn(|conn| {
      let mut stmt = conn.prepare(
        "SELECT id, email, username, full_name, is_active, created_at FROM users ORDER BY id",
      )?;
      let rows = stmt
        .query_map([], |row| {
          Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, bool>(4)?,
            row.get::<_, String>(5)?,
          ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

      rows
        .into_iter()
        .map(|(id, email, username, full_name, is_active, created_at)| {
          Ok(UserRecord {
            id,
            email,
            username,
            full_name,
            is_active,
            created_at: parse_timestamp(&created_at)?,
          })
        })
        .collect()
    })
  }

  // ==========================================================================
  // Shared content
  // ==========================================================================

  /// Store new shared content. The alias must be unique.
  pub fn insert_content(&self, new: &NewContent) -> Result<ContentRecord> {
    for (field, value) in [
      ("alias", &new.alias),
      ("title", &new.title),
      ("content", &new.content),
      ("author", &new.author),
    ] {
      if value.trim().is_empty() {
        return Err(StoreError::InvalidPayload(format!("{} must not be empty", field)));
      }
    }

    let now = format_timestamp(self.clock.now());
    let id = self.db.with_conn(|conn| {
      conn.execute(
        "INSERT INTO content (alias, title, content, author, is_public, view_count, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        params![new.alias, new.title, new.content, new.author, new.is_public, now, now],
      )?;
      Ok(conn.last_insert_rowid())
    })?;

    self
      .get_content(id)?
      .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
  }

  pub fn get_content(&self, id: i64) -> Result<Option<ContentRecord>> {
    self.query_content("id = ?", params![id])
  }

  pub fn get_content_by_alias(&self, alias: &str) -> Result<Option<ContentRecord>> {
    self.query_content("alias = ?", params![alias])
  }

  /// Bump the view counter and return the updated record.
  pub fn record_content_view(&self, id: i64) -> Result<Option<ContentRecord>> {
    let changed = self.db.with_conn(|conn| {
      Ok(conn.execute(
        "UPDATE content SET view_count = view_count + 1 WHERE id = ?",
        params![id],
      )?)
    })?;
    if changed == 0 {
      return Ok(None);
    }
    self.get_content(id)
  }

  /// All shared content, newest first.
  pub fn contents(&self) -> Result<Vec<ContentRecord>> {
    self.db.with_conn(|conn| {
      let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM content ORDER BY created_at DESC, id DESC",
        CONTENT_COLUMNS
      ))?;
      let raws = stmt
        .query_map([], RawContent::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      raws.into_iter().map(RawContent::into_record).collect()
    })
  }

  pub fn delete_content(&self, id: i64) -> Result<bool> {
    self.db.with_conn(|conn| {
      Ok(conn.execute("DELETE FROM content WHERE id = ?", params![id])? > 0)
    })
  }

  fn query_content(
    &self,
    filter: &str,
    params: &[&dyn rusqlite::ToSql],
  ) -> Result<Option<ContentRecord>> {
    self.db.with_conn(|conn| {
      let raw = conn
        .query_row(
          &format!("SELECT {} FROM content WHERE {}", CONTENT_COLUMNS, filter),
          params,
          RawContent::from_row,
        )
        .optional()?;
      raw.map(RawContent::into_record).transpose()
    })
  }
}

/// Run `insert` only when `table` has no rows, checked inside the same transaction.
fn seed_if_empty(
  tx: &Transaction<'_>,
  table: &str,
  insert: fn(&Transaction<'_>) -> Result<usize>,
) -> Result<usize> {
  let rows: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
    row.get(0)
  })?;
  if rows > 0 {
    return Ok(0);
  }
  insert(tx)
}

fn insert_seed_items(tx: &Transaction<'_>) -> Result<usize> {
  let mut stmt = tx.prepare(
    "INSERT INTO items (name, description, price, category, created_at, updated_at)
     VALUES (?, ?, ?, ?, ?, ?)",
  )?;
  for item in SEED_ITEMS {
    stmt.execute(params![
      item.name,
      item.description,
      item.price,
      item.category,
      item.created_at,
      item.updated_at
    ])?;
  }
  Ok(SEED_ITEMS.len())
}

fn insert_seed_users(tx: &Transaction<'_>) -> Result<usize> {
  let mut stmt = tx.prepare(
    "INSERT INTO users (email, username, full_name, is_active, created_at)
     VALUES (?, ?, ?, ?, ?)",
  )?;
  for user in SEED_USERS {
    stmt.execute(params![
      user.email,
      user.username,
      user.full_name,
      user.is_active,
      user.created_at
    ])?;
  }
  Ok(SEED_USERS.len())
}

const CONTENT_COLUMNS: &str =
  "id, alias, title, content, author, is_public, view_count, created_at, updated_at";

struct RawContent {
  id: i64,
  alias: String,
  title: String,
  content: String,
  author: String,
  is_public: bool,
  view_count: i64,
  created_at: String,
  updated_at: String,
}

impl RawContent {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      alias: row.get(1)?,
      title: row.get(2)?,
      content: row.get(3)?,
      author: row.get(4)?,
      is_public: row.get(5)?,
      view_count: row.get(6)?,
      created_at: row.get(7)?,
      updated_at: row.get(8)?,
    })
  }

  fn into_record(self) -> Result<ContentRecord> {
    Ok(ContentRecord {
      id: self.id,
      alias: self.alias,
      title: self.title,
      content: self.content,
      author: self.author,
      is_public: self.is_public,
      view_count: self.view_count,
      created_at: parse_timestamp(&self.created_at)?,
      updated_at: parse_timestamp(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::ManualClock;
  use chrono::TimeZone;

  fn backend() -> BackendDb {
    let clock = Arc::new(ManualClock::new(
      chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let db = Database::open_in_memory(DatabaseKind::Backend).unwrap();
    BackendDb::with_clock(Arc::new(db), clock)
  }

  fn new_content(alias: &str) -> NewContent {
    NewContent {
      alias: alias.to_string(),
      title: "Title".to_string(),
      content: "Body".to_string(),
      author: "kim".to_string(),
      is_public: true,
    }
  }

  #[test]
  fn test_initialize_seeds_empty_tables() {
    let db = backend();
    let report = db.initialize().unwrap();
    assert_eq!(
      report,
      SeedReport {
        items: SEED_ITEMS.len(),
        users: SEED_USERS.len(),
      }
    );
    assert_eq!(db.count("items").unwrap(), 3);
    assert_eq!(db.count("users").unwrap(), 2);
    assert_eq!(db.count("content").unwrap(), 0);
  }

  #[test]
  fn test_initialize_twice_adds_nothing() {
    let db = backend();
    db.initialize().unwrap();
    let second = db.initialize().unwrap();
    assert!(second.is_empty());
    assert_eq!(db.count("items").unwrap(), 3);
  }

  #[test]
  fn test_initialize_only_fills_empty_tables() {
    let db = backend();
    db.initialize().unwrap();
    db.database().clear_table("users").unwrap();

    let report = db.initialize().unwrap();
    assert_eq!(report.items, 0);
    assert_eq!(report.users, 2);
  }

  #[test]
  fn test_reset_twice_yields_same_counts() {
    let db = backend();
    db.initialize().unwrap();
    db.insert_content(&new_content("hello")).unwrap();

    let first = db.reset().unwrap();
    let counts_first = (db.count("items").unwrap(), db.count("users").unwrap());
    let second = db.reset().unwrap();
    let counts_second = (db.count("items").unwrap(), db.count("users").unwrap());

    assert_eq!(first, second);
    assert_eq!(counts_first, counts_second);
    assert_eq!(counts_first, (3, 2));
    assert_eq!(db.count("content").unwrap(), 0);
  }

  #[test]
  fn test_seed_round_trip_through_clear() {
    let db = backend();
    assert!(db.items().unwrap().is_empty());

    db.initialize().unwrap();
    let laptop = db.items().unwrap().into_iter().find(|i| i.name == "노트북").unwrap();
    assert_eq!(laptop.price, 1_500_000);

    db.clear().unwrap();
    assert!(db.items().unwrap().iter().all(|i| i.name != "노트북"));

    db.initialize().unwrap();
    let again = db.items().unwrap().into_iter().find(|i| i.name == "노트북").unwrap();
    assert_eq!(again.price, laptop.price);
    assert_eq!(again.created_at, laptop.created_at);
  }

  #[test]
  fn test_concurrent_initialize_seeds_once() {
    let db = backend();
    let handles: Vec<_> = (0..8)
      .map(|_| {
        let db = db.clone();
        std::thread::spawn(move || db.initialize().unwrap())
      })
      .collect();

    let reports: Vec<SeedReport> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(reports.iter().map(|r| r.items).sum::<usize>(), SEED_ITEMS.len());
    assert_eq!(reports.iter().map(|r| r.users).sum::<usize>(), SEED_USERS.len());
    assert_eq!(db.count("items").unwrap(), 3);
    assert_eq!(db.count("users").unwrap(), 2);
  }

  #[test]
  fn test_users_are_typed() {
    let db = backend();
    db.initialize().unwrap();
    let users = db.users().unwrap();
    assert_eq!(users[0].username, "user1");
    assert_eq!(users[0].full_name, "홍길동");
    assert!(users.iter().all(|u| u.is_active));
  }

  #[test]
  fn test_content_by_id_and_alias() {
    let db = backend();
    let created = db.insert_content(&new_content("first-post")).unwrap();
    assert_eq!(created.view_count, 0);

    assert_eq!(db.get_content(created.id).unwrap(), Some(created.clone()));
    assert_eq!(
      db.get_content_by_alias("first-post").unwrap().map(|c| c.id),
      Some(created.id)
    );
    assert!(db.get_content_by_alias("missing").unwrap().is_none());
  }

  #[test]
  fn test_duplicate_alias_is_a_storage_error() {
    let db = backend();
    db.insert_content(&new_content("dup")).unwrap();
    let err = db.insert_content(&new_content("dup")).unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));
  }

  #[test]
  fn test_empty_content_fields_are_rejected() {
    let db = backend();
    let mut content = new_content("x");
    content.title = "  ".to_string();
    let err = db.insert_content(&content).unwrap_err();
    assert!(matches!(err, StoreError::InvalidPayload(msg) if msg.contains("title")));
  }

  #[test]
  fn test_content_views_and_delete() {
    let db = backend();
    let created = db.insert_content(&new_content("viewed")).unwrap();
    db.record_content_view(created.id).unwrap();
    let viewed = db.record_content_view(created.id).unwrap().unwrap();
    assert_eq!(viewed.view_count, 2);

    assert!(db.delete_content(created.id).unwrap());
    assert!(!db.delete_content(created.id).unwrap());
    assert!(db.record_content_view(created.id).unwrap().is_none());
    assert!(db.contents().unwrap().is_empty());
  }

  #[test]
  #[should_panic(expected = "backend handle needs a backend database")]
  fn test_rejects_frontend_database() {
    let db = Database::open_in_memory(DatabaseKind::Frontend).unwrap();
    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    BackendDb::with_clock(Arc::new(db), clock);
  }
}
