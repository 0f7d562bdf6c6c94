//! Frontend-local database: data that belongs to this client only.
//!
//! - `settings`: user preferences (theme, language, ...)
//! - `drafts`: unsaved work and offline edits
//! - `cache`: expiring performance cache
//! - `recent_items`: per-type view history
//!
//! Helpers are reached through a [`FrontendDb`], which carries the shared store
//! handle and the clock:
//!
//! ```no_run
//! # fn main() -> localstash::error::Result<()> {
//! use localstash::frontend::FrontendDb;
//! use localstash::store::{Database, DatabaseKind};
//!
//! let db = FrontendDb::new(Database::open_in_memory(DatabaseKind::Frontend)?);
//! db.initialize()?;
//! db.settings().set("theme", "dark")?;
//! db.recent().add("item", 42)?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod drafts;
mod recent;
mod settings;

pub use cache::{Cache, DEFAULT_CACHE_TTL};
pub use drafts::Drafts;
pub use recent::{RecentItems, DEFAULT_RECENT_LIMIT, RECENT_ITEMS_CAP};
pub use settings::Settings;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::store::{Database, DatabaseKind};

/// Handle to the frontend-local database. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct FrontendDb {
  db: Arc<Database>,
  clock: Arc<dyn Clock>,
  /// TTL applied by `cache().set` when none is given
  default_ttl: Duration,
}

impl FrontendDb {
  /// Wrap an opened frontend database, using wall-clock time.
  pub fn new(db: Database) -> Self {
    Self::with_clock(Arc::new(db), Arc::new(SystemClock))
  }

  /// Panics if `db` is not a frontend database.
  pub fn with_clock(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
    assert_eq!(
      db.kind(),
      DatabaseKind::Frontend,
      "frontend handle needs a frontend database"
    );
    Self {
      db,
      clock,
      default_ttl: DEFAULT_CACHE_TTL,
    }
  }

  /// Override the TTL used when `cache().set` is called without one.
  pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
    self.default_ttl = ttl;
    self
  }

  pub fn database(&self) -> &Database {
    &self.db
  }

  pub fn settings(&self) -> Settings<'_> {
    Settings::new(self)
  }

  pub fn drafts(&self) -> Drafts<'_> {
    Drafts::new(self)
  }

  pub fn cache(&self) -> Cache<'_> {
    Cache::new(self)
  }

  pub fn recent(&self) -> RecentItems<'_> {
    RecentItems::new(self)
  }

  /// Startup housekeeping: sweep expired cache entries.
  ///
  /// No frontend table carries seed data, so this is safe to call repeatedly.
  pub fn initialize(&self) -> Result<()> {
    let removed = self.cache().clear_expired()?;
    info!(db = self.db.kind().name(), expired_removed = removed, "frontend database initialized");
    Ok(())
  }

  /// Empty every frontend table.
  pub fn clear(&self) -> Result<()> {
    for table in self.db.kind().tables() {
      self.db.clear_table(table)?;
    }
    info!(db = self.db.kind().name(), "all frontend data cleared");
    Ok(())
  }

  /// [`FrontendDb::clear`] followed by [`FrontendDb::initialize`].
  pub fn reset(&self) -> Result<()> {
    self.clear()?;
    self.initialize()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::clock::ManualClock;
  use chrono::TimeZone;
  use serde_json::json;

  /// In-memory frontend database driven by a manual clock.
  pub fn frontend() -> (FrontendDb, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
      chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let db = Database::open_in_memory(DatabaseKind::Frontend).unwrap();
    (FrontendDb::with_clock(Arc::new(db), clock.clone()), clock)
  }

  #[test]
  fn test_initialize_sweeps_expired_cache() {
    let (db, clock) = frontend();
    db.cache()
      .set("old", &json!({}), Some(Duration::from_secs(1)))
      .unwrap();
    db.cache().set("fresh", &json!({}), None).unwrap();

    clock.advance(chrono::Duration::seconds(10));
    db.initialize().unwrap();
    assert_eq!(db.cache().len().unwrap(), 1);

    db.initialize().unwrap();
    assert_eq!(db.cache().len().unwrap(), 1);
  }

  #[test]
  fn test_clear_empties_every_table() {
    let (db, _) = frontend();
    db.settings().set("theme", "dark").unwrap();
    db.drafts().save("item", &json!({"a": 1}), None).unwrap();
    db.cache().set("k", &json!({}), None).unwrap();
    db.recent().add("item", 1).unwrap();

    db.clear().unwrap();
    for table in DatabaseKind::Frontend.tables() {
      assert_eq!(db.database().count(table).unwrap(), 0, "{} not cleared", table);
    }
  }

  #[test]
  fn test_reset_twice_is_stable() {
    let (db, _) = frontend();
    db.settings().set("theme", "dark").unwrap();
    db.reset().unwrap();
    db.reset().unwrap();
    assert!(db.settings().list().unwrap().is_empty());
  }

  #[test]
  fn test_configured_default_ttl() {
    let (db, clock) = frontend();
    let db = db.with_default_ttl(Duration::from_secs(30));
    db.cache().set("k", &json!({}), None).unwrap();

    let record = db.cache().get_record("k").unwrap().unwrap();
    assert_eq!(record.expires_at, clock.now() + chrono::Duration::seconds(30));
  }

  #[test]
  fn test_clones_share_the_store() {
    let (db, _) = frontend();
    let other = db.clone();
    db.settings().set("language", "en").unwrap();
    assert_eq!(
      other.settings().get::<String>("language").unwrap().as_deref(),
      Some("en")
    );
  }

  #[test]
  #[should_panic(expected = "frontend handle needs a frontend database")]
  fn test_rejects_backend_database() {
    let db = Database::open_in_memory(DatabaseKind::Backend).unwrap();
    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    FrontendDb::with_clock(Arc::new(db), clock);
  }
}
