//! Store handle: a named SQLite database with a fixed, versioned set of tables.

pub mod schema;

use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Which logical database a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
  /// Browser-local data: settings, drafts, cache, recent items
  Frontend,
  /// Seeded stand-in for a backend: items, users, content
  Backend,
}

impl DatabaseKind {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Frontend => "FrontendDB",
      Self::Backend => "BackendMockDB",
    }
  }

  pub fn file_name(&self) -> &'static str {
    match self {
      Self::Frontend => "frontend.db",
      Self::Backend => "backend-mock.db",
    }
  }

  pub fn tables(&self) -> &'static [&'static str] {
    match self {
      Self::Frontend => schema::FRONTEND_TABLES,
      Self::Backend => schema::BACKEND_TABLES,
    }
  }

  fn migrations(&self) -> &'static [&'static str] {
    match self {
      Self::Frontend => schema::FRONTEND_MIGRATIONS,
      Self::Backend => schema::BACKEND_MIGRATIONS,
    }
  }

  /// Schema version this build knows how to open.
  pub fn version(&self) -> i64 {
    self.migrations().len() as i64
  }
}

/// Connection wrapper shared by every helper of one database.
///
/// All access goes through a single mutex, so a helper that holds it for a
/// whole transaction is never interleaved with another writer.
pub struct Database {
  conn: Mutex<Connection>,
  kind: DatabaseKind,
  path: PathBuf,
}

impl Database {
  /// Open or create the database for `kind` inside `dir`.
  ///
  /// Opening the same directory twice reaches the same persisted data.
  pub fn open(dir: &Path, kind: DatabaseKind) -> Result<Self> {
    let path = dir.join(kind.file_name());

    std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
      path: dir.to_path_buf(),
      source,
    })?;

    let conn = Connection::open(&path).map_err(|source| StoreError::Init {
      path: path.clone(),
      source,
    })?;
    conn
      .busy_timeout(Duration::from_secs(5))
      .map_err(|source| StoreError::Init {
        path: path.clone(),
        source,
      })?;

    Self::from_connection(conn, kind, path)
  }

  /// A private in-memory database with the same schema.
  pub fn open_in_memory(kind: DatabaseKind) -> Result<Self> {
    let path = PathBuf::from(":memory:");
    let conn = Connection::open_in_memory().map_err(|source| StoreError::Init {
      path: path.clone(),
      source,
    })?;
    Self::from_connection(conn, kind, path)
  }

  fn from_connection(mut conn: Connection, kind: DatabaseKind, path: PathBuf) -> Result<Self> {
    Self::run_migrations(&mut conn, kind, &path)?;
    info!(db = kind.name(), path = %path.display(), "database opened");

    Ok(Self {
      conn: Mutex::new(conn),
      kind,
      path,
    })
  }

  /// Apply every migration newer than the stored `user_version`.
  fn run_migrations(conn: &mut Connection, kind: DatabaseKind, path: &Path) -> Result<()> {
    let init_err = |source| StoreError::Init {
      path: path.to_path_buf(),
      source,
    };

    let current: i64 = conn
      .pragma_query_value(None, "user_version", |row| row.get(0))
      .map_err(init_err)?;
    let supported = kind.version();

    if current > supported {
      return Err(StoreError::SchemaTooNew {
        found: current,
        supported,
      });
    }

    for (index, ddl) in kind.migrations().iter().enumerate().skip(current as usize) {
      let version = index as i64 + 1;
      let tx = conn.transaction().map_err(init_err)?;
      tx.execute_batch(ddl).map_err(init_err)?;
      tx.pragma_update(None, "user_version", version)
        .map_err(init_err)?;
      tx.commit().map_err(init_err)?;
      debug!(db = kind.name(), version, "applied schema migration");
    }

    Ok(())
  }

  pub fn kind(&self) -> DatabaseKind {
    self.kind
  }

  /// File backing this handle (`:memory:` for in-memory databases).
  pub fn path(&self) -> &Path {
    &self.path
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|_| StoreError::Poisoned)
  }

  /// Run `f` with exclusive access to the connection.
  pub fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
    let conn = self.lock()?;
    f(&conn)
  }

  /// Run `f` inside one transaction; it commits only if `f` succeeds.
  pub fn transaction<R>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<R>) -> Result<R> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
  }

  fn check_table(&self, table: &str) -> Result<&'static str> {
    self
      .kind
      .tables()
      .iter()
      .copied()
      .find(|t| *t == table)
      .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
  }

  /// Number of rows in `table`.
  pub fn count(&self, table: &str) -> Result<usize> {
    let table = self.check_table(table)?;
    self.with_conn(|conn| {
      let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
      })?;
      Ok(n as usize)
    })
  }

  /// Delete every row of `table`, returning how many were removed.
  pub fn clear_table(&self, table: &str) -> Result<usize> {
    let table = self.check_table(table)?;
    self.with_conn(|conn| Ok(conn.execute(&format!("DELETE FROM {}", table), [])?))
  }
}
