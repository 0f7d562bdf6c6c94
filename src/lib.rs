//! Local persistence helpers over embedded SQLite.
//!
//! Two logical databases are provided:
//! - [`frontend::FrontendDb`]: settings, drafts, an expiring cache and a
//!   capped recent-items history
//! - [`backend::BackendDb`]: seeded items and users plus shared content
//!
//! Both are opened through [`store::Database`] and passed around explicitly.

pub mod backend;
pub mod clock;
pub mod config;
pub mod entities;
pub mod error;
pub mod frontend;
pub mod logging;
pub mod payload;
pub mod store;
pub mod sweeper;

pub use error::{Result, StoreError};
