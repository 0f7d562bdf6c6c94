//! Drafts: unsaved work keyed by type and an optional reference id.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::FrontendDb;
use crate::clock::{format_timestamp, parse_timestamp};
use crate::entities::DraftRecord;
use crate::error::Result;
use crate::payload;

const DRAFT_COLUMNS: &str = "id, type, reference_id, content, created_at, updated_at";

/// Draft helpers bound to a frontend database.
pub struct Drafts<'a> {
  ctx: &'a FrontendDb,
}

impl<'a> Drafts<'a> {
  pub(super) fn new(ctx: &'a FrontendDb) -> Self {
    Self { ctx }
  }

  /// Save `content` as a draft and return its id.
  ///
  /// With a reference id, an existing `(draft_type, reference_id)` draft is
  /// updated in place and keeps its `created_at`. Without one, a new draft is
  /// always inserted.
  pub fn save<T: Serialize + ?Sized>(
    &self,
    draft_type: &str,
    content: &T,
    reference_id: Option<i64>,
  ) -> Result<i64> {
    let content = payload::structured("draft content", content)?;
    let encoded = serde_json::to_string(&content)?;
    let now = format_timestamp(self.ctx.clock.now());

    self.ctx.db.transaction(|tx| {
      if let Some(reference_id) = reference_id {
        let existing: Option<i64> = tx
          .query_row(
            "SELECT id FROM drafts WHERE type = ? AND reference_id = ? ORDER BY id LIMIT 1",
            params![draft_type, reference_id],
            |row| row.get(0),
          )
          .optional()?;

        if let Some(id) = existing {
          tx.execute(
            "UPDATE drafts SET content = ?, updated_at = ? WHERE id = ?",
            params![encoded, now, id],
          )?;
          return Ok(id);
        }
      }

      tx.execute(
        "INSERT INTO drafts (type, reference_id, content, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
        params![draft_type, reference_id, encoded, now, now],
      )?;
      Ok(tx.last_insert_rowid())
    })
  }

  /// First draft matching `draft_type` (and `reference_id`, when given).
  ///
  /// Without a reference id this returns the oldest draft of the type, even
  /// one that was saved against a reference.
  pub fn get(&self, draft_type: &str, reference_id: Option<i64>) -> Result<Option<DraftRecord>> {
    self.ctx.db.with_conn(|conn| {
      let raw = match reference_id {
        Some(reference_id) => conn
          .query_row(
            &format!(
              "SELECT {} FROM drafts WHERE type = ? AND reference_id = ? ORDER BY id LIMIT 1",
              DRAFT_COLUMNS
            ),
            params![draft_type, reference_id],
            RawDraft::from_row,
          )
          .optional()?,
        None => conn
          .query_row(
            &format!(
              "SELECT {} FROM drafts WHERE type = ? ORDER BY id LIMIT 1",
              DRAFT_COLUMNS
            ),
            params![draft_type],
            RawDraft::from_row,
          )
          .optional()?,
      };
      raw.map(RawDraft::into_record).transpose()
    })
  }

  pub fn delete(&self, id: i64) -> Result<()> {
    self.ctx.db.with_conn(|conn| {
      conn.execute("DELETE FROM drafts WHERE id = ?", params![id])?;
      Ok(())
    })
  }

  /// All drafts of `draft_type`, in insertion order.
  pub fn list_by_type(&self, draft_type: &str) -> Result<Vec<DraftRecord>> {
    self
      .ctx
      .db
      .with_conn(|conn| query_drafts(conn, draft_type))
  }
}

fn query_drafts(conn: &Connection, draft_type: &str) -> Result<Vec<DraftRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM drafts WHERE type = ? ORDER BY id",
    DRAFT_COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![draft_type], RawDraft::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawDraft::into_record).collect()
}

struct RawDraft {
  id: i64,
  draft_type: String,
  reference_id: Option<i64>,
  content: String,
  created_at: String,
  updated_at: String,
}

impl RawDraft {
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      draft_type: row.get(1)?,
      reference_id: row.get(2)?,
      content: row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  fn into_record(self) -> Result<DraftRecord> {
    Ok(DraftRecord {
      id: self.id,
      draft_type: self.draft_type,
      reference_id: self.reference_id,
      content: serde_json::from_str(&self.content)?,
      created_at: parse_timestamp(&self.created_at)?,
      updated_at: parse_timestamp(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::frontend::tests::frontend;
  use crate::error::StoreError;
  use serde::Deserialize;
  use serde_json::json;

  #[test]
  fn test_save_with_reference_upserts_and_keeps_created_at() {
    let (db, clock) = frontend();
    let drafts = db.drafts();

    let first_id = drafts.save("item", &json!({"a": 1}), Some(7)).unwrap();
    let created = drafts.get("item", Some(7)).unwrap().unwrap().created_at;

    clock.advance(chrono::Duration::minutes(3));
    let second_id = drafts.save("item", &json!({"a": 2}), Some(7)).unwrap();

    assert_eq!(first_id, second_id);
    let matching: Vec<_> = drafts
      .list_by_type("item")
      .unwrap()
      .into_iter()
      .filter(|d| d.reference_id == Some(7))
      .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].content, json!({"a": 2}));
    assert_eq!(matching[0].created_at, created);
    assert_eq!(matching[0].updated_at, created + chrono::Duration::minutes(3));
  }

  #[test]
  fn test_same_reference_different_type_are_separate() {
    let (db, _) = frontend();
    let a = db.drafts().save("item", &json!({"x": 1}), Some(1)).unwrap();
    let b = db.drafts().save("document", &json!({"x": 1}), Some(1)).unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn test_save_without_reference_always_inserts() {
    let (db, _) = frontend();
    db.drafts().save("content", &json!({"title": "one"}), None).unwrap();
    db.drafts().save("content", &json!({"title": "two"}), None).unwrap();
    assert_eq!(db.drafts().list_by_type("content").unwrap().len(), 2);
  }

  // Without a reference id, get() falls back to the first draft of the type,
  // which may be unrelated to the draft the caller saved last.
  #[test]
  fn test_get_without_reference_returns_first_of_type() {
    let (db, _) = frontend();
    let referenced = db.drafts().save("content", &json!({"title": "edit"}), Some(3)).unwrap();
    db.drafts().save("content", &json!({"title": "new"}), None).unwrap();

    let found = db.drafts().get("content", None).unwrap().unwrap();
    assert_eq!(found.id, referenced);
    assert_eq!(found.reference_id, Some(3));
  }

  #[test]
  fn test_get_missing_is_none() {
    let (db, _) = frontend();
    assert!(db.drafts().get("item", None).unwrap().is_none());
    db.drafts().save("item", &json!({}), Some(1)).unwrap();
    assert!(db.drafts().get("item", Some(2)).unwrap().is_none());
  }

  #[test]
  fn test_delete_by_id() {
    let (db, _) = frontend();
    let id = db.drafts().save("item", &json!({"a": 1}), None).unwrap();
    db.drafts().delete(id).unwrap();
    assert!(db.drafts().list_by_type("item").unwrap().is_empty());
    // deleting again is harmless
    db.drafts().delete(id).unwrap();
  }

  #[test]
  fn test_list_by_type_filters_and_orders() {
    let (db, _) = frontend();
    let a = db.drafts().save("item", &json!({"n": 1}), None).unwrap();
    db.drafts().save("form", &json!({"n": 2}), None).unwrap();
    let c = db.drafts().save("item", &json!({"n": 3}), Some(9)).unwrap();

    let ids: Vec<i64> = db
      .drafts()
      .list_by_type("item")
      .unwrap()
      .iter()
      .map(|d| d.id)
      .collect();
    assert_eq!(ids, vec![a, c]);
  }

  #[test]
  fn test_list_content_is_saved() {
    let (db, _) = frontend();
    let id = db.drafts().save("list", &json!([1, 2]), None).unwrap();
    let draft = db.drafts().get("list", None).unwrap().unwrap();
    assert_eq!(draft.id, id);
    assert_eq!(draft.content, json!([1, 2]));
  }

  #[test]
  fn test_scalar_content_is_rejected() {
    let (db, _) = frontend();
    let err = db.drafts().save("item", &"just text", None).unwrap_err();
    assert!(matches!(err, StoreError::InvalidPayload(_)));
    assert_eq!(db.database().count("drafts").unwrap(), 0);
  }

  #[test]
  fn test_content_as_typed() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Form {
      title: String,
      author: Option<String>,
    }

    let (db, _) = frontend();
    db.drafts()
      .save("content", &json!({"title": "Hello", "author": "kim"}), None)
      .unwrap();
    let draft = db.drafts().get("content", None).unwrap().unwrap();
    let form: Form = draft.content_as().unwrap();
    assert_eq!(
      form,
      Form {
        title: "Hello".to_string(),
        author: Some("kim".to_string()),
      }
    );
  }
}
