// src/services/answers.rs
//! Answer payload store.
//!
//! - One row per answer text, owned by exactly one entry (no sharing).
//! - Rows are only written by the coordinator, inside its transaction.
//! - Indexed by content so "which triggers produce this answer" stays cheap.

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;
use crate::model::AnswerPayload;

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS answers (
  answer_id  INTEGER PRIMARY KEY AUTOINCREMENT,
  answer     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_answers_text ON answers(answer);
"#;

/// Insert a fresh payload and return its id.
pub fn insert(conn: &Connection, text: &str) -> Result<i64> {
    conn.execute("INSERT INTO answers(answer) VALUES (?1)", [text])?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, answer_id: i64) -> Result<Option<AnswerPayload>> {
    let text = text(conn, answer_id)?;
    Ok(text.map(|text| AnswerPayload { id: answer_id, text }))
}

pub fn text(conn: &Connection, answer_id: i64) -> Result<Option<String>> {
    let text = conn
        .query_row(
            "SELECT answer FROM answers WHERE answer_id=?1",
            [answer_id],
            |r| r.get::<_, String>(0),
        )
        .optional()?;
    Ok(text)
}

/// Overwrite a payload in place. Returns false if the row is missing.
pub fn set_text(conn: &Connection, answer_id: i64, text: &str) -> Result<bool> {
    let n = conn.execute(
        "UPDATE answers SET answer=?1 WHERE answer_id=?2",
        (text, answer_id),
    )?;
    Ok(n > 0)
}

pub fn delete_many(conn: &Connection, answer_ids: &[i64]) -> Result<usize> {
    let mut stmt = conn.prepare("DELETE FROM answers WHERE answer_id=?1")?;
    let mut removed = 0;
    for id in answer_ids {
        removed += stmt.execute([id])?;
    }
    Ok(removed)
}

pub fn delete_all(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM answers", [])?)
}

/// Ids of every payload whose text equals `text` exactly.
pub fn ids_by_text(conn: &Connection, text: &str) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT answer_id FROM answers WHERE answer=?1 ORDER BY answer_id")?;
    let rows = stmt.query_map([text], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM answers", [], |r| r.get(0))?;
    Ok(n as u64)
}
