// src/services/entries.rs
//! Entry store: rule records keyed by id and by `(scope_kind, scope_id, trigger)`.
//!
//! Callers compose an [`EntryFilter`] and hand it to `find`; every query shape
//! the engine needs goes through that one builder so scope handling stays in
//! one place (global scopes ignore `scope_id`).

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};

use crate::error::{Result, WordBankError};
use crate::model::{
    Entry, LastOperation, MoveTarget, NewEntry, PatternKind, Scope, ScopeKind, Selector,
};

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
  entry_id        INTEGER PRIMARY KEY AUTOINCREMENT,
  scope_kind      INTEGER NOT NULL,            -- 1 group, 2 private, 3 global
  scope_id        TEXT NOT NULL DEFAULT '',    -- empty for global
  pattern_kind    INTEGER NOT NULL,            -- 1 exact, 2 substring, 3 regex
  trigger         TEXT NOT NULL,
  answer_id       INTEGER NOT NULL REFERENCES answers(answer_id),
  require_to_me   INTEGER NOT NULL DEFAULT 0,
  creator_id      TEXT NOT NULL,
  weight          INTEGER NOT NULL DEFAULT 10 CHECK (weight BETWEEN 1 AND 10),
  created_at      TEXT NOT NULL,               -- RFC3339 UTC, millis
  updated_at      TEXT NOT NULL,               -- RFC3339 UTC, millis
  last_operation  INTEGER NOT NULL DEFAULT 1,  -- 1 add, 2 update, 3 move
  undo_text       TEXT,
  active          INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_entries_scope_trigger ON entries(scope_kind, scope_id, trigger);
CREATE INDEX IF NOT EXISTS idx_entries_answer ON entries(answer_id);
"#;

const COLUMNS: &str = "entry_id, scope_kind, scope_id, pattern_kind, trigger, answer_id, \
     require_to_me, creator_id, weight, created_at, updated_at, last_operation, undo_text, active";

/// Fixed-width RFC3339 so that string order is time order.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| WordBankError::InvalidRecord(format!("timestamp {s:?}: {e}")))
}

/// WHERE-clause builder over the `entries` table.
#[derive(Debug, Default, Clone)]
pub struct EntryFilter {
    clauses: Vec<&'static str>,
    values: Vec<Value>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, clause: &'static str, value: Value) -> Self {
        self.clauses.push(clause);
        self.values.push(value);
        self
    }

    pub fn scope(self, scope: &Scope) -> Self {
        let f = self.push("scope_kind = ?", Value::Integer(scope.kind.as_i64()));
        if scope.is_global() {
            f
        } else {
            f.push("scope_id = ?", Value::Text(scope.id.clone()))
        }
    }

    pub fn scope_kind(self, kind: ScopeKind) -> Self {
        self.push("scope_kind = ?", Value::Integer(kind.as_i64()))
    }

    pub fn id(self, id: i64) -> Self {
        self.push("entry_id = ?", Value::Integer(id))
    }

    pub fn trigger(self, trigger: &str) -> Self {
        self.push("trigger = ?", Value::Text(trigger.to_string()))
    }

    pub fn pattern(self, pattern: PatternKind) -> Self {
        self.push("pattern_kind = ?", Value::Integer(pattern.as_i64()))
    }

    pub fn to_me(self, to_me: bool) -> Self {
        self.push("require_to_me = ?", Value::Integer(to_me as i64))
    }

    pub fn creator(self, creator_id: &str) -> Self {
        self.push("creator_id = ?", Value::Text(creator_id.to_string()))
    }

    pub fn active(self) -> Self {
        self.push("active = ?", Value::Integer(1))
    }

    pub fn updated_since(self, since: &DateTime<Utc>) -> Self {
        self.push("updated_at >= ?", Value::Text(format_ts(since)))
    }

    /// Exact-kind rows must equal `text`; other kinds are resolved by the matcher.
    pub fn exact_or_other_kind(self, text: &str) -> Self {
        self.push(
            "(pattern_kind <> 1 OR trigger = ?)",
            Value::Text(text.to_string()),
        )
    }

    pub fn selector(self, selector: &Selector) -> Self {
        match selector {
            Selector::Id(id) => self.id(*id),
            Selector::Trigger { trigger, pattern, to_me } => {
                let mut f = self.trigger(trigger);
                if let Some(p) = pattern {
                    f = f.pattern(*p);
                }
                if let Some(t) = to_me {
                    f = f.to_me(*t);
                }
                f
            }
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

struct EntryRow {
    id: i64,
    scope_kind: i64,
    scope_id: String,
    pattern_kind: i64,
    trigger: String,
    answer_id: i64,
    require_to_me: bool,
    creator_id: String,
    weight: i64,
    created_at: String,
    updated_at: String,
    last_operation: i64,
    undo_text: Option<String>,
    active: bool,
}

impl EntryRow {
    fn read(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            scope_kind: r.get(1)?,
            scope_id: r.get(2)?,
            pattern_kind: r.get(3)?,
            trigger: r.get(4)?,
            answer_id: r.get(5)?,
            require_to_me: r.get(6)?,
            creator_id: r.get(7)?,
            weight: r.get(8)?,
            created_at: r.get(9)?,
            updated_at: r.get(10)?,
            last_operation: r.get(11)?,
            undo_text: r.get(12)?,
            active: r.get(13)?,
        })
    }

    fn into_entry(self) -> Result<Entry> {
        Ok(Entry {
            id: self.id,
            scope: Scope::new(ScopeKind::from_i64(self.scope_kind)?, self.scope_id),
            pattern: PatternKind::from_i64(self.pattern_kind)?,
            trigger: self.trigger,
            answer_id: self.answer_id,
            require_to_me: self.require_to_me,
            creator_id: self.creator_id,
            weight: self.weight,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            last_operation: LastOperation::from_i64(self.last_operation)?,
            undo_text: self.undo_text,
            active: self.active,
        })
    }
}

/// Insert an entry pointing at an already-written payload.
pub fn insert(conn: &Connection, new: &NewEntry, answer_id: i64, now: &DateTime<Utc>) -> Result<i64> {
    let ts = format_ts(now);
    conn.execute(
        r#"
        INSERT INTO entries(scope_kind, scope_id, pattern_kind, trigger, answer_id,
                            require_to_me, creator_id, weight, created_at, updated_at,
                            last_operation, active)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, 1)
        "#,
        rusqlite::params![
            new.scope.kind.as_i64(),
            new.scope.id,
            new.pattern.as_i64(),
            new.trigger,
            answer_id,
            new.require_to_me,
            new.creator_id,
            new.weight,
            ts,
            LastOperation::Add.as_i64(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All entries passing `filter`, oldest id first.
pub fn find(conn: &Connection, filter: &EntryFilter) -> Result<Vec<Entry>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM entries{} ORDER BY entry_id",
        filter.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), EntryRow::read)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?.into_entry()?);
    }
    Ok(out)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    let sql = format!("SELECT {COLUMNS} FROM entries WHERE entry_id=?1");
    let row = conn.query_row(&sql, [id], EntryRow::read).optional()?;
    row.map(EntryRow::into_entry).transpose()
}

/// Distinct trigger texts passing `filter`, in first-seen order.
pub fn triggers(conn: &Connection, filter: &EntryFilter) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT trigger FROM entries{} GROUP BY trigger ORDER BY MIN(entry_id)",
        filter.where_sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(filter.values.iter()), |r| r.get::<_, String>(0))?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Triggers of every entry whose payload is one of `answer_ids`.
pub fn triggers_for_answers(conn: &Connection, answer_ids: &[i64]) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT trigger FROM entries WHERE answer_id=?1 ORDER BY entry_id")?;
    let mut out = Vec::new();
    for id in answer_ids {
        let rows = stmt.query_map([id], |r| r.get::<_, String>(0))?;
        for r in rows {
            out.push(r?);
        }
    }
    Ok(out)
}

pub fn delete_ids(conn: &Connection, ids: &[i64]) -> Result<usize> {
    let mut stmt = conn.prepare("DELETE FROM entries WHERE entry_id=?1")?;
    let mut removed = 0;
    for id in ids {
        removed += stmt.execute([id])?;
    }
    Ok(removed)
}

pub fn delete_all(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM entries", [])?)
}

/// Rewrite scope (and optionally pattern / address flag) of one entry.
pub fn relocate(conn: &Connection, id: i64, target: &MoveTarget, now: &DateTime<Utc>) -> Result<bool> {
    let n = conn.execute(
        r#"
        UPDATE entries SET
          scope_kind     = ?1,
          scope_id       = ?2,
          pattern_kind   = COALESCE(?3, pattern_kind),
          require_to_me  = COALESCE(?4, require_to_me),
          last_operation = ?5,
          updated_at     = ?6
        WHERE entry_id = ?7
        "#,
        rusqlite::params![
            target.scope.kind.as_i64(),
            target.scope.id,
            target.pattern.map(PatternKind::as_i64),
            target.to_me,
            LastOperation::Move.as_i64(),
            format_ts(now),
            id,
        ],
    )?;
    Ok(n > 0)
}

/// Store `undo_text` in the entry's undo slot and mark it updated.
pub fn record_update(
    conn: &Connection,
    id: i64,
    undo_text: &str,
    now: &DateTime<Utc>,
) -> Result<bool> {
    let n = conn.execute(
        "UPDATE entries SET undo_text=?1, last_operation=?2, updated_at=?3 WHERE entry_id=?4",
        (undo_text, LastOperation::Update.as_i64(), format_ts(now), id),
    )?;
    Ok(n > 0)
}

pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?;
    Ok(n as u64)
}
