// src/commands/api.rs
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::commands::init::ensure_initialized_once;
use crate::config::CoreConfig;
use crate::error::Result;
use crate::model::{
    AnswerPayload, ClearFilter, Entry, MoveTarget, NewEntry, PatternKind, Scope, Selector,
    WordEntry,
};
use crate::services::activity::{self, ActivityItem};
use crate::services::audit::Audit;
use crate::services::entries::EntryFilter;
use crate::services::matcher::RegexCache;
use crate::services::{answers, coordinator, entries, matcher};

/// The word bank: one SQLite connection, every read and write goes through here.
pub struct WordBank {
    db: Connection,
    audit: Audit,
    regexes: RegexCache,
    window_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub entries: u64,
    pub answers: u64,
}

impl WordBank {
    /// Open the store named by the workspace config (initializing it if needed).
    pub fn new() -> anyhow::Result<Self> {
        let report = ensure_initialized_once()?;
        Self::from_config(&report.config)
    }

    pub fn from_config(cfg: &CoreConfig) -> anyhow::Result<Self> {
        let mut bank = Self::open(&cfg.storage.db_path)?;
        bank.audit = Audit::from_config(cfg);
        bank.window_minutes = cfg.activity.window_minutes;
        Ok(bank)
    }

    /// Open/create a file database. No logbook until `with_audit`.
    ///
    /// - Creates the parent directory if missing.
    /// - Enables WAL and foreign keys, then ensures both tables.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(db_path)?;
        db.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(db)
    }

    /// Private in-memory store; gone when dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        db.execute_batch(answers::SCHEMA)?;
        db.execute_batch(entries::SCHEMA)?;
        Ok(Self {
            db,
            audit: Audit::disabled(),
            regexes: RegexCache::new(),
            window_minutes: CoreConfig::default().activity.window_minutes,
        })
    }

    pub fn with_audit(mut self, audit: Audit) -> Self {
        self.audit = audit;
        self
    }

    pub fn default_window_minutes(&self) -> i64 {
        self.window_minutes
    }

    // ---------- reads ----------

    /// Resolve `text` in `scope` plus the global scope. `None` when no rule fires.
    pub fn match_text(&self, scope: &Scope, text: &str, require_to_me: bool) -> Result<Option<WordEntry>> {
        matcher::match_text(&self.db, &self.regexes, scope, text, require_to_me)
    }

    /// Distinct triggers stored directly in `scope`.
    pub fn list_triggers(&self, scope: &Scope) -> Result<Vec<String>> {
        entries::triggers(&self.db, &EntryFilter::new().scope(scope))
    }

    pub fn entry(&self, id: i64) -> Result<Option<Entry>> {
        entries::get(&self.db, id)
    }

    pub fn answer(&self, answer_id: i64) -> Result<Option<AnswerPayload>> {
        answers::get(&self.db, answer_id)
    }

    pub fn entry_ids_for_trigger(&self, scope: &Scope, trigger: &str) -> Result<Vec<i64>> {
        let found = entries::find(&self.db, &EntryFilter::new().scope(scope).trigger(trigger))?;
        Ok(found.into_iter().map(|e| e.id).collect())
    }

    pub fn answers_for_trigger(&self, scope: &Scope, trigger: &str) -> Result<Vec<String>> {
        let found = entries::find(&self.db, &EntryFilter::new().scope(scope).trigger(trigger))?;
        let joined = matcher::join_answers(&self.db, &found)?;
        Ok(joined.into_iter().map(|a| a.answer).collect())
    }

    /// Triggers of every rule, in any scope, whose answer is exactly `text`.
    pub fn triggers_for_answer(&self, text: &str) -> Result<Vec<String>> {
        let ids = answers::ids_by_text(&self.db, text)?;
        entries::triggers_for_answers(&self.db, &ids)
    }

    pub fn describe(&self, scope: &Scope, selector: &Selector) -> Result<Option<String>> {
        activity::describe(&self.db, scope, selector)
    }

    /// Rendered report of recent mutations, or `NO_RECENT_ACTIVITY`.
    pub fn recent_activity(&self, scope: &Scope, window_minutes: i64) -> Result<String> {
        self.recent_activity_at(scope, window_minutes, Utc::now())
    }

    pub fn recent_activity_at(
        &self,
        scope: &Scope,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<String> {
        activity::recent_activity(&self.db, scope, window_minutes, now)
    }

    pub fn recent_items(&self, scope: &Scope, window_minutes: i64) -> Result<Vec<ActivityItem>> {
        activity::recent_items(&self.db, scope, window_minutes, Utc::now())
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            entries: entries::count(&self.db)?,
            answers: answers::count(&self.db)?,
        })
    }

    // ---------- writes ----------

    /// Store a new rule. Fails with `InvalidWeight` outside 1..=10.
    pub fn create(&mut self, new: &NewEntry) -> Result<(i64, bool)> {
        let (id, created) = coordinator::create(&mut self.db, new)?;
        if self.audit.is_enabled() {
            self.audit.record_action(
                "create",
                &json!({
                    "id": id,
                    "scope": new.scope.to_string(),
                    "pattern": new.pattern.as_str(),
                    "trigger": self.audit.preview(&new.trigger),
                    "weight": new.weight,
                    "creator_id": new.creator_id,
                }),
                "low",
            );
        }
        Ok((id, created))
    }

    pub fn delete(&mut self, scope: &Scope, selector: &Selector) -> Result<(Vec<i64>, bool)> {
        let (answer_ids, ok) = coordinator::delete(&mut self.db, scope, selector)?;
        if ok {
            self.audit.record_action(
                "delete",
                &json!({"scope": scope.to_string(), "answer_ids": answer_ids}),
                "medium",
            );
        }
        Ok((answer_ids, ok))
    }

    /// Delete rules by trigger text; returns the removed payload ids.
    pub fn delete_by_trigger(
        &mut self,
        scope: &Scope,
        trigger: &str,
        pattern: PatternKind,
        require_to_me: bool,
    ) -> Result<(Vec<i64>, bool)> {
        self.delete(scope, &Selector::trigger_with(trigger, pattern, require_to_me))
    }

    /// Delete one rule of `scope` by id. Takes no pattern kind or address
    /// flag: the id alone picks the rule.
    pub fn delete_by_id(&mut self, scope: &Scope, id: i64) -> Result<(Vec<i64>, bool)> {
        self.delete(scope, &Selector::id(id))
    }

    /// Relocate the selected rules of `scope`. False when nothing matched.
    pub fn move_entries(&mut self, scope: &Scope, selector: &Selector, target: &MoveTarget) -> Result<bool> {
        let ok = coordinator::relocate(&mut self.db, scope, selector, target)?;
        if ok {
            self.audit.record_action(
                "move",
                &json!({
                    "from": scope.to_string(),
                    "to": target.scope.to_string(),
                    "pattern": target.pattern.map(PatternKind::as_str),
                    "to_me": target.to_me,
                }),
                "low",
            );
        }
        Ok(ok)
    }

    pub fn update_answer(&mut self, ids: &[i64], new_text: &str) -> Result<(Vec<i64>, bool)> {
        let (updated, ok) = coordinator::update_answer(&mut self.db, ids, new_text)?;
        if ok && self.audit.is_enabled() {
            self.audit.record_action(
                "update",
                &json!({"ids": updated, "answer": self.audit.preview(new_text)}),
                "low",
            );
        }
        Ok((updated, ok))
    }

    pub fn undo_last(&mut self, scope: &Scope, trigger: &str) -> Result<Vec<i64>> {
        let restored = coordinator::undo_last(&mut self.db, scope, trigger)?;
        if !restored.is_empty() {
            self.audit.record_action(
                "undo",
                &json!({"scope": scope.to_string(), "answer_ids": restored}),
                "low",
            );
        }
        Ok(restored)
    }

    pub fn clear(&mut self, filter: &ClearFilter) -> Result<bool> {
        let ok = coordinator::clear(&mut self.db, filter)?;
        if ok {
            self.audit.record_action(
                "clear",
                &json!({
                    "scope_kind": filter.scope_kind.map(|k| k.as_str()),
                    "scope_id": filter.scope_id,
                    "pattern": filter.pattern.map(PatternKind::as_str),
                    "creator_id": filter.creator_id,
                }),
                "high",
            );
        }
        Ok(ok)
    }
}
