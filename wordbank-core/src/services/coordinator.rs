// src/services/coordinator.rs
//! Mutation coordinator: create / delete / move / update-answer / undo / clear.
//!
//! Each operation is one SQLite transaction covering both tables. Payloads
//! are written before the entry that references them and removed after it,
//! so a reader never sees an entry whose answer does not resolve.

use chrono::Utc;
use rusqlite::Connection;

use crate::error::{Result, WordBankError};
use crate::model::{ClearFilter, Entry, MAX_WEIGHT, MIN_WEIGHT, MoveTarget, NewEntry, Scope, Selector};
use crate::services::answers;
use crate::services::entries::{self, EntryFilter};

pub fn validate_weight(weight: i64) -> Result<()> {
    if (MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        Ok(())
    } else {
        Err(WordBankError::InvalidWeight(weight))
    }
}

fn current_text(conn: &Connection, entry: &Entry) -> Result<String> {
    answers::text(conn, entry.answer_id)?.ok_or_else(|| {
        tracing::error!(entry_id = entry.id, answer_id = entry.answer_id, "dangling answer reference");
        WordBankError::IntegrityFault {
            entry_id: entry.id,
            answer_id: entry.answer_id,
        }
    })
}

/// Insert a payload and a fresh entry pointing at it.
///
/// Every call creates a new row, even for an identical
/// `(scope, pattern, trigger, answer)`; `created` is therefore always true.
pub fn create(conn: &mut Connection, new: &NewEntry) -> Result<(i64, bool)> {
    validate_weight(new.weight)?;
    let now = Utc::now();

    let tx = conn.transaction()?;
    let answer_id = answers::insert(&tx, &new.answer)?;
    let id = entries::insert(&tx, new, answer_id, &now)?;
    tx.commit()?;

    tracing::info!(
        id,
        answer_id,
        scope = %new.scope,
        pattern = new.pattern.as_str(),
        "entry created"
    );
    Ok((id, true))
}

/// Remove entries first, then their payloads. Returns the payload ids.
fn remove(conn: &Connection, targets: &[Entry]) -> Result<Vec<i64>> {
    let entry_ids: Vec<i64> = targets.iter().map(|e| e.id).collect();
    let answer_ids: Vec<i64> = targets.iter().map(|e| e.answer_id).collect();
    entries::delete_ids(conn, &entry_ids)?;
    answers::delete_many(conn, &answer_ids)?;
    Ok(answer_ids)
}

/// Delete every entry in `scope` picked by `selector`, with its payload.
/// `(empty, false)` when nothing matched.
pub fn delete(conn: &mut Connection, scope: &Scope, selector: &Selector) -> Result<(Vec<i64>, bool)> {
    let tx = conn.transaction()?;
    let targets = entries::find(&tx, &EntryFilter::new().scope(scope).selector(selector))?;
    if targets.is_empty() {
        return Ok((Vec::new(), false));
    }
    let answer_ids = remove(&tx, &targets)?;
    tx.commit()?;

    tracing::info!(scope = %scope, removed = answer_ids.len(), "entries deleted");
    Ok((answer_ids, true))
}

/// Rewrite scope / pattern / address flag of the selected entries in place.
pub fn relocate(
    conn: &mut Connection,
    scope: &Scope,
    selector: &Selector,
    target: &MoveTarget,
) -> Result<bool> {
    let now = Utc::now();
    let tx = conn.transaction()?;
    let targets = entries::find(&tx, &EntryFilter::new().scope(scope).selector(selector))?;
    if targets.is_empty() {
        return Ok(false);
    }
    for e in &targets {
        entries::relocate(&tx, e.id, target, &now)?;
    }
    tx.commit()?;

    tracing::info!(from = %scope, to = %target.scope, moved = targets.len(), "entries moved");
    Ok(true)
}

/// Overwrite the answer of each entry in `ids`, keeping its prior text in
/// that entry's own undo slot. Unknown ids are skipped.
pub fn update_answer(conn: &mut Connection, ids: &[i64], new_text: &str) -> Result<(Vec<i64>, bool)> {
    let now = Utc::now();
    let tx = conn.transaction()?;
    let mut updated = Vec::new();
    for &id in ids {
        let Some(entry) = entries::get(&tx, id)? else {
            tracing::debug!(id, "update skipped: no such entry");
            continue;
        };
        let previous = current_text(&tx, &entry)?;
        entries::record_update(&tx, entry.id, &previous, &now)?;
        answers::set_text(&tx, entry.answer_id, new_text)?;
        updated.push(entry.id);
    }
    if updated.is_empty() {
        return Ok((updated, false));
    }
    tx.commit()?;

    tracing::info!(updated = updated.len(), "answers updated");
    Ok((updated, true))
}

/// Swap current answer and undo slot for every entry in `scope` with this
/// trigger. Entries with an empty undo slot are left alone.
pub fn undo_last(conn: &mut Connection, scope: &Scope, trigger: &str) -> Result<Vec<i64>> {
    let now = Utc::now();
    let tx = conn.transaction()?;
    let targets = entries::find(&tx, &EntryFilter::new().scope(scope).trigger(trigger))?;
    let mut restored = Vec::new();
    for e in &targets {
        let Some(previous) = e.undo_text.as_deref() else {
            continue;
        };
        let current = current_text(&tx, e)?;
        answers::set_text(&tx, e.answer_id, previous)?;
        entries::record_update(&tx, e.id, &current, &now)?;
        restored.push(e.answer_id);
    }
    if restored.is_empty() {
        return Ok(restored);
    }
    tx.commit()?;

    tracing::info!(scope = %scope, trigger, restored = restored.len(), "answers reverted");
    Ok(restored)
}

/// Clear entries and payloads.
///
/// - no filter: the whole store;
/// - a full scope (kind + id, or global): that scope, optionally narrowed by
///   pattern kind and creator;
/// - anything else is ambiguous and returns false without touching the store.
pub fn clear(conn: &mut Connection, filter: &ClearFilter) -> Result<bool> {
    if filter.is_unfiltered() {
        let tx = conn.transaction()?;
        let removed = entries::delete_all(&tx)?;
        answers::delete_all(&tx)?;
        tx.commit()?;
        tracing::info!(removed, "store cleared");
        return Ok(true);
    }

    let Some(scope) = filter.resolved_scope() else {
        tracing::warn!(?filter, "clear refused: scope not fully specified");
        return Ok(false);
    };

    let mut query = EntryFilter::new().scope(&scope);
    if let Some(p) = filter.pattern {
        query = query.pattern(p);
    }
    if let Some(c) = filter.creator_id.as_deref() {
        query = query.creator(c);
    }

    let tx = conn.transaction()?;
    let targets = entries::find(&tx, &query)?;
    let removed = remove(&tx, &targets)?;
    tx.commit()?;

    tracing::info!(scope = %scope, removed = removed.len(), "scope cleared");
    Ok(true)
}
