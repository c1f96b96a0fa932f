// src/services/matcher.rs
//! Matcher: resolve incoming text against the rules of a scope plus the
//! global scope.
//!
//! Two independent passes (local, then global) collect candidates filtered by
//! the direct-address flag; each candidate is resolved by its pattern kind and
//! joined against its answer payload. A candidate whose payload is missing is
//! an integrity fault and fails the whole match.

use std::cell::RefCell;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use rusqlite::Connection;

use crate::error::{Result, WordBankError};
use crate::model::{Answer, Entry, PatternKind, Scope, ScopeKind, WordEntry};
use crate::services::answers;
use crate::services::entries::{self, EntryFilter};

/// Compiled regexes larger than this are treated as invalid.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Distinct patterns kept compiled before the cache starts over.
const REGEX_CACHE_CAP: usize = 4096;

/// Compiled regex triggers, keyed by pattern text. A pattern that fails to
/// compile is cached as `None` and never matches.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: RefCell<HashMap<String, Option<Regex>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unanchored search of `pattern` in `text`.
    pub fn is_match(&self, pattern: &str, text: &str) -> bool {
        let mut compiled = self.compiled.borrow_mut();
        if let Some(re) = compiled.get(pattern) {
            return re.as_ref().is_some_and(|re| re.is_match(text));
        }
        if compiled.len() >= REGEX_CACHE_CAP {
            tracing::debug!(cached = compiled.len(), "regex cache reset");
            compiled.clear();
        }
        let re = compile(pattern);
        let hit = re.as_ref().is_some_and(|re| re.is_match(text));
        compiled.insert(pattern.to_string(), re);
        hit
    }

    pub fn len(&self) -> usize {
        self.compiled.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .multi_line(true)
        .dot_matches_new_line(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "inert regex rule");
            None
        }
    }
}

impl PatternKind {
    /// Does a rule with this kind and `trigger` fire on `text`?
    pub fn resolves(self, trigger: &str, text: &str, regexes: &RegexCache) -> bool {
        match self {
            PatternKind::Exact => trigger == text,
            PatternKind::Substring => text.contains(trigger),
            PatternKind::Regex => regexes.is_match(trigger, text),
        }
    }
}

/// Candidates of one scope pass that fire on `text`.
fn pass(conn: &Connection, regexes: &RegexCache, filter: EntryFilter, text: &str) -> Result<Vec<Entry>> {
    let candidates = entries::find(conn, &filter.active().exact_or_other_kind(text))?;
    Ok(candidates
        .into_iter()
        .filter(|e| e.pattern.resolves(&e.trigger, text, regexes))
        .collect())
}

/// Join entries against their payloads. Any dangling reference is fatal.
pub(crate) fn join_answers(conn: &Connection, hits: &[Entry]) -> Result<Vec<Answer>> {
    let mut out = Vec::with_capacity(hits.len());
    for e in hits {
        let Some(answer) = answers::text(conn, e.answer_id)? else {
            tracing::error!(entry_id = e.id, answer_id = e.answer_id, "dangling answer reference");
            return Err(WordBankError::IntegrityFault {
                entry_id: e.id,
                answer_id: e.answer_id,
            });
        };
        out.push(Answer {
            entry_id: e.id,
            answer_id: e.answer_id,
            answer,
            weight: e.weight,
            undo_text: e.undo_text.clone(),
        });
    }
    Ok(out)
}

/// Match `text` in `scope` (unioned with global). `None` means no rule fired.
pub fn match_text(
    conn: &Connection,
    regexes: &RegexCache,
    scope: &Scope,
    text: &str,
    require_to_me: bool,
) -> Result<Option<WordEntry>> {
    let mut hits = pass(conn, regexes, EntryFilter::new().scope(scope).to_me(require_to_me), text)?;
    let local = hits.len();

    if !scope.is_global() {
        let global = EntryFilter::new()
            .scope_kind(ScopeKind::Global)
            .to_me(require_to_me);
        hits.extend(pass(conn, regexes, global, text)?);
    }

    tracing::debug!(
        scope = %scope,
        local,
        global = hits.len() - local,
        "match passes done"
    );

    if hits.is_empty() {
        return Ok(None);
    }

    Ok(Some(WordEntry {
        key: text.to_string(),
        require_to_me,
        answers: join_answers(conn, &hits)?,
    }))
}
