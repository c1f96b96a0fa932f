// src/model.rs
//! Rule records, answer payloads, and the value types passed across the
//! `WordBank` surface.
//!
//! Discriminants are stored as small integers in SQLite; `from_i64` is the
//! only way back from a row, and an unknown value is an `InvalidRecord`.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordBankError};

pub const MIN_WEIGHT: i64 = 1;
pub const MAX_WEIGHT: i64 = 10;
pub const DEFAULT_WEIGHT: i64 = 10;

/// Addressing context of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Group,
    Private,
    Global,
}

impl ScopeKind {
    pub fn as_i64(self) -> i64 {
        match self {
            ScopeKind::Group => 1,
            ScopeKind::Private => 2,
            ScopeKind::Global => 3,
        }
    }

    pub fn from_i64(v: i64) -> Result<Self> {
        match v {
            1 => Ok(ScopeKind::Group),
            2 => Ok(ScopeKind::Private),
            3 => Ok(ScopeKind::Global),
            other => Err(WordBankError::InvalidRecord(format!("scope_kind={other}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Group => "group",
            ScopeKind::Private => "private",
            ScopeKind::Global => "global",
        }
    }
}

/// A scope kind plus the opaque group/user id it belongs to.
/// Global scopes always carry an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub id: String,
}

impl Scope {
    pub fn new(kind: ScopeKind, id: impl Into<String>) -> Self {
        let id = match kind {
            ScopeKind::Global => String::new(),
            _ => id.into(),
        };
        Self { kind, id }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::new(ScopeKind::Group, id)
    }

    pub fn private(id: impl Into<String>) -> Self {
        Self::new(ScopeKind::Private, id)
    }

    pub fn global() -> Self {
        Self::new(ScopeKind::Global, "")
    }

    pub fn is_global(&self) -> bool {
        self.kind == ScopeKind::Global
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            f.write_str("global")
        } else {
            write!(f, "{}:{}", self.kind.as_str(), self.id)
        }
    }
}

/// How a stored trigger is compared against incoming text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Exact,
    Substring,
    Regex,
}

impl PatternKind {
    pub fn as_i64(self) -> i64 {
        match self {
            PatternKind::Exact => 1,
            PatternKind::Substring => 2,
            PatternKind::Regex => 3,
        }
    }

    pub fn from_i64(v: i64) -> Result<Self> {
        match v {
            1 => Ok(PatternKind::Exact),
            2 => Ok(PatternKind::Substring),
            3 => Ok(PatternKind::Regex),
            other => Err(WordBankError::InvalidRecord(format!("pattern_kind={other}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Exact => "exact",
            PatternKind::Substring => "substring",
            PatternKind::Regex => "regex",
        }
    }
}

/// The last mutation applied to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastOperation {
    Add,
    Update,
    Move,
}

impl LastOperation {
    pub fn as_i64(self) -> i64 {
        match self {
            LastOperation::Add => 1,
            LastOperation::Update => 2,
            LastOperation::Move => 3,
        }
    }

    pub fn from_i64(v: i64) -> Result<Self> {
        match v {
            1 => Ok(LastOperation::Add),
            2 => Ok(LastOperation::Update),
            3 => Ok(LastOperation::Move),
            other => Err(WordBankError::InvalidRecord(format!("last_operation={other}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LastOperation::Add => "add",
            LastOperation::Update => "update",
            LastOperation::Move => "move",
        }
    }
}

/// One stored rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: i64,
    pub scope: Scope,
    pub pattern: PatternKind,
    pub trigger: String,
    pub answer_id: i64,
    pub require_to_me: bool,
    pub creator_id: String,
    pub weight: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_operation: LastOperation,
    /// Previous answer text; set by an update, swapped by undo.
    pub undo_text: Option<String>,
    /// Reserved soft-disable flag. Nothing flips it yet.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerPayload {
    pub id: i64,
    pub text: String,
}

/// Input to `create`.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub scope: Scope,
    pub pattern: PatternKind,
    pub trigger: String,
    pub answer: String,
    pub creator_id: String,
    pub require_to_me: bool,
    pub weight: i64,
}

impl NewEntry {
    /// Rule with the default weight and no direct-address requirement.
    pub fn new(
        scope: Scope,
        pattern: PatternKind,
        trigger: impl Into<String>,
        answer: impl Into<String>,
        creator_id: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            pattern,
            trigger: trigger.into(),
            answer: answer.into(),
            creator_id: creator_id.into(),
            require_to_me: false,
            weight: DEFAULT_WEIGHT,
        }
    }

    pub fn to_me(mut self, require_to_me: bool) -> Self {
        self.require_to_me = require_to_me;
        self
    }

    pub fn weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }
}

/// Picks the entries an operation applies to, within a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(i64),
    Trigger {
        trigger: String,
        pattern: Option<PatternKind>,
        to_me: Option<bool>,
    },
}

impl Selector {
    pub fn id(id: i64) -> Self {
        Selector::Id(id)
    }

    /// Any rule with this trigger text, whatever its pattern kind or address flag.
    pub fn trigger(trigger: impl Into<String>) -> Self {
        Selector::Trigger {
            trigger: trigger.into(),
            pattern: None,
            to_me: None,
        }
    }

    pub fn trigger_with(trigger: impl Into<String>, pattern: PatternKind, to_me: bool) -> Self {
        Selector::Trigger {
            trigger: trigger.into(),
            pattern: Some(pattern),
            to_me: Some(to_me),
        }
    }
}

/// Destination of a move. `None` fields keep the entry's current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTarget {
    pub scope: Scope,
    pub pattern: Option<PatternKind>,
    pub to_me: Option<bool>,
}

impl MoveTarget {
    pub fn to(scope: Scope) -> Self {
        Self { scope, pattern: None, to_me: None }
    }
}

/// Filters for `clear`. All `None` clears the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearFilter {
    pub scope_kind: Option<ScopeKind>,
    pub scope_id: Option<String>,
    pub pattern: Option<PatternKind>,
    pub creator_id: Option<String>,
}

impl ClearFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn scope(scope: &Scope) -> Self {
        Self {
            scope_kind: Some(scope.kind),
            scope_id: if scope.is_global() { None } else { Some(scope.id.clone()) },
            ..Self::default()
        }
    }

    pub fn pattern(mut self, pattern: PatternKind) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn creator(mut self, creator_id: impl Into<String>) -> Self {
        self.creator_id = Some(creator_id.into());
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.scope_kind.is_none()
            && self.scope_id.is_none()
            && self.pattern.is_none()
            && self.creator_id.is_none()
    }

    /// The scope this filter names, or `None` when it names none unambiguously.
    pub fn resolved_scope(&self) -> Option<Scope> {
        match (self.scope_kind, self.scope_id.as_deref()) {
            (Some(ScopeKind::Global), _) => Some(Scope::global()),
            (Some(kind), Some(id)) => Some(Scope::new(kind, id)),
            _ => None,
        }
    }
}

/// One matched answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub entry_id: i64,
    pub answer_id: i64,
    pub answer: String,
    pub weight: i64,
    pub undo_text: Option<String>,
}

/// Result of a successful match: the text that was matched and every
/// qualifying answer from the local and global passes. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordEntry {
    pub key: String,
    pub require_to_me: bool,
    pub answers: Vec<Answer>,
}

impl WordEntry {
    /// Draw one answer with probability proportional to its weight.
    /// `None` only for an empty answer list, which a match never returns.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Answer> {
        let weights = self.answers.iter().map(|a| a.weight.max(MIN_WEIGHT) as u32);
        let dist = WeightedIndex::new(weights).ok()?;
        self.answers.get(dist.sample(rng))
    }

    pub fn choose_random(&self) -> Option<&Answer> {
        self.choose(&mut rand::thread_rng())
    }

    pub fn entry_ids(&self) -> Vec<i64> {
        self.answers.iter().map(|a| a.entry_id).collect()
    }
}
