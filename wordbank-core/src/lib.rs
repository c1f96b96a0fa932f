//! Wordbank-Core: persistent trigger → answer rules scoped to a group, a
//! private session, or the global fallback.
//!
//! Everything goes through [`WordBank`]; the `services` modules hold the
//! stores, the matcher, and the mutation coordinator it delegates to.

pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod services;

pub use commands::WordBank;
pub use error::{Result, WordBankError};
pub use model::{
    Answer, AnswerPayload, ClearFilter, Entry, LastOperation, MoveTarget, NewEntry, PatternKind,
    Scope, ScopeKind, Selector, WordEntry,
};
pub use services::NO_RECENT_ACTIVITY;
