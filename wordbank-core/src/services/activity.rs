// src/services/activity.rs
//! Activity log view: human-facing reports built from entry timestamps and
//! last-operation metadata.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::model::{LastOperation, Scope, Selector};
use crate::services::entries::{self, EntryFilter};
use crate::services::matcher::join_answers;

/// Returned instead of an empty report.
pub const NO_RECENT_ACTIVITY: &str = "no recent activity";

const MAX_WINDOW_MINUTES: i64 = 100 * 365 * 24 * 60;

#[derive(Debug, Clone, Serialize)]
pub struct ActivityItem {
    pub entry_id: i64,
    pub operation: LastOperation,
    pub trigger: String,
    pub answers: Vec<String>,
    pub undo_text: Option<String>,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Entries of `scope` touched within `window_minutes` before `now`.
pub fn recent_items(
    conn: &Connection,
    scope: &Scope,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> Result<Vec<ActivityItem>> {
    let window = Duration::minutes(window_minutes.clamp(0, MAX_WINDOW_MINUTES));
    let since = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
    let hits = entries::find(conn, &EntryFilter::new().scope(scope).updated_since(&since))?;
    let answers = join_answers(conn, &hits)?;

    Ok(hits
        .into_iter()
        .zip(answers)
        .filter(|(e, _)| e.updated_at.max(e.created_at) <= now)
        .map(|(e, a)| ActivityItem {
            entry_id: e.id,
            operation: e.last_operation,
            elapsed: now - e.updated_at.max(e.created_at),
            trigger: e.trigger,
            answers: vec![a.answer],
            undo_text: e.undo_text,
        })
        .collect())
}

/// Minutes when at least one, seconds otherwise.
pub fn elapsed_label(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes();
    if minutes >= 1 {
        format!("{minutes} min ago")
    } else {
        format!("{} s ago", elapsed.num_seconds().max(0))
    }
}

pub fn render(items: &[ActivityItem]) -> String {
    if items.is_empty() {
        return NO_RECENT_ACTIVITY.to_string();
    }
    let mut out = String::new();
    for item in items {
        out.push_str(&format!(
            "{}.[{} - {}] trigger: {}, answers:\n",
            item.entry_id,
            item.operation.as_str(),
            elapsed_label(item.elapsed),
            item.trigger
        ));
        for (i, answer) in item.answers.iter().enumerate() {
            out.push_str(&format!("[{}]-{}\n", i + 1, answer));
        }
    }
    out
}

/// Rendered recent-activity report for `scope`.
pub fn recent_activity(
    conn: &Connection,
    scope: &Scope,
    window_minutes: i64,
    now: DateTime<Utc>,
) -> Result<String> {
    let items = recent_items(conn, scope, window_minutes, now)?;
    Ok(render(&items))
}

/// Id, trigger and answers of the selected entries, numbered across all of
/// them. The undo slot is shown in brackets when it differs from the current
/// answer.
pub fn describe(conn: &Connection, scope: &Scope, selector: &Selector) -> Result<Option<String>> {
    let hits = entries::find(conn, &EntryFilter::new().scope(scope).selector(selector))?;
    if hits.is_empty() {
        return Ok(None);
    }
    let answers = join_answers(conn, &hits)?;

    let mut out = String::new();
    for (n, (e, a)) in hits.iter().zip(&answers).enumerate() {
        out.push_str(&format!(
            "#{} [{}{}] trigger: {}\n",
            e.id,
            e.pattern.as_str(),
            if e.require_to_me { ", to me" } else { "" },
            e.trigger
        ));
        match a.undo_text.as_deref() {
            Some(prev) if prev != a.answer => {
                out.push_str(&format!("  {}. {} [{}]\n", n + 1, a.answer, prev));
            }
            _ => out.push_str(&format!("  {}. {}\n", n + 1, a.answer)),
        }
    }
    Ok(Some(out))
}
