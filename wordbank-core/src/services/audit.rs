//! services/audit.rs
//! Mutation logbook: one JSON line per successful write.
//!
//! - Writes `actions.jsonl` under the configured logbook directory.
//! - Never fails the caller; write errors are logged and dropped.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;

const DEFAULT_PREVIEW_LEN: usize = 160;

#[derive(Debug, Clone)]
pub struct Audit {
    actions: Option<PathBuf>,
    preview_len: usize,
}

impl Audit {
    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self {
            actions: cfg
                .services
                .audit_enabled
                .then(|| cfg.logbook.actions.clone()),
            preview_len: cfg.policies.log_preview_len,
        }
    }

    /// No logbook; used by in-memory stores.
    pub fn disabled() -> Self {
        Self {
            actions: None,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            actions: Some(path.into()),
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.actions.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.actions.as_deref()
    }

    /// Record a mutation.
    ///
    /// # Arguments
    /// * `action` — short verb label (e.g. `"create"`, `"move"`).
    /// * `details` — JSON payload (ids, scope, counts).
    /// * `severity` — `"low" | "medium" | "high"`.
    pub fn record_action(&self, action: &str, details: &Value, severity: &str) {
        let Some(path) = self.actions.as_deref() else {
            return;
        };
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": "action",
            "agent": "wordbank",
            "action": action,
            "severity": severity,
            "details": details
        });
        if let Err(e) = append_jsonl(path, &entry) {
            tracing::warn!(path = %path.display(), error = %e, "audit write failed");
        }
    }

    /// Single-line preview of user text, truncated on a char boundary.
    pub fn preview(&self, s: &str) -> String {
        let t = s.replace('\n', " ");
        if t.chars().count() <= self.preview_len {
            return t;
        }
        let mut out: String = t.chars().take(self.preview_len).collect();
        out.push('…');
        out
    }
}

/// Append a single JSON value as a line to a JSONL file, creating parents.
fn append_jsonl<S: Serialize>(path: &Path, val: &S) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(val)?;
    let mut f = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{line}")
}
