// wordbank-core/src/commands/init.rs

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub config: CoreConfig,
    pub created: Vec<String>,
    pub existed: Vec<String>,
}

// ---------- single global init gate ----------

static INIT: OnceCell<InitReport> = OnceCell::new();

/// Idempotent global initializer. Safe to call often.
pub fn ensure_initialized_once() -> Result<&'static InitReport> {
    INIT.get_or_try_init(|| ensure_initialized_at(&wordbank_root()))
}

/// Resolve the workspace root. `WORDBANK_ROOT` overrides the default.
pub fn wordbank_root() -> PathBuf {
    std::env::var_os("WORDBANK_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".wordbank"))
}

/// Create (or confirm) the workspace layout under `root` and load its config.
pub fn ensure_initialized_at(root: &Path) -> Result<InitReport> {
    let mut created = Vec::new();
    let mut existed = Vec::new();

    ensure_dir(root, "", &mut created, &mut existed)?;
    ensure_dir(root, "cache", &mut created, &mut existed)?;
    ensure_dir(root, "logbook", &mut created, &mut existed)?;

    ensure_file(
        root,
        "config.toml",
        Some(DEFAULT_CONFIG_TOML),
        &mut created,
        &mut existed,
    )?;

    let config = CoreConfig::load(root)?;
    seed_jsonl(&config.logbook.actions, &mut created, &mut existed)?;

    Ok(InitReport {
        root: root.to_path_buf(),
        config,
        created,
        existed,
    })
}

fn ensure_dir(
    base: &Path,
    rel: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = if rel.is_empty() { base.to_path_buf() } else { base.join(rel) };
    let label = if rel.is_empty() { ".".to_string() } else { rel.to_string() };
    if p.exists() {
        existed.push(label);
        return Ok(());
    }
    fs::create_dir_all(&p).with_context(|| format!("create_dir_all({:?})", p))?;
    created.push(label);
    Ok(())
}

fn ensure_file(
    base: &Path,
    rel_file: &str,
    content_if_absent: Option<&str>,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = base.join(rel_file);
    if p.exists() {
        existed.push(rel_file.to_string());
        return Ok(());
    }
    write_atomic(&p, content_if_absent.unwrap_or("").as_bytes())?;
    created.push(rel_file.to_string());
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all({:?})", parent))?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .with_context(|| format!("open temp file {:?}", tmp))?;
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

/// Seed an empty logbook with a `system_init` line.
fn seed_jsonl(path: &Path, created: &mut Vec<String>, existed: &mut Vec<String>) -> Result<()> {
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let init_line = serde_json::json!({
        "timestamp": Utc::now().to_rfc3339(),
        "event": "system_init",
        "agent": "system",
        "data": { "version": env!("CARGO_PKG_VERSION") }
    })
    .to_string();

    if !path.exists() {
        write_atomic(path, format!("{init_line}\n").as_bytes())?;
        created.push(label);
        return Ok(());
    }
    existed.push(label);
    if fs::metadata(path)?.len() == 0 {
        let mut f = OpenOptions::new().append(true).open(path)?;
        f.write_all(init_line.as_bytes())?;
        f.write_all(b"\n")?;
    }
    Ok(())
}

// ---------- defaults ----------

const DEFAULT_CONFIG_TOML: &str = r#"[storage]
db_path = "cache/wordbank.db"

[activity]
window_minutes = 10

[logbook]
path = "logbook"
actions = "logbook/actions.jsonl"

[services]
audit_enabled = true

[policies]
log_preview_len = 160
"#;
