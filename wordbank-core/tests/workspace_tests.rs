use std::fs;

use serde_json::Value;
use wordbank_core::commands::ensure_initialized_at;
use wordbank_core::config::CoreConfig;
use wordbank_core::services::Audit;
use wordbank_core::{ClearFilter, NewEntry, PatternKind, Scope, WordBank};

fn read_lines(path: &std::path::Path) -> anyhow::Result<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}

#[test]
fn config_defaults_apply_to_missing_sections() -> anyhow::Result<()> {
    let cfg = CoreConfig::from_toml("[activity]\nwindow_minutes = 30\n")?;
    assert_eq!(cfg.activity.window_minutes, 30);
    assert_eq!(cfg.storage.db_path, std::path::PathBuf::from("cache/wordbank.db"));
    assert!(cfg.services.audit_enabled);
    assert_eq!(cfg.policies.log_preview_len, 160);

    let empty = CoreConfig::from_toml("")?;
    assert_eq!(empty.activity.window_minutes, 10);
    Ok(())
}

#[test]
fn bad_config_is_an_error() {
    assert!(CoreConfig::from_toml("[activity]\nwindow_minutes = \"soon\"\n").is_err());
}

#[test]
fn load_without_file_resolves_default_paths_under_root() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = CoreConfig::load(dir.path())?;
    assert_eq!(cfg.storage.db_path, dir.path().join("cache/wordbank.db"));
    assert_eq!(cfg.logbook.actions, dir.path().join("logbook/actions.jsonl"));
    Ok(())
}

#[test]
fn init_creates_layout_and_is_idempotent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("wb");

    let first = ensure_initialized_at(&root)?;
    assert!(first.created.iter().any(|c| c == "config.toml"));
    assert!(first.created.iter().any(|c| c == "actions.jsonl"));
    assert!(root.join("cache").is_dir());
    assert!(root.join("logbook").is_dir());

    let seeded = read_lines(&first.config.logbook.actions)?;
    assert_eq!(seeded.len(), 1);
    assert_eq!(seeded[0]["event"], "system_init");

    let second = ensure_initialized_at(&root)?;
    assert!(second.created.is_empty());
    assert!(second.existed.iter().any(|c| c == "config.toml"));
    assert_eq!(read_lines(&second.config.logbook.actions)?.len(), 1);
    Ok(())
}

#[test]
fn user_config_overrides_are_honoured() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    fs::write(
        root.join("config.toml"),
        "[activity]\nwindow_minutes = 45\n\n[services]\naudit_enabled = false\n",
    )?;

    let report = ensure_initialized_at(root)?;
    assert!(report.existed.iter().any(|c| c == "config.toml"));

    let mut bank = WordBank::from_config(&report.config)?;
    assert_eq!(bank.default_window_minutes(), 45);
    bank.create(&NewEntry::new(Scope::group("1"), PatternKind::Exact, "a", "b", "u"))?;
    // Only the init seed line; audit is off.
    assert_eq!(read_lines(&report.config.logbook.actions)?.len(), 1);
    Ok(())
}

#[test]
fn successful_writes_are_audited() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let report = ensure_initialized_at(dir.path())?;
    let mut bank = WordBank::from_config(&report.config)?;
    let g = Scope::group("1");

    let (id, _) = bank.create(&NewEntry::new(g.clone(), PatternKind::Exact, "a", "b", "u"))?;
    bank.update_answer(&[id], "c")?;
    // No-op delete is not audited.
    bank.delete_by_trigger(&g, "missing", PatternKind::Exact, false)?;
    bank.clear(&ClearFilter::all())?;

    let lines = read_lines(&report.config.logbook.actions)?;
    let actions: Vec<&str> = lines
        .iter()
        .filter(|l| l["event"] == "action")
        .filter_map(|l| l["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["create", "update", "clear"]);

    let create = lines.iter().find(|l| l["action"] == "create").expect("create line");
    assert_eq!(create["agent"], "wordbank");
    assert_eq!(create["details"]["id"], id);
    assert_eq!(create["details"]["scope"], "group:1");
    assert_eq!(lines.last().expect("clear line")["severity"], "high");
    Ok(())
}

#[test]
fn audit_preview_is_single_line_and_bounded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("log").join("actions.jsonl");
    let audit = Audit::at(&path);
    assert_eq!(audit.path(), Some(path.as_path()));

    let long = "x".repeat(500);
    let p = audit.preview(&long);
    assert_eq!(p.chars().count(), 161);
    assert!(p.ends_with('…'));
    assert_eq!(audit.preview("two\nlines"), "two lines");

    let mut bank = WordBank::open_in_memory()?.with_audit(audit);
    bank.create(&NewEntry::new(Scope::global(), PatternKind::Regex, "r", "s", "u"))?;
    let lines = read_lines(&path)?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["details"]["pattern"], "regex");
    assert_eq!(lines[0]["details"]["scope"], "global");
    Ok(())
}

#[test]
fn disabled_audit_still_previews_with_default_length() {
    let audit = Audit::disabled();
    assert!(!audit.is_enabled());
    assert_eq!(audit.path(), None);
    assert_eq!(audit.preview("short answer"), "short answer");
    assert_eq!(audit.preview(&"y".repeat(500)).chars().count(), 161);
}
