use chrono::Duration;
use wordbank_core::services::activity::elapsed_label;
use wordbank_core::{
    LastOperation, MoveTarget, NO_RECENT_ACTIVITY, NewEntry, PatternKind, Scope, Selector, WordBank,
};

#[test]
fn empty_store_reports_sentinel() -> anyhow::Result<()> {
    let bank = WordBank::open_in_memory()?;
    assert_eq!(bank.recent_activity(&Scope::group("1"), 10)?, NO_RECENT_ACTIVITY);
    Ok(())
}

#[test]
fn fresh_rule_is_reported_with_seconds() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    let (id, _) = bank.create(&NewEntry::new(g.clone(), PatternKind::Exact, "a", "b", "u"))?;
    let entry = bank.entry(id)?.expect("entry");

    let report = bank.recent_activity_at(&g, 10, entry.updated_at + Duration::seconds(5))?;
    assert_eq!(report, format!("{id}.[add - 5 s ago] trigger: a, answers:\n[1]-b\n"));
    Ok(())
}

#[test]
fn older_mutations_are_reported_in_minutes() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    let (id, _) = bank.create(&NewEntry::new(g.clone(), PatternKind::Exact, "a", "b", "u"))?;
    bank.update_answer(&[id], "c")?;
    let entry = bank.entry(id)?.expect("entry");

    let report = bank.recent_activity_at(&g, 10, entry.updated_at + Duration::minutes(3))?;
    assert_eq!(report, format!("{id}.[update - 3 min ago] trigger: a, answers:\n[1]-c\n"));
    Ok(())
}

#[test]
fn window_excludes_stale_entries_and_other_scopes() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    let (id, _) = bank.create(&NewEntry::new(g.clone(), PatternKind::Exact, "a", "b", "u"))?;
    let stamp = bank.entry(id)?.expect("entry").updated_at;

    assert_eq!(
        bank.recent_activity_at(&g, 10, stamp + Duration::minutes(11))?,
        NO_RECENT_ACTIVITY
    );
    assert_eq!(
        bank.recent_activity_at(&Scope::group("2"), 10, stamp)?,
        NO_RECENT_ACTIVITY
    );
    // Nothing is reported before it happened.
    assert_eq!(
        bank.recent_activity_at(&g, 10, stamp - Duration::minutes(1))?,
        NO_RECENT_ACTIVITY
    );
    Ok(())
}

#[test]
fn moved_rule_shows_up_in_destination_scope() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let from = Scope::group("1");
    let to = Scope::group("2");
    let (id, _) = bank.create(&NewEntry::new(from.clone(), PatternKind::Exact, "a", "b", "u"))?;
    bank.move_entries(&from, &Selector::id(id), &MoveTarget::to(to.clone()))?;

    let items = bank.recent_items(&to, 10)?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].entry_id, id);
    assert_eq!(items[0].operation, LastOperation::Move);
    assert_eq!(items[0].answers, vec!["b"]);
    assert!(bank.recent_items(&from, 10)?.is_empty());
    Ok(())
}

#[test]
fn huge_window_does_not_overflow() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&NewEntry::new(g.clone(), PatternKind::Exact, "a", "b", "u"))?;
    assert_eq!(bank.recent_items(&g, i64::MAX)?.len(), 1);
    Ok(())
}

#[test]
fn elapsed_label_switches_at_one_minute() {
    assert_eq!(elapsed_label(Duration::seconds(0)), "0 s ago");
    assert_eq!(elapsed_label(Duration::seconds(59)), "59 s ago");
    assert_eq!(elapsed_label(Duration::seconds(60)), "1 min ago");
    assert_eq!(elapsed_label(Duration::minutes(9)), "9 min ago");
}
