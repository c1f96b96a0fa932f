use rand::SeedableRng;
use rand::rngs::StdRng;
use wordbank_core::services::matcher::RegexCache;
use wordbank_core::{NewEntry, PatternKind, Scope, WordBank};

fn rule(scope: Scope, pattern: PatternKind, trigger: &str, answer: &str) -> NewEntry {
    NewEntry::new(scope, pattern, trigger, answer, "10000")
}

fn answers_of(bank: &WordBank, scope: &Scope, text: &str, to_me: bool) -> anyhow::Result<Vec<String>> {
    Ok(bank
        .match_text(scope, text, to_me)?
        .map(|hit| hit.answers.into_iter().map(|a| a.answer).collect())
        .unwrap_or_default())
}

#[test]
fn exact_rule_fires_only_on_identical_text() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Exact, "hello", "world"))?;

    assert_eq!(answers_of(&bank, &g, "hello", false)?, vec!["world"]);
    assert!(bank.match_text(&g, "hello there", false)?.is_none());
    assert!(bank.match_text(&g, "hell", false)?.is_none());
    // Other groups never see it.
    assert!(bank.match_text(&Scope::group("2"), "hello", false)?.is_none());
    Ok(())
}

#[test]
fn substring_rule_fires_when_trigger_is_contained() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Substring, "include", "yes"))?;

    assert_eq!(answers_of(&bank, &g, "test_include", false)?, vec!["yes"]);
    assert_eq!(answers_of(&bank, &g, "include", false)?, vec!["yes"]);
    assert!(bank.match_text(&g, "wtf", false)?.is_none());
    Ok(())
}

#[test]
fn regex_rule_searches_anywhere_in_text() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Regex, "[你|我|他]好", "hi"))?;

    assert_eq!(answers_of(&bank, &g, "你好", false)?, vec!["hi"]);
    assert_eq!(answers_of(&bank, &g, "大家 我好 啊", false)?, vec!["hi"]);
    assert!(bank.match_text(&g, "谁好", false)?.is_none());
    Ok(())
}

#[test]
fn regex_dot_spans_lines() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Regex, "start.*end", "multi"))?;

    assert_eq!(answers_of(&bank, &g, "start\nmiddle\nend", false)?, vec!["multi"]);
    Ok(())
}

#[test]
fn invalid_regex_is_inert_and_does_not_break_other_rules() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Regex, "([unclosed", "never"))?;
    bank.create(&rule(g.clone(), PatternKind::Substring, "unclosed", "fallback"))?;

    assert_eq!(answers_of(&bank, &g, "([unclosed", false)?, vec!["fallback"]);
    Ok(())
}

#[test]
fn global_rules_are_unioned_into_every_scope() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Exact, "ping", "local pong"))?;
    bank.create(&rule(Scope::global(), PatternKind::Exact, "ping", "global pong"))?;

    assert_eq!(
        answers_of(&bank, &g, "ping", false)?,
        vec!["local pong", "global pong"]
    );
    // A scope with no local rules still sees the global one.
    assert_eq!(
        answers_of(&bank, &Scope::private("42"), "ping", false)?,
        vec!["global pong"]
    );
    // Matching in global itself does not count global twice.
    assert_eq!(
        answers_of(&bank, &Scope::global(), "ping", false)?,
        vec!["global pong"]
    );
    Ok(())
}

#[test]
fn direct_address_flag_must_be_equal() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Exact, "hey", "addressed").to_me(true))?;
    bank.create(&rule(Scope::global(), PatternKind::Exact, "hey", "ambient"))?;

    assert_eq!(answers_of(&bank, &g, "hey", true)?, vec!["addressed"]);
    assert_eq!(answers_of(&bank, &g, "hey", false)?, vec!["ambient"]);
    Ok(())
}

#[test]
fn match_result_carries_key_and_entry_ids() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    let (id, created) = bank.create(&rule(g.clone(), PatternKind::Exact, "key", "value").weight(3))?;
    assert!(created);

    let hit = bank.match_text(&g, "key", false)?.expect("match");
    assert_eq!(hit.key, "key");
    assert!(!hit.require_to_me);
    assert_eq!(hit.entry_ids(), vec![id]);
    assert_eq!(hit.answers[0].weight, 3);
    assert_eq!(hit.answers[0].undo_text, None);
    Ok(())
}

#[test]
fn weighted_choice_follows_weights() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Exact, "roll", "heavy").weight(9))?;
    bank.create(&rule(g.clone(), PatternKind::Exact, "roll", "light").weight(1))?;

    let hit = bank.match_text(&g, "roll", false)?.expect("match");
    assert_eq!(hit.answers.len(), 2);
    let mut rng = StdRng::seed_from_u64(7);
    let mut heavy = 0;
    for _ in 0..2000 {
        if hit.choose(&mut rng).expect("non-empty").answer == "heavy" {
            heavy += 1;
        }
    }
    // Expected 1800; allow generous slack.
    assert!((1650..=1950).contains(&heavy), "heavy drawn {heavy} times");
    Ok(())
}

#[test]
fn first_created_rule_gets_id_one_and_resolves() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    let (id, _) = bank.create(&rule(g.clone(), PatternKind::Exact, "a", "b"))?;
    assert_eq!(id, 1);

    let entry = bank.entry(id)?.expect("entry");
    let payload = bank.answer(entry.answer_id)?.expect("payload");
    assert_eq!(payload.text, "b");
    assert!(entry.active);
    assert_eq!(answers_of(&bank, &g, "a", false)?, vec!["b"]);
    Ok(())
}

#[test]
fn regex_cache_compiles_each_pattern_once() {
    let cache = RegexCache::new();
    assert!(cache.is_empty());

    assert!(cache.is_match("^a+$", "aaa"));
    assert!(!cache.is_match("^a+$", "ab"));
    assert_eq!(cache.len(), 1);

    // Broken patterns are remembered as inert.
    assert!(!cache.is_match("([bad", "([bad"));
    assert!(!cache.is_match("([bad", "anything"));
    assert_eq!(cache.len(), 2);

    assert!(PatternKind::Regex.resolves("b.d", "bad", &cache));
    assert!(PatternKind::Substring.resolves("ad", "bad", &cache));
    assert_eq!(cache.len(), 3);
}

#[test]
fn repeated_regex_matches_stay_consistent() -> anyhow::Result<()> {
    let mut bank = WordBank::open_in_memory()?;
    let g = Scope::group("1");
    bank.create(&rule(g.clone(), PatternKind::Regex, r"^\d{3}$", "three digits"))?;
    bank.create(&rule(Scope::global(), PatternKind::Regex, "(broken", "never"))?;

    for _ in 0..3 {
        assert_eq!(answers_of(&bank, &g, "123", false)?, vec!["three digits"]);
        assert!(bank.match_text(&g, "1234", false)?.is_none());
    }
    Ok(())
}
