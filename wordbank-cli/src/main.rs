use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use wordbank_core::commands::ensure_initialized_once;
use wordbank_core::{
    ClearFilter, MoveTarget, NewEntry, PatternKind, Scope, Selector, WordBank,
};

#[derive(Parser)]
#[command(
    name = "wordbank",
    about = "Inspect and maintain a word bank of trigger/answer rules"
)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args, Clone)]
#[group(required = true, multiple = false)]
struct ScopeArgs {
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    private: Option<String>,
    #[arg(long)]
    global: bool,
}

impl ScopeArgs {
    fn scope(&self) -> Scope {
        match (&self.group, &self.private) {
            (Some(g), _) => Scope::group(g.clone()),
            (_, Some(p)) => Scope::private(p.clone()),
            _ => Scope::global(),
        }
    }
}

#[derive(Args, Clone)]
#[group(id = "target", required = true, multiple = false)]
struct MoveTargetScope {
    #[arg(long)]
    to_group: Option<String>,
    #[arg(long)]
    to_private: Option<String>,
    #[arg(long)]
    to_global: bool,
}

#[derive(Args, Clone)]
struct MoveArgs {
    #[command(flatten)]
    scope: MoveTargetScope,
    #[arg(long, value_enum)]
    to_pattern: Option<PatternArg>,
    /// Set the direct-address flag of the moved rules (true/false)
    #[arg(long)]
    to_me: Option<bool>,
}

impl MoveArgs {
    fn target(&self) -> MoveTarget {
        let scope = match (&self.scope.to_group, &self.scope.to_private) {
            (Some(g), _) => Scope::group(g.clone()),
            (_, Some(p)) => Scope::private(p.clone()),
            _ => Scope::global(),
        };
        MoveTarget {
            pattern: self.to_pattern.map(Into::into),
            to_me: self.to_me,
            ..MoveTarget::to(scope)
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum PatternArg {
    Exact,
    Substring,
    Regex,
}

impl From<PatternArg> for PatternKind {
    fn from(p: PatternArg) -> Self {
        match p {
            PatternArg::Exact => PatternKind::Exact,
            PatternArg::Substring => PatternKind::Substring,
            PatternArg::Regex => PatternKind::Regex,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the workspace layout and default config
    Init,
    /// Add a rule
    Add {
        #[command(flatten)]
        scope: ScopeArgs,
        trigger: String,
        answer: String,
        #[arg(long, value_enum, default_value = "exact")]
        pattern: PatternArg,
        #[arg(long, default_value = "admin")]
        creator: String,
        #[arg(long)]
        to_me: bool,
        #[arg(long, default_value_t = 10)]
        weight: i64,
    },
    /// Match text and print one weighted answer
    Match {
        #[command(flatten)]
        scope: ScopeArgs,
        text: String,
        #[arg(long)]
        to_me: bool,
        /// Print every matching answer instead of drawing one
        #[arg(long)]
        all: bool,
    },
    /// Delete rules by trigger or id
    Delete {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, conflicts_with = "trigger")]
        id: Option<i64>,
        #[arg(long)]
        trigger: Option<String>,
        #[arg(long, value_enum, default_value = "exact")]
        pattern: PatternArg,
        #[arg(long)]
        to_me: bool,
    },
    /// Move rules to another group, private session, or the global scope
    Move {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, conflicts_with = "trigger")]
        id: Option<i64>,
        #[arg(long)]
        trigger: Option<String>,
        #[command(flatten)]
        to: MoveArgs,
    },
    /// Replace the answer of one or more rules
    Edit {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
        #[arg(long)]
        answer: String,
    },
    /// Revert the last edit of every rule with this trigger
    Undo {
        #[command(flatten)]
        scope: ScopeArgs,
        trigger: String,
    },
    /// Clear a scope, or everything with --all
    Clear {
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        private: Option<String>,
        #[arg(long)]
        global: bool,
        #[arg(long, value_enum)]
        pattern: Option<PatternArg>,
        #[arg(long)]
        creator: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// List triggers of a scope
    List {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Show the rules behind a trigger or id
    Lookup {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, conflicts_with = "trigger")]
        id: Option<i64>,
        #[arg(long)]
        trigger: Option<String>,
    },
    /// List every trigger, in any scope, whose answer is exactly this text
    Reverse { answer: String },
    /// Recent mutations in a scope
    Activity {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        minutes: Option<i64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("wordbank_core=debug")
    } else {
        EnvFilter::new("wordbank_core=warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

fn selector(id: Option<i64>, trigger: Option<String>) -> Result<Selector> {
    match (id, trigger) {
        (Some(id), _) => Ok(Selector::id(id)),
        (None, Some(t)) => Ok(Selector::trigger(t)),
        (None, None) => bail!("either --id or --trigger is required"),
    }
}

fn run(cmd: Cmd) -> Result<()> {
    if let Cmd::Init = cmd {
        let report = ensure_initialized_once()?;
        for item in &report.created {
            println!("created  {item}");
        }
        for item in &report.existed {
            println!("exists   {item}");
        }
        println!("word bank ready at {}", report.root.display());
        return Ok(());
    }

    let mut bank = WordBank::new()?;
    tracing::debug!(stats = ?bank.stats()?, "word bank opened");

    match cmd {
        Cmd::Init => {}
        Cmd::Add {
            scope,
            trigger,
            answer,
            pattern,
            creator,
            to_me,
            weight,
        } => {
            let new = NewEntry::new(scope.scope(), pattern.into(), trigger, answer, creator)
                .to_me(to_me)
                .weight(weight);
            let (id, _) = bank.create(&new)?;
            println!("rule added, id {id}");
        }
        Cmd::Match {
            scope,
            text,
            to_me,
            all,
        } => match bank.match_text(&scope.scope(), &text, to_me)? {
            None => println!("no match"),
            Some(hit) if all => {
                for a in &hit.answers {
                    println!("#{} (w{}) {}", a.entry_id, a.weight, a.answer);
                }
            }
            Some(hit) => {
                if let Some(a) = hit.choose_random() {
                    println!("{}", a.answer);
                }
            }
        },
        Cmd::Delete {
            scope,
            id,
            trigger,
            pattern,
            to_me,
        } => {
            let scope = scope.scope();
            let (removed, ok) = match (id, trigger) {
                (Some(id), _) => bank.delete_by_id(&scope, id)?,
                (None, Some(t)) => bank.delete_by_trigger(&scope, &t, pattern.into(), to_me)?,
                (None, None) => bail!("either --id or --trigger is required"),
            };
            if ok {
                println!("deleted {} rule(s)", removed.len());
            } else {
                println!("nothing to delete");
            }
        }
        Cmd::Move { scope, id, trigger, to } => {
            let target = to.target();
            if bank.move_entries(&scope.scope(), &selector(id, trigger)?, &target)? {
                println!("moved to {}", target.scope);
            } else {
                println!("nothing to move");
            }
        }
        Cmd::Edit { ids, answer } => {
            let (updated, ok) = bank.update_answer(&ids, &answer)?;
            if ok {
                println!("updated {updated:?}");
            } else {
                println!("no such rule");
            }
        }
        Cmd::Undo { scope, trigger } => {
            let restored = bank.undo_last(&scope.scope(), &trigger)?;
            if restored.is_empty() {
                println!("nothing to undo");
            } else {
                println!("reverted {} answer(s)", restored.len());
            }
        }
        Cmd::Clear {
            group,
            private,
            global,
            pattern,
            creator,
            all,
        } => {
            let filter = if all {
                ClearFilter::all()
            } else {
                let scope = match (group, private, global) {
                    (Some(g), None, false) => Scope::group(g),
                    (None, Some(p), false) => Scope::private(p),
                    (None, None, true) => Scope::global(),
                    _ => bail!("name exactly one scope, or pass --all"),
                };
                ClearFilter {
                    pattern: pattern.map(Into::into),
                    creator_id: creator,
                    ..ClearFilter::scope(&scope)
                }
            };
            if bank.clear(&filter)? {
                println!("cleared");
            } else {
                println!("filter not understood; nothing cleared");
            }
        }
        Cmd::List { scope } => {
            for t in bank.list_triggers(&scope.scope())? {
                println!("{t}");
            }
        }
        Cmd::Lookup { scope, id, trigger } => {
            match bank.describe(&scope.scope(), &selector(id, trigger)?)? {
                Some(text) => print!("{text}"),
                None => println!("no such rule"),
            }
        }
        Cmd::Reverse { answer } => {
            for t in bank.triggers_for_answer(&answer)? {
                println!("{t}");
            }
        }
        Cmd::Activity { scope, minutes } => {
            let window = minutes.unwrap_or_else(|| bank.default_window_minutes());
            println!("{}", bank.recent_activity(&scope.scope(), window)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_target(args: &[&str]) -> MoveTarget {
        let argv = ["wordbank", "move", "--group", "1", "--id", "3"]
            .iter()
            .chain(args)
            .copied();
        match Cli::try_parse_from(argv).expect("parse").cmd {
            Cmd::Move { to, .. } => to.target(),
            _ => panic!("not a move"),
        }
    }

    #[test]
    fn move_to_global_keeps_pattern_and_flag() {
        let target = move_target(&["--to-global"]);
        assert_eq!(target, MoveTarget::to(Scope::global()));
    }

    #[test]
    fn move_sets_direct_address_flag() {
        let target = move_target(&["--to-private", "9", "--to-me", "true", "--to-pattern", "regex"]);
        assert_eq!(target.scope, Scope::private("9"));
        assert_eq!(target.to_me, Some(true));
        assert_eq!(target.pattern, Some(PatternKind::Regex));

        assert_eq!(move_target(&["--to-group", "2", "--to-me", "false"]).to_me, Some(false));
    }

    #[test]
    fn move_needs_exactly_one_target_scope() {
        let base = ["wordbank", "move", "--group", "1", "--id", "3"];
        assert!(Cli::try_parse_from(base).is_err());
        let both = base.iter().chain(&["--to-global", "--to-group", "2"]).copied();
        assert!(Cli::try_parse_from(both).is_err());
    }
}
