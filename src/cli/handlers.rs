use std::path::PathBuf;
use std::sync::mpsc;

use chrono::{Local, NaiveDate};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::cli::commands::*;
use crate::cli::output;
use crate::model::config::Config;
use crate::model::repeat::RepeatRule;
use crate::model::task::NoteId;
use crate::ops::{RelocationOutcome, Relocator, ScanController};
use crate::parse::parse_line;
use crate::prompt::{FixedPrompt, Prompt};
use crate::store::{DirStore, NoteStore};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let dir: PathBuf = match cli.notes_dir {
        Some(ref d) => std::fs::canonicalize(d)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", d, e))?,
        None => std::env::current_dir()?,
    };
    let config = Config::load(&dir)?;
    let mut store = DirStore::new(&dir);

    match cli.command {
        Commands::Mv(args) => cmd_mv(args, &mut store, &config, json),
        Commands::Repeat(args) => cmd_repeat(args, &mut store, &config, json),
        Commands::Done(args) => cmd_done(args, &mut store, &config, json),
        Commands::Scan(args) => cmd_scan(args, &mut store, &config, json),
        Commands::Show(args) => cmd_show(args, &store, json),
        Commands::Watch => cmd_watch(store, config, &dir),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Note arguments are either a date (canonical `YYYY-MM-DD` id) or a
/// verbatim title. Neither form creates the note; only relocation
/// destinations are get-or-created.
fn note_id(arg: &str) -> NoteId {
    NoteId::new(arg)
}

/// CLI line numbers are 1-based; the library's are 0-based.
fn line_index(line: usize) -> Result<usize, Box<dyn std::error::Error>> {
    line.checked_sub(1)
        .ok_or_else(|| "line numbers start at 1".into())
}

fn print_outcome(outcome: &RelocationOutcome, json: bool) {
    if json {
        let out = output::move_to_json(outcome);
        println!("{}", serde_json::to_string_pretty(&out).unwrap());
    } else {
        println!("-> {}: {}", outcome.destination, outcome.new_line);
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_mv(
    args: MvArgs,
    store: &mut DirStore,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let note = note_id(&args.note);
    let line = line_index(args.line)?;
    let task = Relocator::new(store, config).task_at(&note, line)?;

    let mut prompt = FixedPrompt {
        date: match args.date {
            Some(ref d) => Some(
                d.parse::<NaiveDate>()
                    .map_err(|_| format!("invalid date '{}'", d))?,
            ),
            None => None,
        },
        rule: None,
    };
    let default = task.due.unwrap_or_else(|| Local::now().date_naive());
    let Some(dest_date) = prompt.pick_date(default) else {
        println!("cancelled");
        return Ok(());
    };

    let outcome = Relocator::new(store, config).relocate(&note, line, &task, dest_date)?;
    print_outcome(&outcome, json);
    Ok(())
}

fn cmd_repeat(
    args: RepeatArgs,
    store: &mut DirStore,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let note = note_id(&args.note);
    let line = line_index(args.line)?;

    let mut prompt = FixedPrompt {
        date: None,
        rule: Some(args.rule.parse::<RepeatRule>()?),
    };
    let Some(rule) = prompt.pick_rule() else {
        println!("cancelled");
        return Ok(());
    };

    let new_line = Relocator::new(store, config).set_repeat(&note, line, rule)?;
    if json {
        println!("{}", serde_json::json!({ "line": new_line }));
    } else {
        println!("{}", new_line);
    }
    Ok(())
}

fn cmd_done(
    args: DoneArgs,
    store: &mut DirStore,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let note = note_id(&args.note);
    let line = line_index(args.line)?;

    match Relocator::new(store, config).complete(&note, line)? {
        Some(outcome) => print_outcome(&outcome, json),
        None if json => println!("{}", serde_json::json!({ "done": true })),
        None => println!("done"),
    }
    Ok(())
}

fn cmd_scan(
    args: ScanArgs,
    store: &mut DirStore,
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let note = note_id(&args.note);
    let controller = ScanController::new(config.clone());
    let report = controller.scan(store, &note);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.fired.is_empty() && report.errors.is_empty() {
        println!("{}: nothing due", report.note);
    } else {
        for line in output::format_scan_report(&report) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_show(
    args: ShowArgs,
    store: &DirStore,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let note = note_id(&args.note);
    let lines = store.read_lines(&note)?;

    let tasks: Vec<_> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, raw)| parse_line(raw, idx, &note).map(|t| (idx, t)))
        .collect();

    if json {
        let out: Vec<_> = tasks
            .iter()
            .map(|(idx, t)| output::task_to_json(t, idx + 1))
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (idx, task) in &tasks {
            println!("{}", output::format_task_line(task, idx + 1));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Watch mode
// ---------------------------------------------------------------------------

/// Stand-in for the host's focus-change notifications: a saved note is a
/// note the user just left. Rescans triggered by the controller's own
/// writes settle immediately, since a relocated task is no longer due.
fn cmd_watch(
    mut store: DirStore,
    config: Config,
    dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel::<Vec<NoteId>>();
    let dir_owned = dir.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            let event = match result {
                Ok(e) => e,
                Err(_) => return,
            };
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {}
                _ => return,
            }
            let notes: Vec<NoteId> = event
                .paths
                .into_iter()
                .filter(|p| p.starts_with(&dir_owned))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
                .filter_map(|p| {
                    p.file_stem()
                        .and_then(|s| s.to_str())
                        .map(NoteId::new)
                })
                .collect();
            if !notes.is_empty() {
                let _ = tx.send(notes);
            }
        },
        notify::Config::default(),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    let mut controller = ScanController::new(config);
    println!("watching {}", dir.display());

    for notes in rx {
        for note in notes {
            for report in controller.focus_changed(&mut store, Some(note)) {
                for line in output::format_scan_report(&report) {
                    println!("{}", line);
                }
            }
        }
    }
    Ok(())
}
