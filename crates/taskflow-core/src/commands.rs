use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{Zone, parse_due_date};
use crate::hooks::HookRunner;
use crate::kv::KeyValueStore;
use crate::notify::Change;
use crate::render::{Renderer, summarize};
use crate::store::TaskStore;
use crate::task::Priority;
use crate::view::{Filter, SortBy};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "done", "toggle", "delete", "undo", "move", "clear", "filter", "sort",
        "stats", "export", "shell", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Everything one CLI process keeps alive between commands. Changes the
/// store announces are collected and handed to the on-change hooks after
/// each command.
pub struct Session<K: KeyValueStore> {
    pub store: TaskStore<K>,
    renderer: Renderer,
    zone: Zone,
    hooks: HookRunner,
    changes: Rc<RefCell<Vec<Change>>>,
}

impl<K: KeyValueStore> Session<K> {
    pub fn new(mut store: TaskStore<K>, renderer: Renderer, zone: Zone, hooks: HookRunner) -> Self {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        store.subscribe(Box::new(move |change: &Change| {
            sink.borrow_mut().push(change.clone())
        }));

        Self {
            store,
            renderer,
            zone,
            hooks,
            changes,
        }
    }

    fn flush_hooks(&self) {
        let drained: Vec<Change> = self.changes.borrow_mut().drain(..).collect();
        self.hooks.run_on_change(&drained);
    }
}

#[instrument(skip(session, cfg, inv, out))]
pub fn dispatch<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    cfg: &Config,
    inv: Invocation,
    out: &mut W,
) -> anyhow::Result<()> {
    if inv.command == "shell" {
        let stdin = io::stdin();
        return run_shell(session, cfg, stdin.lock(), out);
    }

    let result = run_command(session, &inv, Utc::now(), out);
    session.flush_hooks();
    result
}

/// Reads one command per line until `quit`, `exit` or end of input. A
/// failing command is reported and the loop continues.
#[instrument(skip_all)]
pub fn run_shell<K: KeyValueStore, R: BufRead, W: Write>(
    session: &mut Session<K>,
    cfg: &Config,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command shell");

    for line in input.lines() {
        let line = line.context("failed to read command line")?;
        let tokens: Vec<String> = line.split_whitespace().map(ToString::to_string).collect();
        let Some(first) = tokens.first() else {
            continue;
        };
        if first == "quit" || first == "exit" {
            break;
        }

        session.store.sync_external();
        let result = Invocation::from_tokens(cfg, &tokens).and_then(|inv| {
            if inv.command == "shell" {
                return Err(anyhow!("already in a shell"));
            }
            run_command(session, &inv, Utc::now(), out)
        });
        session.flush_hooks();

        if let Err(err) = result {
            warn!(error = %format!("{err:#}"), "shell command failed");
            writeln!(out, "error: {err:#}")?;
        }
    }

    Ok(())
}

fn run_command<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    inv: &Invocation,
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();
    debug!(command, ?args, "dispatching command");

    match command {
        "add" => cmd_add(session, args, now, out),
        "list" => cmd_list(session, args, now, out),
        "done" | "toggle" => cmd_toggle(session, args, now, out),
        "delete" => cmd_delete(session, args, out),
        "undo" => cmd_undo(session, out),
        "move" => cmd_move(session, args, out),
        "clear" => cmd_clear(session, out),
        "filter" => cmd_filter(session, args, now, out),
        "sort" => cmd_sort(session, args, out),
        "stats" => cmd_stats(session, now, out),
        "export" => cmd_export(session, out),
        "help" => cmd_help(out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(session, args, now, out))]
fn cmd_add<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command add");

    let today = session.zone.today(now);
    let draft = parse_text_and_mods(args, today)?;
    if !session
        .store
        .add(&draft.text, draft.priority, draft.due_date, now)
    {
        return Err(anyhow!("task text is required"));
    }

    let task = &session.store.tasks()[0];
    debug!(id = %task.id, "task created");
    writeln!(out, "Added \"{}\".", summarize(&task.text))?;
    Ok(())
}

#[instrument(skip(session, args, now, out))]
fn cmd_list<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command list");

    session.store.set_search_query(args.join(" ").trim());
    let stats = session.zone.stats(session.store.tasks(), now);
    let today = session.zone.today(now);
    let visible = session.store.visible();
    session.renderer.write_task_table(
        &mut *out,
        &visible,
        session.store.view_state(),
        &stats,
        today,
    )
}

#[instrument(skip(session, args, now, out))]
fn cmd_toggle<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command toggle");

    for id in resolve_refs(session, args)? {
        if !session.store.toggle(id, now) {
            continue;
        }
        if let Some(task) = session.store.task(id) {
            let verb = if task.completed { "Completed" } else { "Reopened" };
            writeln!(out, "{verb} \"{}\".", summarize(&task.text))?;
        }
    }
    Ok(())
}

#[instrument(skip(session, args, out))]
fn cmd_delete<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command delete");

    let ids = resolve_refs(session, args)?;
    if ids.len() > 1 {
        warn!(count = ids.len(), "only the last deleted task can be undone");
    }
    for id in ids {
        session.store.delete(id);
    }

    if let Some(record) = session.store.last_deleted() {
        session.renderer.write_undo_hint(&mut *out, record)?;
    }
    Ok(())
}

#[instrument(skip(session, out))]
fn cmd_undo<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command undo");

    let text = session.store.last_deleted().map(|r| summarize(&r.task.text));
    match text {
        Some(text) if session.store.undo() => writeln!(out, "Restored \"{text}\".")?,
        _ => writeln!(out, "Nothing to undo.")?,
    }
    Ok(())
}

#[instrument(skip(session, args, out))]
fn cmd_move<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command move");

    let [from, to] = args else {
        return Err(anyhow!("move: expected <from> <to> view positions"));
    };
    let from = parse_position(from)?;
    let to = parse_position(to)?;
    session.store.reorder_visible(from, to)?;
    writeln!(out, "Moved task {} to position {}.", from + 1, to + 1)?;
    Ok(())
}

#[instrument(skip(session, out))]
fn cmd_clear<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command clear");

    let removed = session.store.clear_completed();
    writeln!(out, "Cleared {removed} completed task(s).")?;
    Ok(())
}

#[instrument(skip(session, args, now, out))]
fn cmd_filter<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command filter");

    match args {
        [] => {
            let stats = session.zone.stats(session.store.tasks(), now);
            session
                .renderer
                .write_filter_counts(&mut *out, session.store.view_state().filter, &stats)
        }
        [value] => {
            let filter: Filter = value.parse()?;
            session.store.set_filter(filter);
            writeln!(out, "Filter set to {filter}.")?;
            Ok(())
        }
        _ => Err(anyhow!("filter: expected at most one of all, completed, pending")),
    }
}

#[instrument(skip(session, args, out))]
fn cmd_sort<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command sort");

    match args {
        [] => {
            let active = session.store.view_state().sort_by;
            for sort_by in [SortBy::Created, SortBy::Priority, SortBy::DueDate] {
                let marker = if sort_by == active { "*" } else { " " };
                writeln!(out, "{marker} {sort_by}")?;
            }
            Ok(())
        }
        [value] => {
            let sort_by: SortBy = value.parse()?;
            session.store.set_sort_by(sort_by);
            writeln!(out, "Sorting by {sort_by}.")?;
            Ok(())
        }
        _ => Err(anyhow!("sort: expected at most one of created, priority, dueDate")),
    }
}

#[instrument(skip(session, now, out))]
fn cmd_stats<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    now: DateTime<Utc>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command stats");

    let stats = session.zone.stats(session.store.tasks(), now);
    session.renderer.write_stats(&mut *out, &stats)
}

#[instrument(skip(session, out))]
fn cmd_export<K: KeyValueStore, W: Write>(
    session: &mut Session<K>,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command export");

    let json = serde_json::to_string_pretty(session.store.tasks())
        .context("failed to serialize tasks for export")?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(
        out,
        "\
usage: taskflow [-v|-q] [--taskflowrc PATH] [--data DIR] [--rc KEY=VALUE] <command> [args]

  add <text...> [priority:high|medium|low] [due:<date>]
  list [search...]            show the current view, optionally searching
  done|toggle <ref...>        flip completion; <ref> is a list position or id prefix
  delete <ref...>             remove tasks; the last one can be restored with undo
  undo                        restore the most recently deleted task
  move <from> <to>            move a task between list positions
  clear                       remove all completed tasks
  filter [all|completed|pending]
  sort [created|priority|dueDate]
  stats                       totals, today's completions and streak
  export                      print all tasks as JSON
  shell                       read commands from stdin, one per line

<date>: YYYY-MM-DD, today, tomorrow, yesterday, monday..sunday, +3d, -1w, eow, eom"
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Draft {
    text: String,
    priority: Priority,
    due_date: Option<NaiveDate>,
}

/// Splits `add` arguments into the task text and `priority:`/`due:`
/// modifiers. Everything after `--` is text.
#[instrument(skip(args, today))]
fn parse_text_and_mods(args: &[String], today: NaiveDate) -> anyhow::Result<Draft> {
    let mut text_parts = Vec::new();
    let mut priority = Priority::default();
    let mut due_date = None;

    let mut literal = false;
    for arg in args {
        if arg == "--" && !literal {
            literal = true;
            continue;
        }

        if !literal && let Some((key, value)) = arg.split_once(':') {
            match key.to_ascii_lowercase().as_str() {
                "pri" | "priority" => {
                    priority = value.parse()?;
                    continue;
                }
                "due" => {
                    due_date = if value.is_empty() {
                        None
                    } else {
                        Some(
                            parse_due_date(value, today)
                                .with_context(|| format!("invalid due date in {arg}"))?,
                        )
                    };
                    continue;
                }
                _ => {}
            }
        }

        text_parts.push(arg.as_str());
    }

    Ok(Draft {
        text: text_parts.join(" "),
        priority,
        due_date,
    })
}

/// Resolves every reference before anything mutates, so positions refer
/// to the view as it was displayed.
fn resolve_refs<K: KeyValueStore>(
    session: &Session<K>,
    args: &[String],
) -> anyhow::Result<Vec<Uuid>> {
    if args.is_empty() {
        return Err(anyhow!("expected at least one task reference"));
    }
    args.iter().map(|arg| session.store.resolve(arg)).collect()
}

fn parse_position(raw: &str) -> anyhow::Result<usize> {
    raw.parse::<usize>()
        .ok()
        .and_then(|pos| pos.checked_sub(1))
        .ok_or_else(|| anyhow!("invalid list position: {raw} (positions start at 1)"))
}
