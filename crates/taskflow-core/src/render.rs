use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::stats::Stats;
use crate::task::{Priority, Task};
use crate::undo::UndoRecord;
use crate::view::{Filter, ViewState};

const SUMMARY_LIMIT: usize = 80;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self { color: cfg.color }
    }

    #[tracing::instrument(skip(self, out, tasks, view, stats, today))]
    pub fn write_task_table<W: Write>(
        &self,
        mut out: W,
        tasks: &[&Task],
        view: &ViewState,
        stats: &Stats,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut banner = format!(
            "filter: {} ({})  sort: {}",
            view.filter,
            stats.count_for(view.filter),
            view.sort_by
        );
        if !view.search_query.is_empty() {
            banner.push_str(&format!("  search: {:?}", view.search_query));
        }
        writeln!(out, "{banner}")?;

        if tasks.is_empty() {
            writeln!(out, "No tasks.")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            " ".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Task".to_string(),
            "ID".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            let position = self.paint(&(idx + 1).to_string(), "33");
            let check = if task.completed { "x" } else { " " }.to_string();
            let priority = self.paint_priority(task.priority);

            let due = task
                .due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let due = if task.is_overdue(today) {
                self.paint(&due, "31")
            } else {
                due
            };

            let text = if task.completed {
                self.paint(&task.text, "2")
            } else {
                task.text.clone()
            };
            let short_id = task.id.to_string()[..8].to_string();

            rows.push(vec![position, check, priority, due, text, short_id]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn write_stats<W: Write>(&self, mut out: W, stats: &Stats) -> anyhow::Result<()> {
        writeln!(out, "total           {}", stats.total)?;
        writeln!(out, "completed       {}", stats.completed)?;
        writeln!(out, "pending         {}", stats.pending)?;
        writeln!(out, "completed today {}", stats.completed_today)?;
        let streak = format!("{}d", stats.streak);
        let streak = if stats.streak >= 3 {
            self.paint(&streak, "31")
        } else {
            streak
        };
        writeln!(out, "streak          {streak}")?;
        if stats.total > 0 {
            writeln!(out, "progress        {}%", stats.progress_percent())?;
        }
        Ok(())
    }

    pub fn write_filter_counts<W: Write>(
        &self,
        mut out: W,
        active: Filter,
        stats: &Stats,
    ) -> anyhow::Result<()> {
        for filter in [Filter::All, Filter::Pending, Filter::Completed] {
            let marker = if filter == active { "*" } else { " " };
            writeln!(out, "{marker} {:<9} {}", filter.as_str(), stats.count_for(filter))?;
        }
        Ok(())
    }

    pub fn write_undo_hint<W: Write>(&self, mut out: W, record: &UndoRecord) -> anyhow::Result<()> {
        writeln!(
            out,
            "Deleted \"{}\". Run `undo` to restore it.",
            summarize(&record.task.text)
        )?;
        Ok(())
    }

    fn paint_priority(&self, priority: Priority) -> String {
        match priority {
            Priority::High => self.paint("high", "31"),
            Priority::Medium => self.paint("medium", "33"),
            Priority::Low => self.paint("low", "2"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// One-line form of a task text: at most 80 characters, ending in `...`
/// when cut.
pub fn summarize(text: &str) -> String {
    if text.chars().count() <= SUMMARY_LIMIT {
        return text.to_string();
    }
    let kept: String = text.chars().take(SUMMARY_LIMIT - 3).collect();
    format!("{kept}...")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Renderer, strip_ansi, summarize};
    use crate::config::Config;
    use crate::stats::Stats;
    use crate::task::{Priority, Task};
    use crate::view::ViewState;

    fn plain_renderer() -> Renderer {
        Renderer::new(&Config {
            color: false,
            ..Config::default()
        })
    }

    #[test]
    fn summarize_cuts_long_text() {
        let long = "x".repeat(100);
        let short = summarize(&long);
        assert_eq!(short.chars().count(), 80);
        assert!(short.ends_with("..."));
        assert_eq!(summarize("short"), "short");
        assert_eq!(summarize(&"y".repeat(80)), "y".repeat(80));
    }

    #[test]
    fn table_lists_positions_and_due_dates() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 1).expect("date");
        let task = Task::new_pending(
            "Renew passport".to_string(),
            Priority::High,
            NaiveDate::from_ymd_opt(2026, 4, 20),
            Utc::now(),
        );
        let tasks = vec![&task];
        let stats = Stats::compute(std::slice::from_ref(&task), &Utc::now());

        let mut buf = Vec::new();
        plain_renderer()
            .write_task_table(&mut buf, &tasks, &ViewState::default(), &stats, today)
            .expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("filter: all (1)  sort: created\n"));
        assert!(text.contains("Renew passport"));
        assert!(text.contains("2026-04-20"));
        assert!(text.contains("high"));
        assert!(text.lines().nth(3).expect("row").starts_with("1 "));
    }

    #[test]
    fn empty_view_says_so() {
        let mut buf = Vec::new();
        plain_renderer()
            .write_task_table(
                &mut buf,
                &[],
                &ViewState::default(),
                &Stats::default(),
                NaiveDate::from_ymd_opt(2026, 5, 1).expect("date"),
            )
            .expect("render");
        assert!(String::from_utf8(buf).expect("utf8").ends_with("No tasks.\n"));
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
