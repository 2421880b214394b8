use std::collections::HashSet;

use chrono::{
  DateTime,
  NaiveDate,
  TimeZone
};
use serde::Serialize;

use crate::task::Task;
use crate::view::Filter;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub total:           usize,
  pub completed:       usize,
  pub pending:         usize,
  pub completed_today: usize,
  pub streak:          u32
}

impl Stats {
  /// Aggregates over the full task list. Calendar days are taken in the
  /// time zone of `now`.
  #[tracing::instrument(skip(
    tasks, now
  ))]
  pub fn compute<Tz: TimeZone>(
    tasks: &[Task],
    now: &DateTime<Tz>
  ) -> Self {
    let zone = now.timezone();
    let today = now.date_naive();

    let completion_days: HashSet<
      NaiveDate
    > = tasks
      .iter()
      .filter_map(|task| {
        task.completed_at
      })
      .map(|at| {
        at.with_timezone(&zone)
          .date_naive()
      })
      .collect();

    let completed_today = tasks
      .iter()
      .filter_map(|task| {
        task.completed_at
      })
      .filter(|at| {
        at.with_timezone(&zone)
          .date_naive()
          == today
      })
      .count();

    let total = tasks.len();
    let completed = tasks
      .iter()
      .filter(|task| task.completed)
      .count();

    Self {
      total,
      completed,
      pending: total - completed,
      completed_today,
      streak: streak(
        &completion_days,
        today
      )
    }
  }

  /// Share of completed tasks, rounded half up; 0 for an empty list.
  pub fn progress_percent(
    &self
  ) -> u32 {
    if self.total == 0 {
      return 0;
    }
    let scaled = (self.completed * 200
      + self.total)
      / (2 * self.total);
    scaled as u32
  }

  pub fn count_for(
    &self,
    filter: Filter
  ) -> usize {
    match filter {
      | Filter::All => self.total,
      | Filter::Completed => {
        self.completed
      }
      | Filter::Pending => self.pending
    }
  }
}

/// Consecutive completion days ending today. A day without completions
/// today is tolerated; any earlier gap ends the run.
pub fn streak(
  days: &HashSet<NaiveDate>,
  today: NaiveDate
) -> u32 {
  let start = if days.contains(&today) {
    Some(today)
  } else {
    today
      .pred_opt()
      .filter(|yesterday| {
        days.contains(yesterday)
      })
  };

  let mut count = 0;
  let mut cursor = start;
  while let Some(day) = cursor {
    if !days.contains(&day) {
      break;
    }
    count += 1;
    cursor = day.pred_opt();
  }
  count
}
