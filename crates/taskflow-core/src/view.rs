use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
  #[default]
  All,
  Completed,
  Pending
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
  #[default]
  Created,
  Priority,
  DueDate
}

/// Transient UI inputs to the derived list.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ViewState {
  pub filter:       Filter,
  pub sort_by:      SortBy,
  pub search_query: String
}

impl Filter {
  pub fn matches(
    self,
    task: &Task
  ) -> bool {
    match self {
      | Filter::All => true,
      | Filter::Completed => {
        task.completed
      }
      | Filter::Pending => {
        !task.completed
      }
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Filter::All => "all",
      | Filter::Completed => {
        "completed"
      }
      | Filter::Pending => "pending"
    }
  }
}

impl SortBy {
  pub fn as_str(self) -> &'static str {
    match self {
      | SortBy::Created => "created",
      | SortBy::Priority => {
        "priority"
      }
      | SortBy::DueDate => "dueDate"
    }
  }
}

impl fmt::Display for Filter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl fmt::Display for SortBy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Filter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Filter::All),
      | "completed" | "done" => {
        Ok(Filter::Completed)
      }
      | "pending" | "todo" => {
        Ok(Filter::Pending)
      }
      | other => {
        Err(anyhow!(
          "invalid filter: {other} \
           (expected all, completed \
           or pending)"
        ))
      }
    }
  }
}

impl FromStr for SortBy {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "created" | "recent" => {
        Ok(SortBy::Created)
      }
      | "priority" | "pri" => {
        Ok(SortBy::Priority)
      }
      | "duedate" | "due" => {
        Ok(SortBy::DueDate)
      }
      | other => {
        Err(anyhow!(
          "invalid sort: {other} \
           (expected created, \
           priority or dueDate)"
        ))
      }
    }
  }
}

fn matches_search(
  task: &Task,
  needle_lower: &str
) -> bool {
  task
    .text
    .to_lowercase()
    .contains(needle_lower)
}

/// Search, then filter, then sort. `Created` keeps canonical order; both
/// other sorts are stable.
#[tracing::instrument(skip(
  tasks, view
))]
pub fn derive<'a>(
  tasks: &'a [Task],
  view: &ViewState
) -> Vec<&'a Task> {
  let needle = view
    .search_query
    .to_lowercase();

  let mut out: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      needle.is_empty()
        || matches_search(task, &needle)
    })
    .filter(|task| {
      view.filter.matches(task)
    })
    .collect();

  match view.sort_by {
    | SortBy::Created => {}
    | SortBy::Priority => {
      out.sort_by_key(|task| {
        task.priority.rank()
      });
    }
    | SortBy::DueDate => {
      out.sort_by_key(|task| {
        (
          task.due_date.is_none(),
          task.due_date
        )
      });
    }
  }

  trace!(
    total = tasks.len(),
    visible = out.len(),
    "derived view"
  );
  out
}
