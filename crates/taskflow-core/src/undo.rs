use crate::task::Task;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
  pub task:           Task,
  pub original_index: usize
}

/// Holds the most recent deletion only. A new record replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct UndoBuffer {
  slot: Option<UndoRecord>
}

impl UndoBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the record that was superseded, if any.
  pub fn record(
    &mut self,
    task: Task,
    original_index: usize
  ) -> Option<UndoRecord> {
    self.slot.replace(UndoRecord {
      task,
      original_index
    })
  }

  pub fn take(
    &mut self
  ) -> Option<UndoRecord> {
    self.slot.take()
  }

  pub fn peek(
    &self
  ) -> Option<&UndoRecord> {
    self.slot.as_ref()
  }
}

/// Insertion point for a restored task: the original index, clamped to
/// the current list length.
pub fn restore_index(
  original_index: usize,
  len: usize
) -> usize {
  original_index.min(len)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::{
    UndoBuffer,
    restore_index
  };
  use crate::task::{
    Priority,
    Task
  };

  #[test]
  fn second_record_supersedes_first() {
    let now = Utc::now();
    let a = Task::new_pending(
      "a".to_string(),
      Priority::Medium,
      None,
      now
    );
    let b = Task::new_pending(
      "b".to_string(),
      Priority::Low,
      None,
      now
    );

    let mut buffer = UndoBuffer::new();
    assert!(buffer.record(a.clone(), 0).is_none());
    let superseded = buffer
      .record(b.clone(), 3)
      .expect("first record returned");
    assert_eq!(superseded.task, a);

    let taken =
      buffer.take().expect("record");
    assert_eq!(taken.task, b);
    assert_eq!(taken.original_index, 3);
    assert!(buffer.peek().is_none());
    assert!(buffer.take().is_none());
  }

  #[test]
  fn restore_index_clamps_to_length() {
    assert_eq!(restore_index(2, 5), 2);
    assert_eq!(restore_index(7, 3), 3);
    assert_eq!(restore_index(0, 0), 0);
  }
}
