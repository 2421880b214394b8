use std::collections::HashSet;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::kv::{FILTER_KEY, KeyValueStore, SORT_KEY, TASKS_KEY};
use crate::notify::{Change, Listener, Notifier};
use crate::task::{Priority, Task};
use crate::undo::{UndoBuffer, UndoRecord, restore_index};
use crate::view::{self, Filter, SortBy, ViewState};

/// Raw values last read from or written to the durable store, used to
/// spot writes made by someone else.
#[derive(Debug, Default)]
struct Synced {
    tasks: Option<String>,
    filter: Option<String>,
    sort: Option<String>,
}

/// Sole owner of the canonical task list, the undo slot and the view
/// state. Every change goes through here, is persisted best-effort and is
/// announced to subscribers.
#[derive(Debug)]
pub struct TaskStore<K: KeyValueStore> {
    kv: K,
    tasks: Vec<Task>,
    undo: UndoBuffer,
    view: ViewState,
    notifier: Notifier,
    synced: Synced,
}

impl<K: KeyValueStore> TaskStore<K> {
    #[tracing::instrument(skip(kv))]
    pub fn open(kv: K) -> Self {
        let mut store = Self {
            kv,
            tasks: Vec::new(),
            undo: UndoBuffer::new(),
            view: ViewState::default(),
            notifier: Notifier::default(),
            synced: Synced::default(),
        };

        let raw_tasks = store.read_or_absent(TASKS_KEY);
        store.tasks = hydrate_tasks(raw_tasks.as_deref());
        store.synced.tasks = raw_tasks;

        let raw_filter = store.read_or_absent(FILTER_KEY);
        store.view.filter = hydrate_value(FILTER_KEY, raw_filter.as_deref());
        store.synced.filter = raw_filter;

        let raw_sort = store.read_or_absent(SORT_KEY);
        store.view.sort_by = hydrate_value(SORT_KEY, raw_sort.as_deref());
        store.synced.sort = raw_sort;

        info!(
            tasks = store.tasks.len(),
            filter = %store.view.filter,
            sort_by = %store.view.sort_by,
            "hydrated task store"
        );
        store
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.notifier.subscribe(listener);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn last_deleted(&self) -> Option<&UndoRecord> {
        self.undo.peek()
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn into_kv(self) -> K {
        self.kv
    }

    /// The filtered, sorted list as it should be displayed right now.
    pub fn visible(&self) -> Vec<&Task> {
        view::derive(&self.tasks, &self.view)
    }

    /// Prepends a new pending task. Returns false, changing nothing, when
    /// `text` is blank.
    #[tracing::instrument(skip(self, text, now), fields(len = text.len()))]
    pub fn add(
        &mut self,
        text: &str,
        priority: Priority,
        due_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("rejected blank task text");
            return false;
        }

        let task = Task::new_pending(trimmed.to_string(), priority, due_date, now);
        debug!(id = %task.id, %priority, ?due_date, "task added");
        self.tasks.insert(0, task);
        self.tasks_changed();
        true
    }

    #[tracing::instrument(skip(self, now))]
    pub fn toggle(&mut self, id: Uuid, now: DateTime<Utc>) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("toggle of unknown id ignored");
            return false;
        };
        task.toggle(now);
        debug!(completed = task.completed, "task toggled");
        self.tasks_changed();
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn delete(&mut self, id: Uuid) -> bool {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            debug!("delete of unknown id ignored");
            return false;
        };
        let task = self.tasks.remove(index);
        if let Some(previous) = self.undo.record(task, index) {
            debug!(dropped = %previous.task.id, "previous undo record superseded");
        }
        self.tasks_changed();
        self.notifier.emit(Change::Undo { available: true });
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo.take() else {
            debug!("nothing to undo");
            return false;
        };
        if self.task(record.task.id).is_some() {
            warn!(id = %record.task.id, "deleted task is back in the list; dropping undo record");
            self.notifier.emit(Change::Undo { available: false });
            return false;
        }
        let index = restore_index(record.original_index, self.tasks.len());
        debug!(id = %record.task.id, index, "restoring deleted task");
        self.tasks.insert(index, record.task);
        self.tasks_changed();
        self.notifier.emit(Change::Undo { available: false });
        true
    }

    /// Moves one task within the canonical list. Out-of-range indices are
    /// rejected and leave the list untouched.
    #[tracing::instrument(skip(self))]
    pub fn reorder(&mut self, from: usize, to: usize) -> anyhow::Result<()> {
        let len = self.tasks.len();
        if from >= len || to >= len {
            return Err(anyhow!(
                "reorder out of range: from {from} to {to} with {len} task(s)"
            ));
        }
        if from == to {
            return Ok(());
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        self.tasks_changed();
        Ok(())
    }

    /// Reorders by positions in the current derived view, moving the task
    /// at `from` to where the task at `to` sits in the canonical list.
    #[tracing::instrument(skip(self))]
    pub fn reorder_visible(&mut self, from: usize, to: usize) -> anyhow::Result<()> {
        if from == to {
            return Ok(());
        }
        let (source, target) = {
            let visible = self.visible();
            let len = visible.len();
            let lookup = |pos: usize| {
                visible
                    .get(pos)
                    .map(|task| task.id)
                    .ok_or_else(|| anyhow!("no task at view position {pos} ({len} visible)"))
            };
            (lookup(from)?, lookup(to)?)
        };

        let canonical = |id: Uuid| {
            self.tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| anyhow!("task {id} vanished from the list"))
        };
        let (from, to) = (canonical(source)?, canonical(target)?);
        self.reorder(from, to)
    }

    /// Drops every completed task. Not undoable; the undo slot is left as
    /// it was.
    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.completed);
        let removed = before - self.tasks.len();
        info!(removed, "cleared completed tasks");
        if removed > 0 {
            self.tasks_changed();
        }
        removed
    }

    #[tracing::instrument(skip(self))]
    pub fn set_filter(&mut self, filter: Filter) {
        if self.view.filter == filter {
            return;
        }
        self.view.filter = filter;
        if let Some(raw) = persist(&mut self.kv, FILTER_KEY, &filter) {
            self.synced.filter = Some(raw);
        }
        self.notifier.emit(Change::Filter { filter });
    }

    #[tracing::instrument(skip(self))]
    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        if self.view.sort_by == sort_by {
            return;
        }
        self.view.sort_by = sort_by;
        if let Some(raw) = persist(&mut self.kv, SORT_KEY, &sort_by) {
            self.synced.sort = Some(raw);
        }
        self.notifier.emit(Change::SortBy { sort_by });
    }

    /// Transient: the query is never written to the durable store.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        let query = query.into();
        if self.view.search_query == query {
            return;
        }
        self.view.search_query = query.clone();
        self.notifier.emit(Change::SearchQuery { query });
    }

    /// Maps a user reference to a task id: a 1-based position in the
    /// current view, or a unique prefix of a task id.
    pub fn resolve(&self, reference: &str) -> anyhow::Result<Uuid> {
        let reference = reference.trim();
        if let Ok(position) = reference.parse::<usize>() {
            let visible = self.visible();
            return position
                .checked_sub(1)
                .and_then(|idx| visible.get(idx))
                .map(|task| task.id)
                .ok_or_else(|| {
                    anyhow!(
                        "no task at position {position} ({} visible)",
                        visible.len()
                    )
                });
        }

        let prefix = reference.to_ascii_lowercase();
        if prefix.is_empty() {
            return Err(anyhow!("empty task reference"));
        }
        let mut matches = self
            .tasks
            .iter()
            .filter(|task| task.id.to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id),
            (Some(_), Some(_)) => Err(anyhow!("task reference {reference} is ambiguous")),
            (None, _) => Err(anyhow!("no task matches {reference}")),
        }
    }

    /// Reloads any persisted value written by someone else since this
    /// store last read or wrote it. Last write wins; the undo slot and the
    /// search query are kept.
    #[tracing::instrument(skip(self))]
    pub fn sync_external(&mut self) -> bool {
        let mut reloaded = false;

        if let Some(raw) = self.read_if_changed(TASKS_KEY, self.synced.tasks.as_deref()) {
            self.tasks = hydrate_tasks(raw.as_deref());
            self.synced.tasks = raw;
            reloaded = true;
        }
        if let Some(raw) = self.read_if_changed(FILTER_KEY, self.synced.filter.as_deref()) {
            self.view.filter = hydrate_value(FILTER_KEY, raw.as_deref());
            self.synced.filter = raw;
            reloaded = true;
        }
        if let Some(raw) = self.read_if_changed(SORT_KEY, self.synced.sort.as_deref()) {
            self.view.sort_by = hydrate_value(SORT_KEY, raw.as_deref());
            self.synced.sort = raw;
            reloaded = true;
        }

        if !reloaded {
            return false;
        }
        info!(tasks = self.tasks.len(), "reloaded external changes");
        self.notifier.emit(Change::Reloaded);

        let restored_elsewhere = self
            .undo
            .peek()
            .is_some_and(|record| self.task(record.task.id).is_some());
        if restored_elsewhere {
            self.undo.take();
            debug!("reloaded list already holds the deleted task; undo cleared");
            self.notifier.emit(Change::Undo { available: false });
        }
        true
    }

    fn tasks_changed(&mut self) {
        if let Some(raw) = persist(&mut self.kv, TASKS_KEY, &self.tasks) {
            self.synced.tasks = Some(raw);
        }
        self.notifier.emit(Change::Tasks);
    }

    fn read_or_absent(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "failed to read; treating as absent");
                None
            }
        }
    }

    /// `Some(new_raw)` when the stored value differs from the synced one.
    /// Read errors count as unchanged.
    fn read_if_changed(&self, key: &str, synced: Option<&str>) -> Option<Option<String>> {
        let current = match self.kv.get(key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "failed to re-read; keeping current state");
                return None;
            }
        };
        (current.as_deref() != synced).then_some(current)
    }
}

/// Writes `value` under `key`, returning what was written. Failures are
/// logged and swallowed: the in-memory state stays authoritative and the
/// change may be lost on reload.
fn persist<K: KeyValueStore, T: Serialize + ?Sized>(
    kv: &mut K,
    key: &str,
    value: &T,
) -> Option<String> {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(key, error = %err, "failed to serialize; change not persisted");
            return None;
        }
    };
    match kv.set(key, &raw) {
        Ok(()) => Some(raw),
        Err(err) => {
            warn!(key, error = %format!("{err:#}"), "failed to persist; change may not survive a reload");
            None
        }
    }
}

/// Parses a persisted task list. Anything unparseable or violating the
/// task invariants reads as an empty list.
fn hydrate_tasks(raw: Option<&str>) -> Vec<Task> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let tasks: Vec<Task> = match serde_json::from_str(raw) {
        Ok(tasks) => tasks,
        Err(err) => {
            warn!(error = %err, "malformed task list; starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if !seen.insert(task.id) {
            warn!(id = %task.id, "duplicate task id in stored list; starting empty");
            return Vec::new();
        }
        if !task.is_well_formed() {
            warn!(id = %task.id, "invalid task in stored list; starting empty");
            return Vec::new();
        }
    }
    tasks
}

fn hydrate_value<T: DeserializeOwned + Default>(key: &str, raw: Option<&str>) -> T {
    let Some(raw) = raw else {
        return T::default();
    };
    serde_json::from_str(raw).unwrap_or_else(|err| {
        warn!(key, error = %err, "malformed stored value; using default");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::TaskStore;
    use crate::kv::{FILTER_KEY, KeyValueStore, MemoryKvStore, TASKS_KEY};
    use crate::notify::Change;
    use crate::task::Priority;
    use crate::view::{Filter, SortBy};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn store_with(texts: &[&str]) -> TaskStore<MemoryKvStore> {
        let mut store = TaskStore::open(MemoryKvStore::new());
        for text in texts {
            assert!(store.add(text, Priority::Medium, None, now()));
        }
        store
    }

    fn texts(store: &TaskStore<MemoryKvStore>) -> Vec<String> {
        store.tasks().iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn add_trims_and_prepends() {
        let mut store = store_with(&["first"]);
        assert!(store.add("  second  ", Priority::High, None, now()));
        assert_eq!(texts(&store), vec!["second", "first"]);

        let head = &store.tasks()[0];
        assert!(!head.completed);
        assert_eq!(head.completed_at, None);
        assert_eq!(head.created_at, now());
        assert_eq!(head.priority, Priority::High);
    }

    #[test]
    fn blank_add_is_rejected_without_mutation() {
        let mut store = store_with(&["keep"]);
        let events = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&events);
        store.subscribe(Box::new(move |_: &Change| *counter.borrow_mut() += 1));

        assert!(!store.add("   \t ", Priority::Low, None, now()));
        assert!(!store.add("", Priority::Low, None, now()));
        assert_eq!(texts(&store), vec!["keep"]);
        assert_eq!(*events.borrow(), 0);
    }

    #[test]
    fn double_toggle_restores_state() {
        let mut store = store_with(&["a"]);
        let id = store.tasks()[0].id;
        let before = store.tasks()[0].clone();

        assert!(store.toggle(id, now()));
        assert!(store.tasks()[0].completed);
        assert_eq!(store.tasks()[0].completed_at, Some(now()));

        assert!(store.toggle(id, now() + Duration::minutes(5)));
        assert_eq!(store.tasks()[0], before);
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut store = store_with(&["a"]);
        let stranger = uuid::Uuid::new_v4();
        assert!(!store.toggle(stranger, now()));
        assert!(!store.delete(stranger));
        assert!(!store.undo());
        assert_eq!(texts(&store), vec!["a"]);
    }

    #[test]
    fn delete_then_undo_restores_exact_list() {
        let mut store = store_with(&["c", "b", "a"]);
        let before = store.tasks().to_vec();
        let middle = before[1].id;

        assert!(store.delete(middle));
        assert_eq!(texts(&store), vec!["a", "c"]);
        assert_eq!(
            store.last_deleted().map(|r| r.original_index),
            Some(1)
        );

        assert!(store.undo());
        assert_eq!(store.tasks(), before.as_slice());
        assert!(store.last_deleted().is_none());
    }

    #[test]
    fn second_delete_discards_first_undo() {
        let mut store = store_with(&["c", "b", "a"]);
        let a = store.tasks()[0].id;
        let b = store.tasks()[1].id;

        store.delete(a);
        store.delete(b);
        assert!(store.undo());
        assert_eq!(texts(&store), vec!["b", "c"]);
        assert!(store.task(a).is_none());
        assert!(!store.undo());
    }

    #[test]
    fn undo_clamps_index_to_current_length() {
        let mut store = store_with(&["c", "b", "a"]);
        let last = store.tasks()[2].id;
        store.delete(last);
        store.clear_completed();
        let first = store.tasks()[0].id;
        store.toggle(first, now());
        store.clear_completed();
        assert_eq!(texts(&store), vec!["b"]);

        assert!(store.undo());
        assert_eq!(texts(&store), vec!["b", "c"]);
    }

    #[test]
    fn clear_completed_keeps_pending_and_undo_slot() {
        let mut store = store_with(&["d", "c", "b", "a"]);
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id).collect();
        store.toggle(ids[0], now());
        store.toggle(ids[2], now());
        store.delete(ids[3]);

        assert_eq!(store.clear_completed(), 2);
        assert_eq!(texts(&store), vec!["b"]);
        assert_eq!(
            store.last_deleted().map(|r| r.task.text.as_str()),
            Some("d")
        );
        assert_eq!(store.clear_completed(), 0);
    }

    #[test]
    fn reorder_moves_single_element() {
        let mut store = store_with(&["d", "c", "b", "a"]);
        store.reorder(0, 2).expect("reorder");
        assert_eq!(texts(&store), vec!["b", "c", "a", "d"]);
        store.reorder(3, 0).expect("reorder");
        assert_eq!(texts(&store), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn reorder_rejects_out_of_range_without_damage() {
        let mut store = store_with(&["b", "a"]);
        assert!(store.reorder(2, 0).is_err());
        assert!(store.reorder(0, 5).is_err());
        assert_eq!(texts(&store), vec!["a", "b"]);
    }

    #[test]
    fn reorder_visible_translates_to_canonical_positions() {
        let mut store = store_with(&["d", "c", "b", "a"]);
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id).collect();
        store.toggle(ids[1], now());
        store.set_filter(Filter::Pending);
        let visible: Vec<_> = store.visible().iter().map(|t| t.text.clone()).collect();
        assert_eq!(visible, vec!["a", "c", "d"]);

        store.reorder_visible(0, 2).expect("reorder");
        assert_eq!(texts(&store), vec!["b", "c", "d", "a"]);
        assert!(store.reorder_visible(0, 3).is_err());
    }

    #[test]
    fn persistence_roundtrip_preserves_fields_and_order() {
        let mut store = store_with(&["plain"]);
        let due = NaiveDate::from_ymd_opt(2026, 6, 3);
        store.add("dated", Priority::Low, due, now());
        let id = store.tasks()[1].id;
        store.toggle(id, now());
        store.set_filter(Filter::Completed);
        store.set_sort_by(SortBy::DueDate);
        store.set_search_query("pla");

        let before = store.tasks().to_vec();
        let reopened = TaskStore::open(store.into_kv());
        assert_eq!(reopened.tasks(), before.as_slice());
        assert_eq!(reopened.view_state().filter, Filter::Completed);
        assert_eq!(reopened.view_state().sort_by, SortBy::DueDate);
        assert_eq!(reopened.view_state().search_query, "");
        assert!(reopened.last_deleted().is_none());
    }

    #[test]
    fn malformed_storage_hydrates_empty() {
        let mut kv = MemoryKvStore::new();
        kv.set(TASKS_KEY, "{not json").expect("set");
        kv.set(FILTER_KEY, "\"sideways\"").expect("set");
        let store = TaskStore::open(kv);
        assert!(store.tasks().is_empty());
        assert_eq!(store.view_state().filter, Filter::All);

        let mut kv = MemoryKvStore::new();
        let blank = format!(
            r#"[{{"id":"{}","text":"  ","createdAt":0}}]"#,
            uuid::Uuid::new_v4()
        );
        kv.set(TASKS_KEY, &blank).expect("set");
        assert!(TaskStore::open(kv).tasks().is_empty());
    }

    #[test]
    fn write_failures_keep_memory_state() {
        let mut store = store_with(&["saved"]);
        store.kv_mut().fail_writes = true;
        assert!(store.add("unsaved", Priority::Medium, None, now()));
        assert_eq!(texts(&store), vec!["unsaved", "saved"]);

        store.kv_mut().fail_writes = false;
        let reopened = TaskStore::open(store.into_kv());
        assert_eq!(texts(&reopened), vec!["saved"]);
    }

    #[test]
    fn sync_external_applies_last_write() {
        let mut store = store_with(&["mine"]);
        assert!(!store.sync_external());

        let mut other = TaskStore::open(store.kv().clone());
        other.add("theirs", Priority::High, None, now());
        other.set_sort_by(SortBy::Priority);
        let shared = other.into_kv();
        *store.kv_mut() = shared;

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(Box::new(move |change: &Change| sink.borrow_mut().push(change.clone())));

        assert!(store.sync_external());
        assert_eq!(texts(&store), vec!["theirs", "mine"]);
        assert_eq!(store.view_state().sort_by, SortBy::Priority);
        assert_eq!(*events.borrow(), vec![Change::Reloaded]);
        assert!(!store.sync_external());
    }

    #[test]
    fn undo_after_sync_never_duplicates_an_id() {
        let mut mine = store_with(&["other", "x"]);
        let x = mine.tasks()[0].id;
        let other_id = mine.tasks()[1].id;

        let mut theirs = TaskStore::open(mine.kv().clone());
        assert!(mine.delete(x));

        theirs.toggle(other_id, now());
        *mine.kv_mut() = theirs.into_kv();
        assert!(mine.sync_external());
        assert!(mine.last_deleted().is_none());
        assert!(!mine.undo());

        let copies = mine.tasks().iter().filter(|t| t.id == x).count();
        assert_eq!(copies, 1);
        let reopened = TaskStore::open(mine.into_kv());
        assert_eq!(reopened.tasks().len(), 2);
    }

    #[test]
    fn undo_drops_record_when_id_already_present() {
        let mut store = store_with(&["b", "a"]);
        let a = store.tasks()[0].id;
        let snapshot = store.kv().clone();
        store.delete(a);

        let mut restored = TaskStore::open(snapshot);
        restored.undo.record(store.last_deleted().expect("record").task.clone(), 0);
        assert!(!restored.undo());
        assert_eq!(restored.tasks().len(), 2);
        assert!(restored.last_deleted().is_none());
    }

    #[test]
    fn roundtrip_with_wall_clock_timestamps() {
        let mut store = TaskStore::open(MemoryKvStore::new());
        store.add("now-ish", Priority::Medium, None, Utc::now());
        let id = store.tasks()[0].id;
        store.toggle(id, Utc::now());

        let before = store.tasks().to_vec();
        let reopened = TaskStore::open(store.into_kv());
        assert_eq!(reopened.tasks(), before.as_slice());
    }

    #[test]
    fn observers_see_each_kind_of_change() {
        let mut store = store_with(&["a"]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(Box::new(move |change: &Change| sink.borrow_mut().push(change.clone())));

        let id = store.tasks()[0].id;
        store.toggle(id, now());
        store.delete(id);
        store.undo();
        store.set_filter(Filter::Pending);
        store.set_filter(Filter::Pending);
        store.set_sort_by(SortBy::Priority);
        store.set_search_query("x");

        assert_eq!(
            *events.borrow(),
            vec![
                Change::Tasks,
                Change::Tasks,
                Change::Undo { available: true },
                Change::Tasks,
                Change::Undo { available: false },
                Change::Filter { filter: Filter::Pending },
                Change::SortBy { sort_by: SortBy::Priority },
                Change::SearchQuery { query: "x".to_string() },
            ]
        );
    }

    #[test]
    fn resolve_accepts_positions_and_id_prefixes() {
        let mut store = store_with(&["b", "a"]);
        let a = store.tasks()[0].id;
        let b = store.tasks()[1].id;
        store.set_sort_by(SortBy::Created);

        assert_eq!(store.resolve("1").expect("resolve"), a);
        assert_eq!(store.resolve("2").expect("resolve"), b);
        assert!(store.resolve("0").is_err());
        assert!(store.resolve("3").is_err());

        let full = b.to_string();
        assert_eq!(store.resolve(&full[..8]).expect("resolve"), b);
        assert!(store.resolve("zzzz").is_err());
    }
}
