use std::fmt;

use serde::Serialize;

use crate::view::{Filter, SortBy};

/// A state change observers may need to re-render for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Change {
    Tasks,
    Filter { filter: Filter },
    SortBy { sort_by: SortBy },
    SearchQuery { query: String },
    Undo { available: bool },
    /// State was replaced from the durable store.
    Reloaded,
}

pub type Listener = Box<dyn FnMut(&Change)>;

/// Synchronous fan-out, called in subscription order.
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<Listener>,
}

impl Notifier {
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&mut self, change: Change) {
        tracing::trace!(?change, listeners = self.listeners.len(), "emitting change");
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
