//! Page collections kept live by the change feed.
//!
//! A collection starts `Uninitialized`, moves to `Loading` when the page
//! mounts and issues its fetch, and to `Ready` when the fetch finishes,
//! whatever its outcome (a failed fetch leaves an empty collection).
//!
//! Once ready, change events patch the collection in place:
//! - insert: append, or prepend for reverse-chronological lists
//! - update: replace the record with the same key
//! - delete: remove the record with the same key
//!
//! Patches never re-sort, so a long-lived collection can drift from the
//! order of the original query.

use serde::Serialize;

use crate::change_feed::{ChangeEvent, Record};
use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
}

/// Where inserted records land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Append,
    /// Newest first, for lists ordered by date descending
    Prepend,
}

#[derive(Debug, Clone)]
pub struct LiveCollection<T> {
    state: LoadState,
    items: Vec<T>,
    insert_at: InsertPosition,
    last_error: Option<String>,
}

impl<T: Record> LiveCollection<T> {
    pub fn new(insert_at: InsertPosition) -> Self {
        Self {
            state: LoadState::Uninitialized,
            items: Vec::new(),
            insert_at,
            last_error: None,
        }
    }

    pub fn begin_load(&mut self) {
        self.state = LoadState::Loading;
    }

    /// Install the fetched snapshot; a failure yields an empty ready collection.
    pub fn finish_load(&mut self, result: Result<Vec<T>, StoreError>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!(table = T::TABLE.name(), error = %e, "initial fetch failed");
                self.items.clear();
                self.last_error = Some(e.to_string());
            }
        }
        self.state = LoadState::Ready;
    }

    /// Apply one change event. Returns whether the collection changed.
    ///
    /// Events that arrive before the collection is ready are dropped; the
    /// snapshot that completes the load already reflects them.
    pub fn apply(&mut self, event: ChangeEvent<T>) -> bool {
        if self.state != LoadState::Ready {
            return false;
        }

        match event {
            ChangeEvent::Insert(record) => {
                // a snapshot fetched after the row was written already holds it
                if let Some(slot) = self.position(record.key()) {
                    self.items[slot] = record;
                    return true;
                }
                match self.insert_at {
                    InsertPosition::Append => self.items.push(record),
                    InsertPosition::Prepend => self.items.insert(0, record),
                }
                true
            }
            ChangeEvent::Update(record) => match self.position(record.key()) {
                Some(slot) => {
                    self.items[slot] = record;
                    true
                }
                None => false,
            },
            ChangeEvent::Delete { key } => match self.position(&key) {
                Some(slot) => {
                    self.items.remove(slot);
                    true
                }
                None => false,
            },
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Message of the last failed fetch, if the current snapshot came from one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn find(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }
}
