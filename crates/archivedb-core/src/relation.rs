//! Relationship slots stored on an entity's relation side-structure.
//!
//! A [`Related`] holds at most one related record (belongs-to, has-one) and a
//! [`RelatedMany`] holds a collection (has-many, many-to-many). Both
//! distinguish "never loaded" from "loaded and empty". Related records are
//! shared through `Arc` because a loaded record may be referenced from several
//! owners at once; back-references point at a detached snapshot of the owner
//! rather than the owner itself, so the graph never forms a cycle.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A related single record (many-to-one or one-to-one).
pub struct Related<T> {
    value: Option<Arc<T>>,
    loaded: bool,
}

impl<T> Related<T> {
    /// An unloaded, empty slot.
    pub const fn empty() -> Self {
        Self {
            value: None,
            loaded: false,
        }
    }

    /// A slot loaded with `value`.
    pub fn loaded(value: Arc<T>) -> Self {
        Self {
            value: Some(value),
            loaded: true,
        }
    }

    /// The related record, if loaded and present.
    pub fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }

    /// The shared handle to the related record.
    pub fn get_arc(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    /// Has a load or mutation touched this slot (including loaded-null)?
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Replace the related record and mark the slot loaded.
    pub fn set(&mut self, value: Arc<T>) {
        self.value = Some(value);
        self.loaded = true;
    }

    /// Mark loaded with no related record.
    pub fn set_none(&mut self) {
        self.value = None;
        self.loaded = true;
    }

    /// Back to the unloaded state.
    pub fn reset(&mut self) {
        self.value = None;
        self.loaded = false;
    }

    pub fn take(&mut self) -> Option<Arc<T>> {
        self.value.take()
    }
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Clone for Related<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            loaded: self.loaded,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Related<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if !self.loaded {
            "unloaded"
        } else if self.value.is_none() {
            "empty"
        } else {
            "loaded"
        };
        f.debug_struct("Related")
            .field("state", &state)
            .field("value", &self.get())
            .finish()
    }
}

impl<T: Serialize> Serialize for Related<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.get() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// A collection of related records (one-to-many or many-to-many).
pub struct RelatedMany<T> {
    items: Vec<Arc<T>>,
    loaded: bool,
}

impl<T> RelatedMany<T> {
    /// An unloaded, empty collection.
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
        }
    }

    /// A collection loaded with `items`.
    pub fn loaded(items: Vec<Arc<T>>) -> Self {
        Self {
            items,
            loaded: true,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(Arc::as_ref)
    }

    /// The shared handles, in load order.
    pub fn as_slice(&self) -> &[Arc<T>] {
        &self.items
    }

    /// Append one record and mark the collection loaded.
    pub fn push(&mut self, item: Arc<T>) {
        self.items.push(item);
        self.loaded = true;
    }

    /// Replace the whole collection and mark it loaded.
    pub fn set(&mut self, items: Vec<Arc<T>>) {
        self.items = items;
        self.loaded = true;
    }

    /// Mark loaded without touching the contents.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Remove every record matching `pred`. Order is not preserved.
    ///
    /// Returns how many records were removed.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.items.len() {
            if pred(&self.items[i]) {
                self.items.swap_remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }
}

impl<T> Default for RelatedMany<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RelatedMany<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            loaded: self.loaded,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RelatedMany<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelatedMany")
            .field("loaded", &self.loaded)
            .field("items", &self.items)
            .finish()
    }
}

impl<T: Serialize> Serialize for RelatedMany<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn related_states() {
        let mut slot: Related<i32> = Related::empty();
        assert!(!slot.is_loaded());
        assert!(slot.is_empty());

        slot.set_none();
        assert!(slot.is_loaded());
        assert!(slot.get().is_none());

        slot.set(Arc::new(7));
        assert_eq!(slot.get(), Some(&7));

        slot.reset();
        assert!(!slot.is_loaded());
    }

    #[test]
    fn related_many_remove_where_swaps() {
        let mut many = RelatedMany::loaded(vec![Arc::new(1), Arc::new(2), Arc::new(3), Arc::new(2)]);
        assert_eq!(many.remove_where(|v| *v == 2), 2);
        let mut left: Vec<i32> = many.iter().copied().collect();
        left.sort_unstable();
        assert_eq!(left, vec![1, 3]);
        assert_eq!(many.remove_where(|v| *v == 9), 0);
    }

    #[test]
    fn shared_records_are_not_copied() {
        let shared = Arc::new(String::from("tag"));
        let mut a = RelatedMany::new();
        let mut b = RelatedMany::new();
        a.push(Arc::clone(&shared));
        b.push(Arc::clone(&shared));
        assert!(Arc::ptr_eq(&a.as_slice()[0], &b.as_slice()[0]));
        assert_eq!(Arc::strong_count(&shared), 3);
    }

    #[test]
    fn serialize_loaded_values() {
        let slot = Related::loaded(Arc::new(5));
        assert_eq!(serde_json::to_string(&slot).unwrap(), "5");
        let empty: Related<i32> = Related::empty();
        assert_eq!(serde_json::to_string(&empty).unwrap(), "null");
        let many = RelatedMany::loaded(vec![Arc::new(1), Arc::new(2)]);
        assert_eq!(serde_json::to_string(&many).unwrap(), "[1,2]");
    }
}
