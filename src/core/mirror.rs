//! Local mirror of one server-held collection.
//!
//! The remote table is authoritative. A mirror is refreshed wholesale from a
//! load (keeping the server's order) and then patched row by row as saves and
//! deletes succeed: a returned row replaces the entry with the same id in
//! place, otherwise it goes to the front. After the first patch the order is
//! "recently touched first", not the server's sort order.

use crate::entities::Record;

/// Where [`Mirror::reconcile`] put a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// An entry with the same id existed at this index and was overwritten
    Replaced(usize),
    /// No entry had this id; the row was inserted at the head
    Prepended,
}

/// Ordered in-memory copy of a collection.
#[derive(Debug, Clone)]
pub struct Mirror<T> {
    items: Vec<T>,
}

impl<T> Default for Mirror<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Record> Mirror<T> {
    /// Replaces the whole content with a fresh server response.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Applies a row the server just returned: replace by id, else prepend.
    ///
    /// Rows without an id are treated as new.
    pub fn reconcile(&mut self, item: T) -> Placement {
        let position = item
            .id()
            .and_then(|id| self.items.iter().position(|existing| existing.id() == Some(id)));

        match position {
            Some(index) => {
                self.items[index] = item;
                Placement::Replaced(index)
            }
            None => {
                self.items.insert(0, item);
                Placement::Prepended
            }
        }
    }

    /// Removes every entry with `id`, returning the first one removed.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == Some(id))?;
        let removed = self.items.remove(index);
        self.items.retain(|item| item.id() != Some(id));
        Some(removed)
    }

    /// Looks up an entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Empties the mirror.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Mirror<T> {
    /// Entries in mirror order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates entries in mirror order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the mirror holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
