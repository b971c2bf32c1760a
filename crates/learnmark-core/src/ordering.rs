//! Ordered child collections with a dense, zero-based `order_index`.
//!
//! Course modules, lessons, assessment questions, question options and
//! completion requirements are all stored in an [`OrderedCollection`]. After
//! every insert, remove or reorder the indices of the members are exactly
//! `0..len`, each used once, and the backing vector is sorted by index.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// An item that lives at a position inside an [`OrderedCollection`].
pub trait Ordered {
    /// Entity name used in not-found errors (e.g. "lesson").
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn order_index(&self) -> usize;
    fn set_order_index(&mut self, index: usize);
}

/// Owned, index-maintaining vector of child items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Ordered> OrderedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Members in `order_index` order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Member ids in `order_index` order.
    pub fn ids(&self) -> Vec<Uuid> {
        self.items.iter().map(Ordered::id).collect()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Like [`get`](Self::get) but reports a missing id as [`DomainError::NotFound`].
    pub fn require(&self, id: Uuid) -> DomainResult<&T> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found(T::KIND, id))
    }

    /// Mutates one member in place. The member's `order_index` is restored
    /// afterwards, so the closure cannot break the ordering.
    pub fn update<R>(&mut self, id: Uuid, f: impl FnOnce(&mut T) -> R) -> DomainResult<R> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| DomainError::not_found(T::KIND, id))?;
        let index = item.order_index();
        let out = f(item);
        item.set_order_index(index);
        Ok(out)
    }

    /// Appends an item at the end of the collection.
    pub fn push(&mut self, item: T) -> DomainResult<usize> {
        let index = self.items.len();
        self.insert_at(index, item)?;
        Ok(index)
    }

    /// Places `item` at `index`, shifting every member at or after `index`
    /// up by one.
    pub fn insert_at(&mut self, index: usize, mut item: T) -> DomainResult<()> {
        if index > self.items.len() {
            return Err(DomainError::invalid_input(format!(
                "{} order index {index} is past the end of a collection of {}",
                T::KIND,
                self.items.len()
            )));
        }
        if self.contains(item.id()) {
            return Err(DomainError::invalid_operation(format!(
                "{} {} is already in the collection",
                T::KIND,
                item.id()
            )));
        }

        // Highest index first so no two members ever share a position.
        for existing in self.items.iter_mut().rev() {
            let current = existing.order_index();
            if current >= index {
                existing.set_order_index(current + 1);
            }
        }

        item.set_order_index(index);
        self.items.insert(index, item);
        Ok(())
    }

    /// Removes the member with `id` and closes the gap it leaves.
    pub fn remove(&mut self, id: Uuid) -> DomainResult<T> {
        let position = self
            .items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| DomainError::not_found(T::KIND, id))?;
        let removed = self.items.remove(position);
        let former = removed.order_index();

        for item in &mut self.items {
            let current = item.order_index();
            if current > former {
                item.set_order_index(current - 1);
            }
        }
        Ok(removed)
    }

    /// Assigns `order_index = position in ids`. `ids` must be a permutation
    /// of the current members.
    pub fn reorder(&mut self, ids: &[Uuid]) -> DomainResult<()> {
        if ids.is_empty() {
            return Err(DomainError::invalid_input(format!(
                "{} reorder list must not be empty",
                T::KIND
            )));
        }
        if let Some(unknown) = ids.iter().find(|id| !self.contains(**id)) {
            return Err(DomainError::invalid_input(format!(
                "{} {unknown} does not belong to this collection",
                T::KIND
            )));
        }
        let mut seen = std::collections::HashSet::with_capacity(ids.len());
        if let Some(duplicate) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(DomainError::invalid_input(format!(
                "{} {duplicate} appears more than once in the reorder list",
                T::KIND
            )));
        }
        if ids.len() != self.items.len() {
            return Err(DomainError::invalid_input(format!(
                "reorder list names {} of {} {} items",
                ids.len(),
                self.items.len(),
                T::KIND
            )));
        }

        for (position, id) in ids.iter().enumerate() {
            if let Some(item) = self.items.iter_mut().find(|item| item.id() == *id) {
                item.set_order_index(position);
            }
        }
        self.items.sort_by_key(Ordered::order_index);
        Ok(())
    }

    /// Rebuilds a collection from hydrated items, sorting by their stored
    /// index and closing any gaps.
    pub fn from_items(mut items: Vec<T>) -> DomainResult<Self> {
        items.sort_by_key(Ordered::order_index);
        let mut collection = Self::new();
        for item in items {
            collection.push(item)?;
        }
        Ok(collection)
    }
}

// Hydrated snapshots go through `from_items` so a stored list with gaps or
// duplicate ids never becomes a live collection.
impl<'de, T> Deserialize<'de> for OrderedCollection<T>
where
    T: Ordered + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::from_items(items).map_err(serde::de::Error::custom)
    }
}

impl<'a, T> IntoIterator for &'a OrderedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
