//! Append-only, ID-indexed storage for graph nodes.

use std::marker::PhantomData;
use std::ops::Index;

/// Trait for opaque ID types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// A dense container whose items are addressed by stable IDs.
///
/// Items are only ever appended, so an ID handed out by [`alloc`](Arena::alloc)
/// stays valid for the lifetime of the arena. Edges elsewhere in the graph are
/// stored as IDs into this arena rather than as references.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Appends an item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns the item with the given ID, or `None` if the ID is foreign.
    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over all allocated IDs in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TargetId;

    #[test]
    fn alloc_and_index() {
        let mut arena: Arena<TargetId, &str> = Arena::new();
        let core = arena.alloc("Core");
        let app = arena.alloc("App");
        assert_eq!(arena[core], "Core");
        assert_eq!(arena[app], "App");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn get_foreign_id_is_none() {
        let arena: Arena<TargetId, &str> = Arena::new();
        assert!(arena.get(TargetId::from_raw(3)).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn iteration_follows_allocation_order() {
        let mut arena: Arena<TargetId, &str> = Arena::default();
        arena.alloc("a");
        arena.alloc("b");
        let ids: Vec<u32> = arena.ids().map(|id| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
        let names: Vec<&str> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
