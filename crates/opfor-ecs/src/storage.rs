//! Per-type sparse component storage.
//!
//! A [`ComponentStorage<T>`] is a sparse set: a hash index from
//! [`EntityId`] to a slot in two dense, parallel vectors (values and owning
//! entities). Lookups and existence checks are O(1); removal swaps the last
//! slot into the hole, so any reference into the storage is invalidated by
//! the next insert or remove.
//!
//! [`AnyStorage`] is the object-safe face of a storage. The entity manager
//! keeps one boxed `AnyStorage` per registered component type and uses it
//! for the operations that must work without knowing `T`: erasing a deleted
//! entity, attaching a default value by tag, and JSON introspection.

use std::any::Any;
use std::collections::HashMap;

use crate::component::Component;
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// ComponentStorage
// ---------------------------------------------------------------------------

/// Sparse mapping from [`EntityId`] to a component value of type `T`.
#[derive(Debug)]
pub struct ComponentStorage<T> {
    pub(crate) index: HashMap<EntityId, usize>,
    pub(crate) entities: Vec<EntityId>,
    pub(crate) values: Vec<T>,
}

impl<T> ComponentStorage<T> {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Store `value` for `entity`, overwriting any previous value.
    pub fn insert(&mut self, entity: EntityId, value: T) {
        if let Some(&slot) = self.index.get(&entity) {
            self.values[slot] = value;
            return;
        }
        self.index.insert(entity, self.values.len());
        self.entities.push(entity);
        self.values.push(value);
    }

    /// Erase the entry for `entity`, returning its value if there was one.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let slot = self.index.remove(&entity)?;
        let value = self.values.swap_remove(slot);
        self.entities.swap_remove(slot);
        if let Some(&moved) = self.entities.get(slot) {
            self.index.insert(moved, slot);
        }
        Some(value)
    }

    /// Shared reference to the value stored for `entity`.
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.index.get(&entity).map(|&slot| &self.values[slot])
    }

    /// Mutable reference to the value stored for `entity`.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let slot = *self.index.get(&entity)?;
        Some(&mut self.values[slot])
    }

    /// Whether `entity` has an entry.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.index.contains_key(&entity)
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(entity, value)` pairs in dense (unspecified) order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AnyStorage
// ---------------------------------------------------------------------------

/// Type-erased operations over a [`ComponentStorage`].
pub trait AnyStorage: Any + std::fmt::Debug {
    /// Erase the entry for `entity`. Returns `true` if one existed.
    fn remove_entity(&mut self, entity: EntityId) -> bool;

    /// Whether `entity` has an entry.
    fn contains(&self, entity: EntityId) -> bool;

    /// Store a default-constructed value for `entity` (overwrite semantics).
    fn insert_default(&mut self, entity: EntityId);

    /// Serialize the value stored for `entity`.
    fn to_json(&self, entity: EntityId) -> Option<Result<serde_json::Value, serde_json::Error>>;

    /// Overwrite the value stored for `entity` from JSON.
    ///
    /// Returns `None` if `entity` has no entry; never creates one.
    fn set_json(
        &mut self,
        entity: EntityId,
        value: &serde_json::Value,
    ) -> Option<Result<(), serde_json::Error>>;

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStorage for ComponentStorage<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn contains(&self, entity: EntityId) -> bool {
        ComponentStorage::contains(self, entity)
    }

    fn insert_default(&mut self, entity: EntityId) {
        self.insert(entity, T::default());
    }

    fn to_json(&self, entity: EntityId) -> Option<Result<serde_json::Value, serde_json::Error>> {
        self.get(entity).map(serde_json::to_value)
    }

    fn set_json(
        &mut self,
        entity: EntityId,
        value: &serde_json::Value,
    ) -> Option<Result<(), serde_json::Error>> {
        let slot = self.get_mut(entity)?;
        Some(T::deserialize(value).map(|decoded| *slot = decoded))
    }

    fn len(&self) -> usize {
        ComponentStorage::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
