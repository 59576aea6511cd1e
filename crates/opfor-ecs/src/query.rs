//! Query engine: find live entities by component set.
//!
//! Typed queries resolve one storage per requested type and yield
//! `(EntityId, (&C1, &mut C2, ...))` tuples for every live entity whose
//! component-set tag is a superset of the requested types. Results come out
//! in entity-creation order; the scan is linear in the number of live
//! entities.
//!
//! ## Soundness
//!
//! Read-only queries ([`EntityManager::query`]) take `&self` and only accept
//! tuples of `&T` (enforced by [`ReadOnlyQuery`]). Mutable queries
//! ([`EntityManager::query_mut`]) take `&mut self`, which rules out any other
//! borrow of the manager for the lifetime of the iterator. Inside one mutable
//! query, a type may not be requested twice if either request is mutable;
//! this is checked before iteration starts. Each entity is visited once, so
//! every yielded `&mut T` points at a distinct slot. Slots are reached
//! through `Vec::as_ptr`/`as_mut_ptr` so that no reference to the whole
//! value buffer is created while earlier items are still borrowed.

use std::collections::btree_map;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::component::{Component, ComponentRegistry, ComponentSet, ComponentTuple, ComponentTypeId};
use crate::entity::EntityId;
use crate::manager::{EntityManager, EntityRecord};
use crate::storage::{AnyStorage, ComponentStorage};
use crate::EcsError;

// ---------------------------------------------------------------------------
// QueryItem trait -- one element of a query tuple
// ---------------------------------------------------------------------------

/// A single element of a query: `&T` (read) or `&mut T` (write).
pub trait QueryItem {
    /// The component type accessed.
    type Component: Component;
    /// The output type yielded per entity.
    type Item<'w>;
    /// Whether this item borrows mutably.
    const MUTABLE: bool;

    /// Fetch the item for `entity`.
    ///
    /// # Safety
    ///
    /// `storage` must point to a live storage that outlives `'w`. For `&mut T`
    /// items the pointer must come from an exclusive borrow, and no other
    /// reference to the same slot may exist for `'w`.
    unsafe fn fetch<'w>(
        storage: NonNull<ComponentStorage<Self::Component>>,
        entity: EntityId,
    ) -> Option<Self::Item<'w>>;
}

/// Marker for query items that only read.
///
/// Sealed: only `&T` implements it, so a read-only query can never hand out
/// `&mut T` through `&EntityManager`.
pub trait ReadOnlyItem: QueryItem + sealed::ReadOnly {}

mod sealed {
    use crate::component::Component;

    pub trait ReadOnly {}

    impl<T: Component> ReadOnly for &T {}

    macro_rules! impl_read_only_tuple {
        ($($name:ident),+) => {
            impl<$($name: ReadOnly),+> ReadOnly for ($($name,)+) {}
        };
    }

    impl_read_only_tuple!(A);
    impl_read_only_tuple!(A, B);
    impl_read_only_tuple!(A, B, C);
    impl_read_only_tuple!(A, B, C, D);
    impl_read_only_tuple!(A, B, C, D, E);
    impl_read_only_tuple!(A, B, C, D, E, F);
}

impl<T: Component> QueryItem for &T {
    type Component = T;
    type Item<'w> = &'w T;
    const MUTABLE: bool = false;

    unsafe fn fetch<'w>(storage: NonNull<ComponentStorage<T>>, entity: EntityId) -> Option<&'w T> {
        let storage = storage.as_ptr();
        // SAFETY: the caller guarantees `storage` is live for 'w; only shared
        // access is performed.
        unsafe {
            let slot = *(*storage).index.get(&entity)?;
            Some(&*(*storage).values.as_ptr().add(slot))
        }
    }
}

impl<T: Component> ReadOnlyItem for &T {}

impl<T: Component> QueryItem for &mut T {
    type Component = T;
    type Item<'w> = &'w mut T;
    const MUTABLE: bool = true;

    unsafe fn fetch<'w>(storage: NonNull<ComponentStorage<T>>, entity: EntityId) -> Option<&'w mut T> {
        let storage = storage.as_ptr();
        // SAFETY: the caller holds exclusive access to the storage and fetches
        // each entity at most once, so this slot is not aliased.
        unsafe {
            let slot = *(*storage).index.get(&entity)?;
            Some(&mut *(*storage).values.as_mut_ptr().add(slot))
        }
    }
}

fn resolve<T: Component>(
    storages: &[Box<dyn AnyStorage>],
    registry: &ComponentRegistry,
) -> Option<NonNull<ComponentStorage<T>>> {
    let id = registry.lookup::<T>()?;
    storages[id.index()]
        .as_any()
        .downcast_ref::<ComponentStorage<T>>()
        .map(NonNull::from)
}

fn resolve_mut<T: Component>(
    storages: &mut [Box<dyn AnyStorage>],
    registry: &ComponentRegistry,
) -> Option<NonNull<ComponentStorage<T>>> {
    let id = registry.lookup::<T>()?;
    storages[id.index()]
        .as_any_mut()
        .downcast_mut::<ComponentStorage<T>>()
        .map(NonNull::from)
}

// ---------------------------------------------------------------------------
// Query trait -- a tuple of QueryItems
// ---------------------------------------------------------------------------

/// A tuple of query items: `(&A,)`, `(&mut A, &B)`, ...
pub trait Query {
    /// The per-entity output type.
    type Item<'w>;
    /// Resolved storage pointers, one per item.
    type State: Copy;

    /// `(tag, mutable)` for every item, or `None` if some type was never
    /// registered (no entity can match).
    fn accesses(registry: &ComponentRegistry) -> Option<Vec<(ComponentTypeId, bool)>>;

    /// Resolve storages through a shared borrow.
    fn state(storages: &[Box<dyn AnyStorage>], registry: &ComponentRegistry) -> Option<Self::State>;

    /// Resolve storages through an exclusive borrow.
    fn state_mut(
        storages: &mut [Box<dyn AnyStorage>],
        registry: &ComponentRegistry,
    ) -> Option<Self::State>;

    /// Fetch every item for `entity`.
    ///
    /// # Safety
    ///
    /// See [`QueryItem::fetch`]; `state` must come from
    /// [`state_mut`](Self::state_mut) if any item is mutable.
    unsafe fn fetch<'w>(state: Self::State, entity: EntityId) -> Option<Self::Item<'w>>;
}

/// A query whose items are all `&T`; usable through `&EntityManager`.
///
/// Sealed like [`ReadOnlyItem`].
pub trait ReadOnlyQuery: Query + sealed::ReadOnly {}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: QueryItem),+> Query for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);
            type State = ($(NonNull<ComponentStorage<$name::Component>>,)+);

            fn accesses(registry: &ComponentRegistry) -> Option<Vec<(ComponentTypeId, bool)>> {
                Some(vec![$((registry.lookup::<$name::Component>()?, $name::MUTABLE)),+])
            }

            fn state(
                storages: &[Box<dyn AnyStorage>],
                registry: &ComponentRegistry,
            ) -> Option<Self::State> {
                Some(($(resolve::<$name::Component>(storages, registry)?,)+))
            }

            fn state_mut(
                storages: &mut [Box<dyn AnyStorage>],
                registry: &ComponentRegistry,
            ) -> Option<Self::State> {
                Some(($(resolve_mut::<$name::Component>(storages, registry)?,)+))
            }

            #[allow(non_snake_case)]
            unsafe fn fetch<'w>(state: Self::State, entity: EntityId) -> Option<Self::Item<'w>> {
                let ($($name,)+) = state;
                // SAFETY: forwarded from the caller.
                unsafe { Some(($(<$name as QueryItem>::fetch($name, entity)?,)+)) }
            }
        }

        impl<$($name: ReadOnlyItem),+> ReadOnlyQuery for ($($name,)+) {}
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);

/// Panics if a type is requested mutably more than once, or both mutably and
/// immutably.
fn validate_no_access_conflicts(accesses: &[(ComponentTypeId, bool)]) {
    for (i, &(id, mutable)) in accesses.iter().enumerate() {
        for &(other, other_mutable) in &accesses[i + 1..] {
            if id != other {
                continue;
            }
            if mutable && other_mutable {
                panic!("query contains duplicate mutable access to the same component type");
            }
            if mutable || other_mutable {
                panic!("query contains overlapping read and mutable access to the same component type");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Iterator returned by [`EntityManager::query`].
pub struct QueryIter<'w, Q: Query> {
    entities: btree_map::Iter<'w, EntityId, EntityRecord>,
    required: ComponentSet,
    state: Option<Q::State>,
}

impl<'w, Q: Query> Iterator for QueryIter<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.state?;
        for (&id, record) in self.entities.by_ref() {
            if !record.components.is_superset_of(&self.required) {
                continue;
            }
            // SAFETY: `state` was resolved from storages borrowed for 'w and
            // every item is read-only.
            if let Some(item) = unsafe { Q::fetch(state, id) } {
                return Some((id, item));
            }
        }
        None
    }
}

/// Iterator returned by [`EntityManager::query_mut`].
pub struct QueryIterMut<'w, Q: Query> {
    entities: btree_map::Iter<'w, EntityId, EntityRecord>,
    required: ComponentSet,
    state: Option<Q::State>,
    _marker: PhantomData<&'w mut EntityManager>,
}

impl<'w, Q: Query> Iterator for QueryIterMut<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.state?;
        for (&id, record) in self.entities.by_ref() {
            if !record.components.is_superset_of(&self.required) {
                continue;
            }
            // SAFETY: `state` was resolved from an exclusive borrow held for
            // 'w, access conflicts were rejected up front, and each entity is
            // yielded once.
            if let Some(item) = unsafe { Q::fetch(state, id) } {
                return Some((id, item));
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// EntityManager query API
// ---------------------------------------------------------------------------

impl EntityManager {
    /// Typed read-only view over every entity that has all requested types.
    ///
    /// Only `&T` items are accepted; mutable access needs
    /// [`query_mut`](Self::query_mut):
    ///
    /// ```compile_fail
    /// use opfor_ecs::prelude::*;
    ///
    /// #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
    /// struct Pos(f32);
    ///
    /// let mut em = EntityManager::new();
    /// em.create_entity_with::<(Pos,)>();
    /// let shared: &EntityManager = &em;
    /// for (_, (p,)) in shared.query::<(&mut Pos,)>() {
    ///     p.0 += 1.0;
    /// }
    /// ```
    ///
    /// Nor can a downstream crate opt `&mut T` in, since the marker is sealed:
    ///
    /// ```compile_fail
    /// use opfor_ecs::query::ReadOnlyItem;
    ///
    /// #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
    /// struct Pos(f32);
    ///
    /// impl ReadOnlyItem for &mut Pos {}
    /// ```
    pub fn query<Q: ReadOnlyQuery>(&self) -> QueryIter<'_, Q> {
        let accesses = Q::accesses(&self.registry);
        let state = accesses
            .as_ref()
            .and_then(|_| Q::state(&self.storages, &self.registry));
        QueryIter {
            entities: self.entities.iter(),
            required: required_set(accesses.as_deref()),
            state,
        }
    }

    /// Typed mutable view over every entity that has all requested types.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names a component type mutably more than once, or both
    /// mutably and immutably.
    pub fn query_mut<Q: Query>(&mut self) -> QueryIterMut<'_, Q> {
        let accesses = Q::accesses(&self.registry);
        if let Some(accesses) = &accesses {
            validate_no_access_conflicts(accesses);
        }
        let state = match &accesses {
            Some(_) => Q::state_mut(&mut self.storages, &self.registry),
            None => None,
        };
        QueryIterMut {
            entities: self.entities.iter(),
            required: required_set(accesses.as_deref()),
            state,
            _marker: PhantomData,
        }
    }

    /// Ids of every live entity that has all types in `S`, in creation order.
    ///
    /// The result is a snapshot; it does not track later changes.
    pub fn entities_with<S: ComponentTuple>(&self) -> Vec<EntityId> {
        match S::lookup(&self.registry) {
            Some(types) => self.entities_matching(&ComponentSet::from_ids(types)),
            None => Vec::new(),
        }
    }

    /// Ids of every live entity whose tag is a superset of `required`.
    pub fn entities_matching(&self, required: &ComponentSet) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, record)| record.components.is_superset_of(required))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Ids of every live entity that has all components registered under
    /// `names`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownComponent`] for the first unregistered name.
    pub fn entities_with_names(&self, names: &[&str]) -> Result<Vec<EntityId>, EcsError> {
        let mut required = ComponentSet::new();
        for name in names {
            required.insert(self.type_by_name(name)?);
        }
        Ok(self.entities_matching(&required))
    }
}

fn required_set(accesses: Option<&[(ComponentTypeId, bool)]>) -> ComponentSet {
    accesses
        .map(|a| ComponentSet::from_ids(a.iter().map(|&(id, _)| id)))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
