//! The [`EntityManager`] owns entity identities, their component-set tags and
//! every per-type component storage.
//!
//! All structural changes go through the manager so that, for every live
//! entity `E` and component type `T`, the tag of `E` contains `T` exactly when
//! the storage for `T` holds an entry for `E`. Each mutating operation checks
//! all of its preconditions before touching either side.

use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::component::{Component, ComponentRegistry, ComponentSet, ComponentTuple, ComponentTypeId};
use crate::entity::{EntityAllocator, EntityId};
use crate::storage::{AnyStorage, ComponentStorage};
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityRecord
// ---------------------------------------------------------------------------

/// Per-entity bookkeeping kept by the manager.
#[derive(Debug, Clone)]
pub(crate) struct EntityRecord {
    pub name: String,
    pub uuid: Uuid,
    pub components: ComponentSet,
}

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Owner of all entities and components.
pub struct EntityManager {
    allocator: EntityAllocator,
    pub(crate) registry: ComponentRegistry,
    /// One storage per registered type, indexed by `ComponentTypeId`.
    pub(crate) storages: Vec<Box<dyn AnyStorage>>,
    /// Live entities. Ids are monotonic, so key order is creation order.
    pub(crate) entities: BTreeMap<EntityId, EntityRecord>,
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("entity_count", &self.entities.len())
            .field("component_types", &self.registry.len())
            .finish()
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            storages: Vec::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Read-only access to the component registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // -- registration -------------------------------------------------------

    /// Register `T` under an explicit display name.
    ///
    /// Registration is optional: any [`Component`] is registered lazily the
    /// first time it is attached. Explicit registration only fixes the name
    /// used by name-based editor access.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateRegistration`] if `T` or `name` is already known.
    pub fn register_component<T: Component>(&mut self, name: &str) -> Result<ComponentTypeId, EcsError> {
        let id = self.registry.register::<T>(name)?;
        self.sync_storages();
        Ok(id)
    }

    /// Tags for `S`, registering unseen types and creating their storages.
    fn register_tuple<S: ComponentTuple>(&mut self) -> Vec<ComponentTypeId> {
        let ids = S::register(&mut self.registry);
        self.sync_storages();
        ids
    }

    fn ensure_registered<T: Component>(&mut self) -> ComponentTypeId {
        let id = self.registry.get_or_register::<T>();
        self.sync_storages();
        id
    }

    /// Create storages for any types registered since the last call.
    fn sync_storages(&mut self) {
        for index in self.storages.len()..self.registry.len() {
            if let Some(info) = self.registry.info(ComponentTypeId(index as u32)) {
                self.storages.push((info.new_storage)());
            }
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity with no components and a default name.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.allocator.allocate();
        self.create_record(id, format!("Entity {}", id.to_raw()))
    }

    /// Create an entity with no components and the given name.
    pub fn create_named(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.allocator.allocate();
        self.create_record(id, name.into())
    }

    /// Create an entity with default-valued components of every type in `S`.
    pub fn create_entity_with<S: ComponentTuple>(&mut self) -> EntityId {
        let types = self.register_tuple::<S>();
        let id = self.create_entity();
        self.attach_defaults(id, &types);
        id
    }

    /// [`create_entity_with`](Self::create_entity_with) under the given name.
    pub fn create_named_with<S: ComponentTuple>(&mut self, name: impl Into<String>) -> EntityId {
        let types = self.register_tuple::<S>();
        let id = self.create_named(name);
        self.attach_defaults(id, &types);
        id
    }

    fn create_record(&mut self, id: EntityId, name: String) -> EntityId {
        debug!(entity = %id, %name, "created entity");
        self.entities.insert(
            id,
            EntityRecord {
                name,
                uuid: Uuid::new_v4(),
                components: ComponentSet::new(),
            },
        );
        id
    }

    /// Delete an entity and erase all of its components.
    ///
    /// Idempotent: returns `false` and changes nothing if `id` is not live.
    pub fn delete_entity(&mut self, id: EntityId) -> bool {
        let Some(record) = self.entities.remove(&id) else {
            if self.allocator.was_allocated(id) {
                debug!(entity = %id, "delete ignored, entity already deleted");
            } else {
                debug!(entity = %id, valid = id.is_valid(), "delete ignored, id never allocated");
            }
            return false;
        };
        for type_id in record.components.iter() {
            self.storages[type_id.index()].remove_entity(id);
        }
        debug!(entity = %id, components = record.components.len(), "deleted entity");
        true
    }

    /// Whether `id` refers to a live entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // -- structural changes -------------------------------------------------

    /// Attach default-constructed values of every type in `S`.
    ///
    /// A type the entity already has is reset to its default value.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live; nothing is attached.
    pub fn add_components<S: ComponentTuple>(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        let types = self.register_tuple::<S>();
        self.attach_defaults(id, &types);
        Ok(())
    }

    /// Attach `value` as the `T` component of `id`, overwriting any existing one.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn insert_component<T: Component>(&mut self, id: EntityId, value: T) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        let type_id = self.ensure_registered::<T>();
        self.typed_storage_mut::<T>(type_id).insert(id, value);
        if let Some(record) = self.entities.get_mut(&id) {
            if record.components.insert(type_id) {
                debug!(entity = %id, component = std::any::type_name::<T>(), "attached component");
            }
        }
        Ok(())
    }

    /// Detach every type in `S` from `id`. Types the entity lacks are skipped.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live; nothing is detached.
    pub fn remove_components<S: ComponentTuple>(&mut self, id: EntityId) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        let types = self.register_tuple::<S>();
        self.detach(id, &types);
        Ok(())
    }

    fn attach_defaults(&mut self, id: EntityId, types: &[ComponentTypeId]) {
        for &type_id in types {
            self.storages[type_id.index()].insert_default(id);
        }
        if let Some(record) = self.entities.get_mut(&id) {
            for &type_id in types {
                record.components.insert(type_id);
            }
        }
        debug!(entity = %id, ?types, "attached default components");
    }

    fn detach(&mut self, id: EntityId, types: &[ComponentTypeId]) {
        let Some(record) = self.entities.get_mut(&id) else {
            return;
        };
        for &type_id in types {
            if record.components.remove(type_id) {
                self.storages[type_id.index()].remove_entity(id);
                debug!(entity = %id, ?type_id, "detached component");
            }
        }
    }

    // -- component access ---------------------------------------------------

    /// Whether `id` is live and has every type in `S`.
    pub fn has_components<S: ComponentTuple>(&self, id: EntityId) -> bool {
        let Some(record) = self.entities.get(&id) else {
            return false;
        };
        match S::lookup(&self.registry) {
            Some(types) => types.iter().all(|&t| record.components.contains(t)),
            None => false,
        }
    }

    /// Shared reference to the `T` component of `id`.
    ///
    /// The reference is tied to a borrow of the manager, so it cannot outlive
    /// the next structural change.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live,
    /// [`EcsError::ComponentNotFound`] if it lacks `T`.
    pub fn get<T: Component>(&self, id: EntityId) -> Result<&T, EcsError> {
        self.ensure_alive(id)?;
        self.storage::<T>()
            .and_then(|storage| storage.get(id))
            .ok_or_else(|| self.component_not_found::<T>(id))
    }

    /// Mutable reference to the `T` component of `id`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn get_mut<T: Component>(&mut self, id: EntityId) -> Result<&mut T, EcsError> {
        self.ensure_alive(id)?;
        match self.registry.lookup::<T>() {
            Some(type_id) if self.storages[type_id.index()].contains(id) => {
                match self.typed_storage_mut::<T>(type_id).get_mut(id) {
                    Some(value) => Ok(value),
                    None => unreachable!("storage for {type_id:?} lost entity {id}"),
                }
            }
            _ => Err(self.component_not_found::<T>(id)),
        }
    }

    /// Replace the `T` component of `id`. Never creates one.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub fn set<T: Component>(&mut self, id: EntityId, value: T) -> Result<(), EcsError> {
        *self.get_mut::<T>(id)? = value;
        Ok(())
    }

    /// Typed storage for `T`, if `T` has been registered.
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        let type_id = self.registry.lookup::<T>()?;
        self.storages[type_id.index()]
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
    }

    fn typed_storage_mut<T: Component>(&mut self, type_id: ComponentTypeId) -> &mut ComponentStorage<T> {
        match self.storages[type_id.index()]
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
        {
            Some(storage) => storage,
            None => unreachable!("storage for {type_id:?} does not hold {}", std::any::type_name::<T>()),
        }
    }

    // -- metadata -----------------------------------------------------------

    /// Display name of `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn name(&self, id: EntityId) -> Result<&str, EcsError> {
        Ok(self.record(id)?.name.as_str())
    }

    /// Rename `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn set_name(&mut self, id: EntityId, name: impl Into<String>) -> Result<(), EcsError> {
        let record = self
            .entities
            .get_mut(&id)
            .ok_or(EcsError::UnknownEntity { entity: id })?;
        record.name = name.into();
        Ok(())
    }

    /// Display UUID of `id`. Not used for identity.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn uuid(&self, id: EntityId) -> Result<Uuid, EcsError> {
        Ok(self.record(id)?.uuid)
    }

    /// Component-set tag of `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn component_set(&self, id: EntityId) -> Result<&ComponentSet, EcsError> {
        Ok(&self.record(id)?.components)
    }

    /// Registered names of the components attached to `id`, in tag order.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn component_names(&self, id: EntityId) -> Result<Vec<&str>, EcsError> {
        let record = self.record(id)?;
        Ok(record
            .components
            .iter()
            .filter_map(|t| self.registry.name_of(t))
            .collect())
    }

    // -- handles ------------------------------------------------------------

    /// Handle to a live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn get_entity(&self, id: EntityId) -> Result<EntityRef<'_>, EcsError> {
        let record = self.record(id)?;
        Ok(EntityRef {
            manager: self,
            id,
            record,
        })
    }

    /// Handles to every live entity, in creation order.
    pub fn all_entities(&self) -> Vec<EntityRef<'_>> {
        self.entities
            .iter()
            .map(|(&id, record)| EntityRef {
                manager: self,
                id,
                record,
            })
            .collect()
    }

    /// Ids of every live entity, in creation order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    // -- name-based access (editor tooling) ---------------------------------

    /// Attach a default value of the component registered as `name`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live,
    /// [`EcsError::UnknownComponent`] if `name` is not registered.
    pub fn add_component_by_name(&mut self, id: EntityId, name: &str) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        let type_id = self.type_by_name(name)?;
        self.attach_defaults(id, &[type_id]);
        Ok(())
    }

    /// Serialize the component registered as `name` on `id`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`], [`EcsError::UnknownComponent`], or
    /// [`EcsError::ComponentNotFound`] if the entity lacks the component.
    pub fn component_json(&self, id: EntityId, name: &str) -> Result<serde_json::Value, EcsError> {
        self.ensure_alive(id)?;
        let type_id = self.type_by_name(name)?;
        match self.storages[type_id.index()].to_json(id) {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(EcsError::ComponentDeserialization {
                component: name.to_owned(),
                details: e.to_string(),
            }),
            None => Err(EcsError::ComponentNotFound {
                entity: id,
                component: name.to_owned(),
            }),
        }
    }

    /// Overwrite the component registered as `name` on `id` from JSON.
    ///
    /// # Errors
    ///
    /// As [`component_json`](Self::component_json), plus
    /// [`EcsError::ComponentDeserialization`] if `value` does not decode. The
    /// stored value is unchanged on error.
    pub fn set_component_json(
        &mut self,
        id: EntityId,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), EcsError> {
        self.ensure_alive(id)?;
        let type_id = self.type_by_name(name)?;
        match self.storages[type_id.index()].set_json(id, value) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(EcsError::ComponentDeserialization {
                component: name.to_owned(),
                details: e.to_string(),
            }),
            None => Err(EcsError::ComponentNotFound {
                entity: id,
                component: name.to_owned(),
            }),
        }
    }

    // -- helpers ------------------------------------------------------------

    fn record(&self, id: EntityId) -> Result<&EntityRecord, EcsError> {
        self.entities
            .get(&id)
            .ok_or(EcsError::UnknownEntity { entity: id })
    }

    fn ensure_alive(&self, id: EntityId) -> Result<(), EcsError> {
        self.record(id).map(|_| ())
    }

    pub(crate) fn type_by_name(&self, name: &str) -> Result<ComponentTypeId, EcsError> {
        self.registry
            .lookup_by_name(name)
            .ok_or_else(|| EcsError::UnknownComponent {
                name: name.to_owned(),
                registered: self.registry.names_joined(),
            })
    }

    fn component_not_found<T: Component>(&self, id: EntityId) -> EcsError {
        let component = match self.registry.lookup::<T>() {
            Some(t) => self.registry.name_of(t).unwrap_or_default().to_owned(),
            None => std::any::type_name::<T>().to_owned(),
        };
        EcsError::ComponentNotFound { entity: id, component }
    }
}

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// Read-only handle to a live entity, borrowed from its [`EntityManager`].
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    manager: &'a EntityManager,
    id: EntityId,
    record: &'a EntityRecord,
}

impl<'a> EntityRef<'a> {
    /// The entity's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's display name.
    pub fn name(&self) -> &'a str {
        &self.record.name
    }

    /// The entity's display UUID.
    pub fn uuid(&self) -> Uuid {
        self.record.uuid
    }

    /// The entity's component-set tag.
    pub fn components(&self) -> &'a ComponentSet {
        &self.record.components
    }

    /// Whether the entity has every type in `S`.
    pub fn has<S: ComponentTuple>(&self) -> bool {
        self.manager.has_components::<S>(self.id)
    }

    /// The entity's `T` component.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentNotFound`] if the entity lacks `T`.
    pub fn get<T: Component>(&self) -> Result<&'a T, EcsError> {
        self.manager.get::<T>(self.id)
    }

    /// Registered names of the attached components.
    pub fn component_names(&self) -> Vec<&'a str> {
        self.record
            .components
            .iter()
            .filter_map(|t| self.manager.registry.name_of(t))
            .collect()
    }

    /// Every attached component as `(name, json)`, in tag order.
    pub fn components_json(&self) -> Vec<(&'a str, serde_json::Value)> {
        self.record
            .components
            .iter()
            .filter_map(|t| {
                let name = self.manager.registry.name_of(t)?;
                let value = self.manager.storages[t.index()].to_json(self.id)?.ok()?;
                Some((name, value))
            })
            .collect()
    }
}

impl std::fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id)
            .field("name", &self.record.name)
            .field("components", &self.record.components)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
