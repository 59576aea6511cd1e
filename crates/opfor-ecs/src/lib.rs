//! Opfor ECS -- sparse-set Entity Component System with ordered systems.
//!
//! Entities are plain ids carrying a component-set tag. Components live in one
//! sparse storage per type, owned by the [`EntityManager`](manager::EntityManager),
//! which keeps tags and storages in lockstep. Systems run once per frame in
//! registration order through the [`SystemManager`](system::SystemManager).
//!
//! # Quick Start
//!
//! ```
//! use opfor_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut ecs = EcsEngine::new();
//! let entity = ecs.entities.create_entity_with::<(Position, Velocity)>();
//! ecs.entities.set(entity, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
//!
//! ecs.systems
//!     .add_fn_system("movement", |entities, dt| {
//!         for (_, (pos, vel)) in entities.query_mut::<(&mut Position, &Velocity)>() {
//!             pos.x += vel.dx * dt;
//!             pos.y += vel.dy * dt;
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! ecs.update(0.5).unwrap();
//! assert_eq!(ecs.entities.get::<Position>(entity).unwrap().x, 0.5);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod engine;
pub mod entity;
pub mod manager;
#[allow(unsafe_code)]
pub mod query;
pub mod storage;
pub mod system;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity is not live (deleted or never allocated).
    #[error("entity {entity:?} does not exist (deleted or never allocated)")]
    UnknownEntity { entity: entity::EntityId },

    /// The entity is live but has no component of the requested type.
    #[error("entity {entity:?} has no '{component}' component")]
    ComponentNotFound {
        entity: entity::EntityId,
        component: String,
    },

    /// A component type or name was registered twice.
    #[error("component '{name}' is already registered")]
    DuplicateRegistration { name: String },

    /// A component name that was never registered.
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// A JSON value did not match the component's schema.
    #[error("failed to deserialize component '{component}': {details}")]
    ComponentDeserialization { component: String, details: String },

    /// A system with this name is already registered.
    #[error("duplicate system name: {name:?}")]
    DuplicateSystem { name: String },

    /// A system update returned an error; the rest of the frame was skipped.
    #[error("system '{system}' failed")]
    SystemFailed {
        system: String,
        #[source]
        source: Box<EcsError>,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{
        Component, ComponentInfo, ComponentRegistry, ComponentSet, ComponentTuple, ComponentTypeId,
    };
    pub use crate::engine::EcsEngine;
    pub use crate::entity::EntityId;
    pub use crate::manager::{EntityManager, EntityRef};
    pub use crate::query::{Query, QueryItem, QueryIter, QueryIterMut};
    pub use crate::storage::{AnyStorage, ComponentStorage};
    pub use crate::system::{FnSystem, FrameDiagnostics, System, SystemManager};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Health(u32);

    #[test]
    fn create_set_query_back() {
        let mut em = EntityManager::new();
        let e = em.create_entity_with::<(Position, Velocity)>();
        em.set(e, Position { x: 1.0, y: 2.0 }).unwrap();
        em.set(e, Velocity { dx: 3.0, dy: 4.0 }).unwrap();

        let results: Vec<_> = em.query::<(&Position, &Velocity)>().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, e);
        assert_eq!(results[0].1 .0, &Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn scale_10k_entities() {
        let mut em = EntityManager::new();
        let mut entities = Vec::with_capacity(10_000);
        for i in 0..10_000u32 {
            let e = em.create_entity();
            em.insert_component(e, Position { x: i as f32, y: 0.0 }).unwrap();
            if i % 2 == 0 {
                em.insert_component(e, Velocity { dx: 1.0, dy: -1.0 }).unwrap();
            }
            entities.push(e);
        }

        assert_eq!(em.query::<(&Position,)>().count(), 10_000);
        assert_eq!(em.query::<(&Position, &Velocity)>().count(), 5_000);

        for (_e, (pos, vel)) in em.query_mut::<(&mut Position, &Velocity)>() {
            pos.x += vel.dx;
        }
        assert_eq!(em.get::<Position>(entities[0]).unwrap().x, 1.0);
        assert_eq!(em.get::<Position>(entities[1]).unwrap().x, 1.0);

        for e in entities.iter().take(5_000) {
            em.delete_entity(*e);
        }
        assert_eq!(em.entity_count(), 5_000);
        assert_eq!(em.query::<(&Position, &Velocity)>().count(), 2_500);
        assert_eq!(em.storage::<Position>().unwrap().len(), 5_000);
    }

    #[test]
    fn system_failure_is_propagated_and_stops_frame() {
        let mut ecs = EcsEngine::new();
        let e = ecs.entities.create_entity();
        ecs.systems
            .add_fn_system("needs_health", move |entities, _dt| {
                entities.get::<Health>(e)?;
                Ok(())
            })
            .unwrap();
        ecs.systems
            .add_fn_system("never_runs", move |entities, _dt| {
                entities.insert_component(e, Health(1))
            })
            .unwrap();

        let err = ecs.update(0.016).unwrap_err();
        match err {
            EcsError::SystemFailed { system, source } => {
                assert_eq!(system, "needs_health");
                assert!(matches!(*source, EcsError::ComponentNotFound { .. }));
            }
            other => panic!("expected SystemFailed, got {other:?}"),
        }
        assert!(!ecs.entities.has_components::<(Health,)>(e));
    }
}
