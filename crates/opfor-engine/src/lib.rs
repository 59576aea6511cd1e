//! Opfor Engine -- application layer over [`opfor_ecs`].
//!
//! Adds what a game or editor needs around the bare ECS: built-in
//! components, an asset library with stable handles, scene extraction for
//! the renderer, editor panel models, configuration and logging setup.
//!
//! # Quick Start
//!
//! ```
//! use opfor_engine::prelude::*;
//!
//! let mut app = Application::new(AppConfig::default()).unwrap();
//! let e = app.create_entity_with::<(TransformComponent,)>();
//!
//! app.add_fn_system("drift", |entities, dt| {
//!     for (_, (t,)) in entities.query_mut::<(&mut TransformComponent,)>() {
//!         t.position.x += dt;
//!     }
//!     Ok(())
//! })
//! .unwrap();
//!
//! app.run_frames(4, 0.25).unwrap();
//! assert_eq!(app.entities().get::<TransformComponent>(e).unwrap().position.x, 1.0);
//! ```

#![deny(unsafe_code)]

pub mod application;
pub mod arena;
pub mod assets;
pub mod components;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod scene;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use opfor_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use opfor_ecs::prelude::*;

    pub use crate::application::{Application, PlayState};
    pub use crate::arena::{Arena, Handle};
    pub use crate::assets::{AssetLibrary, Mesh, Model, PbrMaterial};
    pub use crate::components::{
        register_builtin_components, DisplayComponent, LuaScriptComponent, ModelComponent,
        PlayerCameraComponent, PointLightComponent, SelectedComponent, TransformComponent,
    };
    pub use crate::config::AppConfig;
    pub use crate::editor::{
        AddComponentAction, EditorState, HierarchyAction, HierarchyRow, Inspector,
        InspectorSection,
    };
    pub use crate::error::EngineError;
    pub use crate::logging::init_tracing;
    pub use crate::scene::{
        BeginSceneSystem, DrawItem, LightItem, SceneCollectSystem, SceneFrame, SharedSceneFrame,
    };
}
