//! Per-frame scene extraction for the renderer.
//!
//! [`BeginSceneSystem`] clears the shared [`SceneFrame`] at the start of a
//! frame. [`SceneCollectSystem`] fills it with one [`DrawItem`] per entity
//! carrying a transform and a model, and one [`LightItem`] per entity
//! carrying a transform and a point light. The renderer reads the frame
//! through the same [`SharedSceneFrame`] handle after the systems ran.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use opfor_ecs::prelude::*;
use tracing::trace;

use crate::arena::Handle;
use crate::assets::Mesh;
use crate::components::{ModelComponent, PointLightComponent, TransformComponent};

/// System name of [`BeginSceneSystem`].
pub const BEGIN_SCENE_SYSTEM: &str = "begin_scene";
/// System name of [`SceneCollectSystem`].
pub const SCENE_COLLECT_SYSTEM: &str = "scene_collect";

// ---------------------------------------------------------------------------
// SceneFrame
// ---------------------------------------------------------------------------

/// One drawable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub entity: EntityId,
    pub model_matrix: Mat4,
    pub meshes: Vec<Handle<Mesh>>,
    pub shader: Option<u32>,
}

/// One point light.
#[derive(Debug, Clone, PartialEq)]
pub struct LightItem {
    pub entity: EntityId,
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

/// Everything the renderer needs for one frame, in entity-creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFrame {
    pub draw_items: Vec<DrawItem>,
    pub lights: Vec<LightItem>,
    /// Number of frames begun so far.
    pub frame: u64,
}

impl SceneFrame {
    fn begin(&mut self) {
        self.draw_items.clear();
        self.lights.clear();
        self.frame += 1;
    }
}

/// Handle shared between the scene systems and the renderer.
pub type SharedSceneFrame = Rc<RefCell<SceneFrame>>;

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Starts a new scene frame.
#[derive(Debug)]
pub struct BeginSceneSystem {
    scene: SharedSceneFrame,
}

impl BeginSceneSystem {
    pub fn new(scene: SharedSceneFrame) -> Self {
        Self { scene }
    }
}

impl System for BeginSceneSystem {
    fn name(&self) -> &str {
        BEGIN_SCENE_SYSTEM
    }

    fn on_update(&mut self, _entities: &mut EntityManager, _dt: f32) -> Result<(), EcsError> {
        self.scene.borrow_mut().begin();
        Ok(())
    }
}

/// Copies drawables and lights into the scene frame.
#[derive(Debug)]
pub struct SceneCollectSystem {
    scene: SharedSceneFrame,
}

impl SceneCollectSystem {
    pub fn new(scene: SharedSceneFrame) -> Self {
        Self { scene }
    }
}

impl System for SceneCollectSystem {
    fn name(&self) -> &str {
        SCENE_COLLECT_SYSTEM
    }

    fn on_update(&mut self, entities: &mut EntityManager, _dt: f32) -> Result<(), EcsError> {
        let mut scene = self.scene.borrow_mut();

        for (entity, (transform, model)) in entities.query::<(&TransformComponent, &ModelComponent)>() {
            scene.draw_items.push(DrawItem {
                entity,
                model_matrix: transform.matrix(),
                meshes: model.meshes.clone(),
                shader: model.shader,
            });
        }
        for (entity, (transform, light)) in entities.query::<(&TransformComponent, &PointLightComponent)>() {
            scene.lights.push(LightItem {
                entity,
                position: transform.position,
                color: light.color,
                intensity: light.intensity,
            });
        }

        trace!(
            draw_items = scene.draw_items.len(),
            lights = scene.lights.len(),
            "collected scene"
        );
        Ok(())
    }
}
