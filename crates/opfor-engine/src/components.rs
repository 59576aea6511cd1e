//! Built-in component types.
//!
//! These are the components the editor and scene systems know about. Game
//! code is free to define more; any `Default + Clone + Debug + serde` type is
//! a component.

use glam::{Mat4, Quat, Vec3};
use opfor_ecs::prelude::*;

use crate::arena::Handle;
use crate::assets::{Mesh, Model};

/// Registered name of [`TransformComponent`].
pub const TRANSFORM: &str = "Transform";
/// Registered name of [`PointLightComponent`].
pub const POINT_LIGHT: &str = "PointLight";
/// Registered name of [`ModelComponent`].
pub const MODEL: &str = "Model";
/// Registered name of [`SelectedComponent`].
pub const SELECTED: &str = "Selected";
/// Registered name of [`PlayerCameraComponent`].
pub const PLAYER_CAMERA: &str = "PlayerCamera";
/// Registered name of [`DisplayComponent`].
pub const DISPLAY: &str = "Display";
/// Registered name of [`LuaScriptComponent`].
pub const LUA_SCRIPT: &str = "LuaScript";

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// Position, rotation and scale of an entity in world space.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformComponent {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl TransformComponent {
    /// Transform placed at `position` with identity rotation and unit scale.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Back to identity: origin, no rotation, unit scale.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Model matrix (scale, then rotate, then translate).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Omnidirectional light. Positioned by the entity's [`TransformComponent`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PointLightComponent {
    /// Linear RGB.
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for PointLightComponent {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

/// A model loaded from `path`, split into meshes owned by the
/// [`AssetLibrary`](crate::assets::AssetLibrary).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelComponent {
    pub path: String,
    /// Library entry the meshes belong to; `None` until a model is loaded.
    pub model: Option<Handle<Model>>,
    pub meshes: Vec<Handle<Mesh>>,
    /// Shader program to draw with; `None` uses the renderer's default.
    pub shader: Option<u32>,
}

/// Marker for the entity currently selected in the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SelectedComponent;

/// First-person camera driven by player input.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerCameraComponent {
    pub view: Mat4,
    pub projection: Mat4,
    /// Whether keyboard and mouse input move the camera.
    pub use_input: bool,
    /// Vertical field of view in degrees.
    pub fov: f32,
}

impl Default for PlayerCameraComponent {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            use_input: false,
            fov: 60.0,
        }
    }
}

/// The output surface. Exactly one entity is expected to carry it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DisplayComponent {
    pub width: u32,
    pub height: u32,
    pub cursor_hidden: bool,
}

impl Default for DisplayComponent {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            cursor_hidden: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Scripting
// ---------------------------------------------------------------------------

/// Path of the Lua script attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LuaScriptComponent {
    pub path: String,
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register every built-in component under its editor-facing name.
///
/// # Errors
///
/// [`EcsError::DuplicateRegistration`] if any of them is already registered,
/// including lazily through a typed call.
pub fn register_builtin_components(entities: &mut EntityManager) -> Result<(), EcsError> {
    entities.register_component::<TransformComponent>(TRANSFORM)?;
    entities.register_component::<PointLightComponent>(POINT_LIGHT)?;
    entities.register_component::<ModelComponent>(MODEL)?;
    entities.register_component::<SelectedComponent>(SELECTED)?;
    entities.register_component::<PlayerCameraComponent>(PLAYER_CAMERA)?;
    entities.register_component::<DisplayComponent>(DISPLAY)?;
    entities.register_component::<LuaScriptComponent>(LUA_SCRIPT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_defaults_to_identity() {
        let t = TransformComponent::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn reset_restores_identity() {
        let mut t = TransformComponent {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(1.0),
            scale: Vec3::splat(4.0),
        };
        t.reset();
        assert_eq!(t, TransformComponent::default());
    }

    #[test]
    fn matrix_applies_translation() {
        let t = TransformComponent::from_position(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(t.matrix().transform_point3(Vec3::ZERO), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn builtins_register_under_editor_names() {
        let mut em = EntityManager::new();
        register_builtin_components(&mut em).unwrap();
        let names = em.registry().names();
        for expected in [TRANSFORM, POINT_LIGHT, MODEL, SELECTED, PLAYER_CAMERA, DISPLAY, LUA_SCRIPT] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert!(matches!(
            register_builtin_components(&mut em),
            Err(EcsError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn transform_survives_json() {
        let mut em = EntityManager::new();
        register_builtin_components(&mut em).unwrap();
        let e = em.create_entity_with::<(TransformComponent,)>();
        em.set(e, TransformComponent::from_position(Vec3::new(5.0, 6.0, 7.0)))
            .unwrap();
        let json = em.component_json(e, TRANSFORM).unwrap();
        assert_eq!(json["position"], serde_json::json!([5.0, 6.0, 7.0]));
    }
}
