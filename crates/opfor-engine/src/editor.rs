//! Editor panel models.
//!
//! These functions turn ECS state into plain data for the scene hierarchy
//! and properties panels, and apply the panels' actions back. They take the
//! [`EntityManager`] explicitly; nothing here reaches for global state, and
//! nothing here draws.

use glam::{EulerRot, Vec3};
use opfor_ecs::prelude::*;
use tracing::debug;
use uuid::Uuid;

use crate::components::{
    DisplayComponent, LuaScriptComponent, ModelComponent, PlayerCameraComponent,
    PointLightComponent, SelectedComponent, TransformComponent,
};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Make `id` the only selected entity.
///
/// # Errors
///
/// [`EcsError::UnknownEntity`] if `id` is not live; the previous selection
/// is kept in that case.
pub fn select(entities: &mut EntityManager, id: EntityId) -> Result<(), EcsError> {
    entities.get_entity(id)?;
    clear_selection(entities)?;
    entities.add_components::<(SelectedComponent,)>(id)?;
    debug!(entity = %id, "selected entity");
    Ok(())
}

/// Deselect everything.
///
/// # Errors
///
/// Propagates any failure to detach [`SelectedComponent`].
pub fn clear_selection(entities: &mut EntityManager) -> Result<(), EcsError> {
    for id in entities.entities_with::<(SelectedComponent,)>() {
        entities.remove_components::<(SelectedComponent,)>(id)?;
    }
    Ok(())
}

/// The selected entity, if any.
pub fn selected(entities: &EntityManager) -> Option<EntityId> {
    entities
        .entities_with::<(SelectedComponent,)>()
        .into_iter()
        .next()
}

// ---------------------------------------------------------------------------
// Scene hierarchy
// ---------------------------------------------------------------------------

/// One line of the scene hierarchy panel.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HierarchyRow {
    /// Position in the list.
    pub index: usize,
    pub id: EntityId,
    pub name: String,
    pub selected: bool,
}

/// Every live entity, in creation order.
pub fn hierarchy(entities: &EntityManager) -> Vec<HierarchyRow> {
    entities
        .all_entities()
        .into_iter()
        .enumerate()
        .map(|(index, entity)| HierarchyRow {
            index,
            id: entity.id(),
            name: entity.name().to_owned(),
            selected: entity.has::<(SelectedComponent,)>(),
        })
        .collect()
}

/// Entries of the hierarchy panel's "Add..." menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyAction {
    /// An empty entity.
    AddEntity,
    /// A point light at the origin.
    AddPointLight,
}

impl HierarchyAction {
    /// Create the entity and return its id.
    pub fn apply(self, entities: &mut EntityManager) -> EntityId {
        match self {
            Self::AddEntity => entities.create_entity(),
            Self::AddPointLight => {
                entities.create_named_with::<(TransformComponent, PointLightComponent)>("Point Light")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Properties inspector
// ---------------------------------------------------------------------------

/// One collapsible section of the properties panel.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum InspectorSection {
    Transform {
        position: Vec3,
        /// XYZ Euler angles in degrees.
        rotation: Vec3,
        scale: Vec3,
    },
    Model {
        path: String,
        mesh_count: usize,
    },
    Light {
        kind: &'static str,
        color: Vec3,
        intensity: f32,
    },
    LuaScript {
        path: String,
    },
}

impl InspectorSection {
    /// Header shown above the section.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Transform { .. } => "Transform",
            Self::Model { .. } => "Model",
            Self::Light { .. } => "Light",
            Self::LuaScript { .. } => "Lua Script",
        }
    }
}

/// Contents of the properties panel for one entity.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Inspector {
    pub id: EntityId,
    pub name: String,
    pub uuid: Uuid,
    /// Only the sections whose component the entity has, in panel order.
    pub sections: Vec<InspectorSection>,
}

/// Build the properties panel for `id`.
///
/// # Errors
///
/// [`EcsError::UnknownEntity`] if `id` is not live. Missing components are
/// skipped, not errors.
pub fn inspect(entities: &EntityManager, id: EntityId) -> Result<Inspector, EcsError> {
    let entity = entities.get_entity(id)?;
    let mut sections = Vec::new();

    if let Ok(t) = entity.get::<TransformComponent>() {
        let (x, y, z) = t.rotation.to_euler(EulerRot::XYZ);
        sections.push(InspectorSection::Transform {
            position: t.position,
            rotation: Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()),
            scale: t.scale,
        });
    }
    if let Ok(model) = entity.get::<ModelComponent>() {
        sections.push(InspectorSection::Model {
            path: model.path.clone(),
            mesh_count: model.meshes.len(),
        });
    }
    if let Ok(light) = entity.get::<PointLightComponent>() {
        sections.push(InspectorSection::Light {
            kind: "Point",
            color: light.color,
            intensity: light.intensity,
        });
    }
    if let Ok(script) = entity.get::<LuaScriptComponent>() {
        sections.push(InspectorSection::LuaScript {
            path: script.path.clone(),
        });
    }

    Ok(Inspector {
        id,
        name: entity.name().to_owned(),
        uuid: entity.uuid(),
        sections,
    })
}

/// Entries of the properties panel's "Add Component" popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddComponentAction {
    Mesh,
    Transform,
    LuaScript,
}

impl AddComponentAction {
    /// Attach the component to `id`. An existing component of the same type
    /// is reset to its default.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn apply(self, entities: &mut EntityManager, id: EntityId) -> Result<(), EcsError> {
        match self {
            Self::Mesh => entities.add_components::<(ModelComponent,)>(id),
            Self::Transform => entities.add_components::<(TransformComponent,)>(id),
            Self::LuaScript => entities.add_components::<(LuaScriptComponent,)>(id),
        }
    }
}

/// The transform panel's "Reset" button.
///
/// # Errors
///
/// [`EcsError::UnknownEntity`] or [`EcsError::ComponentNotFound`].
pub fn reset_transform(entities: &mut EntityManager, id: EntityId) -> Result<(), EcsError> {
    entities.get_mut::<TransformComponent>(id)?.reset();
    Ok(())
}

/// Flip camera input on the first player camera and hide the cursor while
/// the camera has input. Returns the new input state, or `None` if there is
/// no player camera.
pub fn toggle_camera_input(entities: &mut EntityManager) -> Option<bool> {
    let camera = entities
        .entities_with::<(PlayerCameraComponent,)>()
        .into_iter()
        .next()?;
    let cam = entities.get_mut::<PlayerCameraComponent>(camera).ok()?;
    cam.use_input = !cam.use_input;
    let use_input = cam.use_input;

    if let Some((_, (display,))) = entities.query_mut::<(&mut DisplayComponent,)>().next() {
        display.cursor_hidden = use_input;
    }
    Some(use_input)
}

// ---------------------------------------------------------------------------
// EditorState
// ---------------------------------------------------------------------------

/// Cached panel models, refreshed once per frame.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct EditorState {
    pub rows: Vec<HierarchyRow>,
    pub selected: Option<EntityId>,
    pub inspector: Option<Inspector>,
}

impl EditorState {
    /// Rebuild every panel model from `entities`.
    pub fn refresh(&mut self, entities: &EntityManager) {
        self.rows = hierarchy(entities);
        self.selected = selected(entities);
        self.inspector = self.selected.and_then(|id| inspect(entities, id).ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::register_builtin_components;

    fn manager() -> EntityManager {
        let mut em = EntityManager::new();
        register_builtin_components(&mut em).unwrap();
        em
    }

    #[test]
    fn selection_is_exclusive() {
        let mut em = manager();
        let a = em.create_entity();
        let b = em.create_entity();
        select(&mut em, a).unwrap();
        select(&mut em, b).unwrap();
        assert_eq!(selected(&em), Some(b));
        assert!(!em.has_components::<(SelectedComponent,)>(a));

        em.delete_entity(b);
        assert!(select(&mut em, b).is_err());
        assert_eq!(selected(&em), None);
    }

    #[test]
    fn clear_selection_deselects_all() {
        let mut em = manager();
        let a = em.create_entity();
        let b = em.create_entity();
        em.add_components::<(SelectedComponent,)>(a).unwrap();
        em.add_components::<(SelectedComponent,)>(b).unwrap();
        clear_selection(&mut em).unwrap();
        assert_eq!(selected(&em), None);
        assert!(em.storage::<SelectedComponent>().unwrap().is_empty());
    }

    #[test]
    fn add_point_light_is_named_and_lit() {
        let mut em = manager();
        let id = HierarchyAction::AddPointLight.apply(&mut em);
        assert_eq!(em.name(id).unwrap(), "Point Light");
        assert!(em.has_components::<(TransformComponent, PointLightComponent)>(id));
    }

    #[test]
    fn hierarchy_lists_in_creation_order() {
        let mut em = manager();
        let a = em.create_named("Camera");
        let b = HierarchyAction::AddPointLight.apply(&mut em);
        let c = HierarchyAction::AddEntity.apply(&mut em);
        select(&mut em, b).unwrap();

        let rows = hierarchy(&em);
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert_eq!(rows[0].name, "Camera");
        assert_eq!(rows[1].name, "Point Light");
        assert!(rows[1].selected && !rows[0].selected);
        assert_eq!(rows[2].index, 2);
    }

    #[test]
    fn inspector_skips_absent_components() {
        let mut em = manager();
        let e = em.create_named("Crate");
        AddComponentAction::Transform.apply(&mut em, e).unwrap();
        AddComponentAction::LuaScript.apply(&mut em, e).unwrap();

        let inspector = inspect(&em, e).unwrap();
        assert_eq!(inspector.name, "Crate");
        assert_eq!(inspector.uuid, em.uuid(e).unwrap());
        let titles: Vec<_> = inspector.sections.iter().map(|s| s.title()).collect();
        assert_eq!(titles, vec!["Transform", "Lua Script"]);

        AddComponentAction::Mesh.apply(&mut em, e).unwrap();
        let titles: Vec<_> = inspect(&em, e)
            .unwrap()
            .sections
            .iter()
            .map(|s| s.title())
            .collect();
        assert_eq!(titles, vec!["Transform", "Model", "Lua Script"]);
    }

    #[test]
    fn inspect_dead_entity_fails() {
        let mut em = manager();
        let e = em.create_entity();
        em.delete_entity(e);
        assert!(matches!(inspect(&em, e), Err(EcsError::UnknownEntity { .. })));
    }

    #[test]
    fn reset_transform_restores_identity() {
        let mut em = manager();
        let e = em.create_entity_with::<(TransformComponent,)>();
        em.set(e, TransformComponent::from_position(Vec3::splat(9.0)))
            .unwrap();
        reset_transform(&mut em, e).unwrap();
        assert_eq!(em.get::<TransformComponent>(e).unwrap(), &TransformComponent::default());

        let bare = em.create_entity();
        assert!(matches!(
            reset_transform(&mut em, bare),
            Err(EcsError::ComponentNotFound { .. })
        ));
    }

    #[test]
    fn camera_input_toggles_cursor() {
        let mut em = manager();
        assert_eq!(toggle_camera_input(&mut em), None);

        let camera = em.create_entity_with::<(PlayerCameraComponent,)>();
        let display = em.create_entity_with::<(DisplayComponent,)>();
        assert_eq!(toggle_camera_input(&mut em), Some(true));
        assert!(em.get::<PlayerCameraComponent>(camera).unwrap().use_input);
        assert!(em.get::<DisplayComponent>(display).unwrap().cursor_hidden);
        assert_eq!(toggle_camera_input(&mut em), Some(false));
        assert!(!em.get::<DisplayComponent>(display).unwrap().cursor_hidden);
    }

    #[test]
    fn editor_state_tracks_selection() {
        let mut em = manager();
        let e = em.create_entity_with::<(TransformComponent,)>();
        let mut state = EditorState::default();
        state.refresh(&em);
        assert_eq!(state.rows.len(), 1);
        assert!(state.inspector.is_none());

        select(&mut em, e).unwrap();
        state.refresh(&em);
        assert_eq!(state.selected, Some(e));
        assert_eq!(state.inspector.as_ref().unwrap().id, e);
    }
}
