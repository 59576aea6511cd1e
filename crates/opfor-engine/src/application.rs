//! The [`Application`]: ECS, assets and configuration in one place.
//!
//! An application owns exactly one [`EcsEngine`] and one [`AssetLibrary`].
//! Callers hold the application and pass it (or the parts they need) down;
//! there is no global accessor. Each call to [`update`](Application::update):
//!
//! 1. Clamps the delta time to `[0, max_frame_dt]`.
//! 2. Runs every system once, in registration order. The first system is
//!    always the begin-scene system.
//! 3. Refreshes the editor panel models if the editor is enabled.
//!
//! # Example
//!
//! ```
//! use opfor_engine::prelude::*;
//!
//! let mut app = Application::new(AppConfig::default()).unwrap();
//! let lamp = app.create_entity_with::<(TransformComponent, PointLightComponent)>();
//! app.install_scene_collector().unwrap();
//!
//! app.update(1.0 / 60.0).unwrap();
//! assert_eq!(app.scene().borrow().lights[0].entity, lamp);
//! assert_eq!(app.frame_count(), 1);
//! ```

use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use opfor_ecs::prelude::*;
use tracing::{debug, info, warn};

use crate::arena::Handle;
use crate::assets::{AssetLibrary, Mesh, Model};
use crate::components::{register_builtin_components, ModelComponent};
use crate::config::AppConfig;
use crate::editor::EditorState;
use crate::error::EngineError;
use crate::logging::init_tracing;
use crate::scene::{BeginSceneSystem, SceneCollectSystem, SharedSceneFrame};

// ---------------------------------------------------------------------------
// PlayState
// ---------------------------------------------------------------------------

/// Editor play mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Callback run on a play-state transition.
pub type PlayHook = Box<dyn FnMut(&mut EntityManager)>;

#[derive(Default)]
struct PlayHooks {
    on_start: Vec<PlayHook>,
    on_stop: Vec<PlayHook>,
}

impl std::fmt::Debug for PlayHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayHooks")
            .field("on_start", &self.on_start.len())
            .field("on_stop", &self.on_stop.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Owner of the ECS, the asset library and the configuration.
#[derive(Debug)]
pub struct Application {
    ecs: EcsEngine,
    assets: AssetLibrary,
    config: AppConfig,
    scene: SharedSceneFrame,
    play_state: PlayState,
    play_hooks: PlayHooks,
    editor: EditorState,
}

impl Application {
    /// Validate `config`, register the built-in components and install the
    /// begin-scene system.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] if validation fails.
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let mut ecs = EcsEngine::new();
        register_builtin_components(&mut ecs.entities)?;
        let scene = SharedSceneFrame::default();
        ecs.systems
            .add_system(BeginSceneSystem::new(Rc::clone(&scene)))?;

        info!(name = %config.name, editor = config.editor, "application created");
        Ok(Self {
            ecs,
            assets: AssetLibrary::new(),
            config,
            scene,
            play_state: PlayState::Stopped,
            play_hooks: PlayHooks::default(),
            editor: EditorState::default(),
        })
    }

    /// Load the config at `path`, install the `tracing` subscriber with its
    /// `log_filter`, and build an application from it.
    ///
    /// An already-installed subscriber is left in place.
    pub fn from_config_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?;
        if !init_tracing(&config.log_filter) {
            debug!("tracing subscriber already installed");
        }
        Ok(Self::new(config)?)
    }

    // -- entities -----------------------------------------------------------

    pub fn create_entity(&mut self) -> EntityId {
        self.ecs.entities.create_entity()
    }

    /// Create an entity carrying default values of every type in `S`.
    pub fn create_entity_with<S: ComponentTuple>(&mut self) -> EntityId {
        self.ecs.entities.create_entity_with::<S>()
    }

    /// Returns `false` if `id` was already dead.
    pub fn delete_entity(&mut self, id: EntityId) -> bool {
        self.ecs.entities.delete_entity(id)
    }

    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if `id` is not live.
    pub fn get_entity(&self, id: EntityId) -> Result<EntityRef<'_>, EcsError> {
        self.ecs.entities.get_entity(id)
    }

    pub fn all_entities(&self) -> Vec<EntityRef<'_>> {
        self.ecs.entities.all_entities()
    }

    pub fn entities_with<S: ComponentTuple>(&self) -> Vec<EntityId> {
        self.ecs.entities.entities_with::<S>()
    }

    pub fn entities(&self) -> &EntityManager {
        &self.ecs.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.ecs.entities
    }

    // -- systems ------------------------------------------------------------

    /// Construct `S` from its `Default` and append it to the frame.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if a system with the same name exists.
    pub fn instantiate_system<S: System + Default>(&mut self) -> Result<(), EcsError> {
        self.ecs.systems.instantiate_system::<S>()
    }

    /// # Errors
    ///
    /// As [`instantiate_system`](Self::instantiate_system).
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        self.ecs.systems.add_system(system)
    }

    /// # Errors
    ///
    /// As [`instantiate_system`](Self::instantiate_system).
    pub fn add_fn_system<F>(&mut self, name: &str, func: F) -> Result<(), EcsError>
    where
        F: FnMut(&mut EntityManager, f32) -> Result<(), EcsError> + 'static,
    {
        self.ecs.systems.add_fn_system(name, func)
    }

    /// Append the scene collection system at the current end of the frame.
    /// Call this after the gameplay systems so the renderer sees their
    /// writes.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if it is already installed.
    pub fn install_scene_collector(&mut self) -> Result<(), EcsError> {
        self.ecs
            .systems
            .add_system(SceneCollectSystem::new(Rc::clone(&self.scene)))
    }

    pub fn systems(&self) -> &SystemManager {
        &self.ecs.systems
    }

    // -- frame --------------------------------------------------------------

    /// Run one frame.
    ///
    /// Negative or non-finite `delta_time` is treated as zero; values above
    /// `max_frame_dt` are clamped to it.
    ///
    /// # Errors
    ///
    /// [`EngineError::Ecs`] wrapping [`EcsError::SystemFailed`] if a system
    /// failed. The frame counter is not advanced in that case.
    pub fn update(&mut self, delta_time: f32) -> Result<(), EngineError> {
        let dt = self.clamp_delta(delta_time);
        self.ecs.update(dt)?;
        if self.config.editor {
            self.editor.refresh(&self.ecs.entities);
        }
        Ok(())
    }

    /// Run `frames` frames of `delta_time` each.
    pub fn run_frames(&mut self, frames: u64, delta_time: f32) -> anyhow::Result<()> {
        for _ in 0..frames {
            let frame = self.frame_count();
            self.update(delta_time)
                .with_context(|| format!("frame {frame}"))?;
        }
        Ok(())
    }

    /// Number of frames that ran to completion.
    pub fn frame_count(&self) -> u64 {
        self.ecs.systems.frame_count()
    }

    fn clamp_delta(&self, delta_time: f32) -> f32 {
        if !delta_time.is_finite() || delta_time < 0.0 {
            debug!(delta_time, "invalid frame delta, using 0");
            return 0.0;
        }
        if delta_time > self.config.max_frame_dt {
            warn!(
                delta_time,
                max = self.config.max_frame_dt,
                "frame delta clamped"
            );
            return self.config.max_frame_dt;
        }
        delta_time
    }

    // -- assets -------------------------------------------------------------

    pub fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetLibrary {
        &mut self.assets
    }

    /// Replace the model on `entity` with one built from `meshes`.
    ///
    /// The entity gets a [`ModelComponent`] if it has none. The previous
    /// model, if any, is released together with its meshes.
    ///
    /// # Errors
    ///
    /// [`EngineError::Ecs`] with [`EcsError::UnknownEntity`] if `entity` is
    /// not live; nothing is registered in that case.
    pub fn rebuild_model(
        &mut self,
        entity: EntityId,
        path: &str,
        meshes: Vec<Mesh>,
    ) -> Result<Handle<Model>, EngineError> {
        if !self.ecs.entities.has_components::<(ModelComponent,)>(entity) {
            self.ecs.entities.add_components::<(ModelComponent,)>(entity)?;
        }
        let handle = self.assets.register_model(path, meshes);
        let mesh_handles = self
            .assets
            .model(handle)
            .map(|m| m.meshes.clone())
            .unwrap_or_default();

        let component = self.ecs.entities.get_mut::<ModelComponent>(entity)?;
        let previous = component.model.replace(handle);
        component.path = path.to_owned();
        component.meshes = mesh_handles;

        if let Some(old) = previous {
            // Another entity may have released it already.
            if self.assets.remove_model(old).is_err() {
                debug!(model = old.id(), "previous model already released");
            }
        }
        Ok(handle)
    }

    // -- play state ---------------------------------------------------------

    pub fn play_state(&self) -> PlayState {
        self.play_state
    }

    pub fn is_playing(&self) -> bool {
        self.play_state == PlayState::Playing
    }

    /// Run `hook` every time play starts from [`PlayState::Stopped`].
    pub fn on_start_playing<F>(&mut self, hook: F)
    where
        F: FnMut(&mut EntityManager) + 'static,
    {
        self.play_hooks.on_start.push(Box::new(hook));
    }

    /// Run `hook` every time play stops from `Playing` or `Paused`.
    pub fn on_stop_playing<F>(&mut self, hook: F)
    where
        F: FnMut(&mut EntityManager) + 'static,
    {
        self.play_hooks.on_stop.push(Box::new(hook));
    }

    /// Stopped -> Playing, then the start hooks. Returns whether the state
    /// changed.
    pub fn start_playing(&mut self) -> bool {
        if !self.transition(PlayState::Stopped, PlayState::Playing) {
            return false;
        }
        for hook in &mut self.play_hooks.on_start {
            hook(&mut self.ecs.entities);
        }
        true
    }

    /// Playing -> Paused. Returns whether the state changed. No hooks run.
    pub fn pause_playing(&mut self) -> bool {
        self.transition(PlayState::Playing, PlayState::Paused)
    }

    /// Playing or Paused -> Stopped, then the stop hooks. Returns whether the
    /// state changed.
    pub fn stop_playing(&mut self) -> bool {
        let stopped = self.transition(PlayState::Playing, PlayState::Stopped)
            || self.transition(PlayState::Paused, PlayState::Stopped);
        if !stopped {
            return false;
        }
        for hook in &mut self.play_hooks.on_stop {
            hook(&mut self.ecs.entities);
        }
        true
    }

    fn transition(&mut self, from: PlayState, to: PlayState) -> bool {
        if self.play_state != from {
            return false;
        }
        info!(?from, ?to, "play state changed");
        self.play_state = to;
        true
    }

    // -- misc ---------------------------------------------------------------

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the frame the scene systems fill.
    pub fn scene(&self) -> SharedSceneFrame {
        Rc::clone(&self.scene)
    }

    /// Panel models as of the last frame. Empty unless the editor is
    /// enabled in the config.
    pub fn editor_state(&self) -> &EditorState {
        &self.editor
    }
}
