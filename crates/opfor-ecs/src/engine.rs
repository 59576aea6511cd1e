//! The [`EcsEngine`] pairs one entity manager with one system manager.
//!
//! Both halves are public fields so that callers can borrow them
//! independently, e.g. hand the entity manager to editor code while the
//! system manager is idle.

use crate::manager::EntityManager;
use crate::system::SystemManager;
use crate::EcsError;

/// One entity manager plus the systems that run over it.
#[derive(Debug, Default)]
pub struct EcsEngine {
    /// All entities and components.
    pub entities: EntityManager,
    /// Per-frame systems, in execution order.
    pub systems: SystemManager,
}

impl EcsEngine {
    /// Create an engine with no entities and no systems.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame: every system once, in registration order.
    ///
    /// # Errors
    ///
    /// See [`SystemManager::on_update`].
    pub fn update(&mut self, delta_time: f32) -> Result<(), EcsError> {
        self.systems.on_update(&mut self.entities, delta_time)
    }
}
