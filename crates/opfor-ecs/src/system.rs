//! Systems and the per-frame system manager.
//!
//! The [`SystemManager`] drives the simulation forward one frame at a time.
//! Each frame, every registered [`System`] runs once, in registration order,
//! with exclusive access to the [`EntityManager`] and the elapsed time since
//! the previous frame. A later system therefore observes every mutation made
//! by earlier systems in the same frame.
//!
//! Systems run on the calling thread; nothing here is synchronized.
//!
//! # Example
//!
//! ```
//! use opfor_ecs::prelude::*;
//!
//! let mut entities = EntityManager::new();
//! let mut systems = SystemManager::new();
//! systems.add_fn_system("noop", |_entities, _dt| Ok(())).unwrap();
//!
//! for _ in 0..10 {
//!     systems.on_update(&mut entities, 1.0 / 60.0).unwrap();
//! }
//! assert_eq!(systems.frame_count(), 10);
//! ```

use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::manager::EntityManager;
use crate::EcsError;

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A unit of per-frame logic.
///
/// Systems may keep their own state, but entities and components are only
/// reached through the [`EntityManager`] passed to
/// [`on_update`](System::on_update).
pub trait System: 'static {
    /// Name used for diagnostics and duplicate detection.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run one frame of this system.
    ///
    /// # Errors
    ///
    /// Any [`EcsError`] returned here aborts the rest of the frame; the
    /// manager does not retry.
    fn on_update(&mut self, entities: &mut EntityManager, delta_time: f32) -> Result<(), EcsError>;
}

/// A named closure used as a system.
pub struct FnSystem<F> {
    name: String,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut EntityManager, f32) -> Result<(), EcsError> + 'static,
{
    /// Wrap `func` under `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut EntityManager, f32) -> Result<(), EcsError> + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_update(&mut self, entities: &mut EntityManager, delta_time: f32) -> Result<(), EcsError> {
        (self.func)(entities, delta_time)
    }
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Total time for the frame.
    pub total_time: Duration,
    /// Delta time passed to the systems.
    pub delta_time: f32,
}

// ---------------------------------------------------------------------------
// SystemManager
// ---------------------------------------------------------------------------

/// Ordered collection of systems, run once per frame.
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<Box<dyn System>>,
    frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
}

impl std::fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemManager")
            .field("systems", &self.system_names())
            .field("frame_counter", &self.frame_counter)
            .finish()
    }
}

impl SystemManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `system` to the execution order.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if a system with the same name exists.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        let name = system.name();
        if self.systems.iter().any(|s| s.name() == name) {
            return Err(EcsError::DuplicateSystem {
                name: name.to_owned(),
            });
        }
        trace!(system = name, position = self.systems.len(), "registered system");
        self.systems.push(Box::new(system));
        Ok(())
    }

    /// Construct a system from its `Default` and append it.
    ///
    /// # Errors
    ///
    /// As [`add_system`](Self::add_system).
    pub fn instantiate_system<S: System + Default>(&mut self) -> Result<(), EcsError> {
        self.add_system(S::default())
    }

    /// Append a closure as a named system.
    ///
    /// # Errors
    ///
    /// As [`add_system`](Self::add_system).
    pub fn add_fn_system<F>(&mut self, name: &str, func: F) -> Result<(), EcsError>
    where
        F: FnMut(&mut EntityManager, f32) -> Result<(), EcsError> + 'static,
    {
        self.add_system(FnSystem::new(name, func))
    }

    /// Run every system once, in registration order.
    ///
    /// # Errors
    ///
    /// [`EcsError::SystemFailed`] wrapping the first error returned by a
    /// system. Systems after the failing one do not run and the frame
    /// counter is not advanced.
    pub fn on_update(&mut self, entities: &mut EntityManager, delta_time: f32) -> Result<(), EcsError> {
        let frame_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len());

        for system in &mut self.systems {
            let sys_start = Instant::now();
            if let Err(source) = system.on_update(entities, delta_time) {
                error!(system = system.name(), error = %source, "system update failed");
                return Err(EcsError::SystemFailed {
                    system: system.name().to_owned(),
                    source: Box::new(source),
                });
            }
            let elapsed = sys_start.elapsed();
            trace!(system = system.name(), ?elapsed, "system updated");
            system_times.push((system.name().to_owned(), elapsed));
        }

        self.frame_counter += 1;
        self.last_diagnostics = FrameDiagnostics {
            system_times,
            total_time: frame_start.elapsed(),
            delta_time,
        };
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    /// Number of frames completed.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Diagnostics from the last completed frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
