//! Engine-level errors.

use opfor_ecs::EcsError;

/// Errors produced by the engine layer on top of the ECS.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An ECS operation failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// A configuration value is out of range.
    #[error("invalid config field '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The configuration file could not be read.
    #[error("failed to read config '{path}'")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration JSON did not parse.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// An asset handle that was removed or never issued.
    #[error("stale {kind} handle {id}")]
    StaleHandle { kind: &'static str, id: u64 },

    /// A model references a PBR material that is not loaded.
    #[error("unknown material '{name}'")]
    UnknownMaterial { name: String },
}
