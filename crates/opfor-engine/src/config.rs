//! Application configuration.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid config.

use std::path::Path;

use crate::error::EngineError;

/// Configuration for an [`Application`](crate::application::Application).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Window / application title.
    pub name: String,
    /// Default `tracing` filter, used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Upper bound, in seconds, on the delta time passed to systems. Must be
    /// positive and finite.
    pub max_frame_dt: f32,
    /// Keep the editor state (selection, inspector) in sync every frame.
    pub editor: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "opfor".to_owned(),
            log_filter: "warn".to_owned(),
            max_frame_dt: 0.25,
            editor: false,
        }
    }
}

impl AppConfig {
    /// Parse and validate a config from a JSON string.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigParse`] on malformed JSON,
    /// [`EngineError::InvalidConfig`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigIo`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check that every field is in range.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.max_frame_dt.is_finite() || self.max_frame_dt <= 0.0 {
            return Err(EngineError::InvalidConfig {
                field: "max_frame_dt",
                reason: format!("must be positive and finite, got {}", self.max_frame_dt),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(EngineError::InvalidConfig {
                field: "log_filter",
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}
