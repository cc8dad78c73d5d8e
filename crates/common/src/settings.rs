//! Settings file format shared by the CLI and desktop viewer.
//!
//! Files ending in `.json` are parsed as JSON, everything else as YAML:
//! ```yaml
//! grid:
//!   spacing: 10.0
//!   major_every: 1
//!   minor_color: [1.0, 1.0, 1.0, 1.0]
//! motion:
//!   velocity: [20.0, -10.0]
//!   manual_rotation:
//!     x: 100.0
//!     animation_duration: 0.6
//! engine:
//!   animate_spacing_changes: true
//! ```

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{EngineOptions, GridConfig, ManualRotationTarget, SensorSensitivity};

/// Which inputs drive the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Drift in points per second. Non-zero velocity suppresses the sensor.
    pub velocity: Vec2,
    /// External offset added to the drift, e.g. a scroll position.
    pub phase: Vec2,
    /// Consume orientation samples with this sensitivity.
    pub sensor: Option<SensorSensitivity>,
    pub manual_rotation: Option<ManualRotationTarget>,
}

/// Complete settings document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub grid: GridConfig,
    pub motion: MotionSettings,
    pub engine: EngineOptions,
}

impl GridSettings {
    /// Load and validate settings from a YAML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_yaml::from_str(text)?;
        settings.normalized()
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(text)?;
        settings.normalized()
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn normalized(mut self) -> Result<Self, ConfigError> {
        self.grid = self.grid.normalized()?;
        Ok(self)
    }
}
