//! Shared types for gridscape: grid configuration, line primitives, motion
//! targets, and the settings file format.
//!
//! # Invariants
//! - A `GridConfig` that passed `validate` has finite, positive spacing.
//! - Geometry depends only on spacing and the major interval; everything else
//!   is material.

mod error;
mod settings;
mod types;

pub use error::{ConfigError, GridError};
pub use settings::{GridSettings, MotionSettings};
pub use types::{
    Axis, EngineOptions, GridConfig, LineKind, LineSegment, LineStyle, ManualRotationTarget,
    Rgba, SensorSensitivity,
};
