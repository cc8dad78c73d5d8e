use glam::Vec2;
use gridscape_common::{GridConfig, ManualRotationTarget, SensorSensitivity};

/// A high-level request that any host (desktop viewer, CLI script, tests)
/// can produce.
///
/// The engine consumes actions, never raw window or device events, so every
/// host drives the grid through the same vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum GridAction {
    /// Replace the whole grid configuration.
    Configure(GridConfig),
    /// Change line spacing, keeping everything else.
    SetSpacing(f32),
    /// Change the major-line interval.
    SetMajorEvery(i32),
    /// Constant drift in points per second. `Vec2::ZERO` stops drifting.
    SetVelocity(Vec2),
    /// External offset on top of the drift, e.g. from scrolling.
    SetPhase(Vec2),
    /// Start consuming orientation samples.
    EnableSensor(SensorSensitivity),
    /// Stop consuming orientation samples.
    DisableSensor,
    /// Replace the manual rotation override.
    SetManualRotation(ManualRotationTarget),
    /// The hosting view became visible.
    Show,
    /// The hosting view disappeared.
    Hide,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}
