use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Linear RGBA color. Serialized as a `[r, g, b, a]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Neutral gray used for grid lines when no color is configured.
    pub const SECONDARY: Self = Self::new(0.56, 0.56, 0.58, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[f32; 4]> for Rgba {
    fn from([r, g, b, a]: [f32; 4]) -> Self {
        Self { r, g, b, a }
    }
}

impl From<Rgba> for [f32; 4] {
    fn from(c: Rgba) -> Self {
        c.to_array()
    }
}

/// Stroke parameters for one class of grid line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: Rgba,
    pub width: f32,
}

/// Emphasis class of a grid line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    Minor,
    Major,
}

/// Orientation of a grid line in the local grid plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Runs along Y at a fixed x.
    Vertical,
    /// Runs along X at a fixed y.
    Horizontal,
}

/// A straight segment in grid-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Vec2,
    pub end: Vec2,
}

impl LineSegment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// Visual and structural parameters of the grid.
///
/// `spacing` and `major_every` determine geometry; colors and widths are
/// material-only and never force a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Distance between adjacent lines, in points.
    pub spacing: f32,
    /// Every n-th line (by world index) is major. Values below 1 are clamped.
    pub major_every: i32,
    pub minor_color: Rgba,
    pub major_color: Rgba,
    pub minor_line_width: f32,
    pub major_line_width: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            spacing: 16.0,
            major_every: 4,
            minor_color: Rgba::SECONDARY,
            major_color: Rgba::SECONDARY,
            minor_line_width: 0.5,
            major_line_width: 1.0,
        }
    }
}

impl GridConfig {
    /// Check the config without modifying it.
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(GridError::InvalidConfig(format!(
                "spacing must be positive and finite, got {}",
                self.spacing
            )));
        }
        let bad_width = |w: f32| w.is_nan() || w < 0.0;
        if bad_width(self.minor_line_width) || bad_width(self.major_line_width) {
            return Err(GridError::InvalidConfig(format!(
                "line widths must be non-negative, got minor={} major={}",
                self.minor_line_width, self.major_line_width
            )));
        }
        Ok(())
    }

    /// Validate and clamp `major_every` into range.
    pub fn normalized(mut self) -> Result<Self, GridError> {
        self.validate()?;
        self.major_every = self.major_every.max(1);
        Ok(self)
    }

    /// Effective major interval (always >= 1).
    pub fn major_every(&self) -> u32 {
        self.major_every.max(1) as u32
    }

    /// Length of one repeat of the major-line pattern.
    pub fn major_period(&self) -> f32 {
        self.spacing * self.major_every() as f32
    }

    /// True when both configs produce identical line geometry.
    pub fn same_geometry(&self, other: &GridConfig) -> bool {
        self.spacing == other.spacing && self.major_every() == other.major_every()
    }

    pub fn minor_style(&self) -> LineStyle {
        LineStyle {
            color: self.minor_color,
            width: self.minor_line_width,
        }
    }

    pub fn major_style(&self) -> LineStyle {
        LineStyle {
            color: self.major_color,
            width: self.major_line_width,
        }
    }
}

/// Explicit camera rotation override, in degrees per axis.
///
/// Axes left as `None` contribute nothing. Present axes are added on top of
/// sensor-derived rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualRotationTarget {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    /// Seconds to ease toward a new target. `<= 0` applies immediately.
    pub animation_duration: f32,
}

impl ManualRotationTarget {
    pub fn pitch(degrees: f32, animation_duration: f32) -> Self {
        Self {
            x: Some(degrees),
            animation_duration,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// Target rotation in radians; absent axes are zero.
    pub fn to_radians(&self) -> Vec3 {
        Vec3::new(
            self.x.unwrap_or(0.0).to_radians(),
            self.y.unwrap_or(0.0).to_radians(),
            self.z.unwrap_or(0.0).to_radians(),
        )
    }
}

/// Per-axis gain applied to normalized sensor samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSensitivity {
    /// Scales roll into yaw rotation.
    pub x: f32,
    /// Scales pitch into pitch rotation.
    pub y: f32,
    /// Also translate the grid horizontally with roll.
    pub parallax_pan: bool,
}

impl Default for SensorSensitivity {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            parallax_pan: false,
        }
    }
}

/// Engine-level behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Ease spacing changes instead of snapping.
    pub animate_spacing_changes: bool,
    /// Seconds used for eased spacing changes.
    pub transition_duration: f32,
    /// Logical frame size in points.
    pub viewport: Vec2,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            animate_spacing_changes: false,
            transition_duration: 0.6,
            viewport: Vec2::new(390.0, 844.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.major_period(), 64.0);
    }

    #[test]
    fn non_positive_spacing_rejected() {
        for spacing in [0.0, -4.0, f32::NAN, f32::INFINITY] {
            let config = GridConfig {
                spacing,
                ..GridConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(GridError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn major_every_clamped() {
        let config = GridConfig {
            major_every: -3,
            ..GridConfig::default()
        };
        assert_eq!(config.major_every(), 1);
        assert_eq!(config.normalized().unwrap().major_every, 1);
    }

    #[test]
    fn same_geometry_ignores_materials() {
        let a = GridConfig::default();
        let b = GridConfig {
            major_color: Rgba::WHITE,
            minor_line_width: 3.0,
            ..a
        };
        assert!(a.same_geometry(&b));
        let c = GridConfig { spacing: 32.0, ..a };
        assert!(!a.same_geometry(&c));
    }

    #[test]
    fn manual_rotation_missing_axes_are_zero() {
        let target = ManualRotationTarget::pitch(90.0, 0.6);
        let r = target.to_radians();
        assert!((r.x - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(r.y, 0.0);
        assert!(ManualRotationTarget::default().is_empty());
    }

    #[test]
    fn rgba_serializes_as_array() {
        let json = serde_json::to_string(&Rgba::new(1.0, 0.5, 0.0, 1.0)).unwrap();
        assert_eq!(json, "[1.0,0.5,0.0,1.0]");
    }
}
