use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use gridscape_common::SensorSensitivity;
use gridscape_input::SensorSample;
use serde::Serialize;

/// Yaw reached by a full-scale roll at sensitivity 1, in degrees.
pub const SENSOR_MAX_YAW_DEG: f32 = 35.0;
/// Pitch reached by a full-scale pitch sample at sensitivity 1, in degrees.
pub const SENSOR_MAX_PITCH_DEG: f32 = 10.0;
/// Horizontal pan reached by a full-scale roll, in points.
pub const PARALLAX_MAX_PAN: f32 = 25.0;

/// Per-frame motion owned by one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MotionState {
    /// Drift offset, always inside `[0, period)` per axis.
    pub position_offset: Vec2,
    /// Combined (pitch, yaw, roll) in radians.
    pub camera_rotation: Vec3,
    /// Sensor-driven translation layered on top of the offset.
    pub parallax: Vec2,
}

impl MotionState {
    /// Total local translation applied to the grid.
    pub fn translation(&self) -> Vec2 {
        self.position_offset + self.parallax
    }
}

/// Floored modulo into `[0, period)`. A non-positive period yields 0.
pub fn wrap_into_period(value: f32, period: f32) -> f32 {
    if period.is_nan() || period <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    let r = value.rem_euclid(period);
    // rem_euclid can round up to exactly `period` for tiny negative inputs.
    if r >= period { 0.0 } else { r }
}

pub fn wrap_offset(offset: Vec2, period: f32) -> Vec2 {
    Vec2::new(
        wrap_into_period(offset.x, period),
        wrap_into_period(offset.y, period),
    )
}

/// Rotation contributed by a sensor sample: pitch drives pitch, roll drives
/// yaw. Inputs are clamped before scaling.
pub fn sensor_rotation(sample: SensorSample, sensitivity: SensorSensitivity) -> Vec3 {
    let sample = sample.clamped();
    Vec3::new(
        (sample.pitch * SENSOR_MAX_PITCH_DEG * sensitivity.y).to_radians(),
        (sample.roll * SENSOR_MAX_YAW_DEG * sensitivity.x).to_radians(),
        0.0,
    )
}

pub fn sensor_parallax(sample: SensorSample, sensitivity: SensorSensitivity) -> Vec2 {
    if !sensitivity.parallax_pan {
        return Vec2::ZERO;
    }
    Vec2::new(sample.clamped().roll * PARALLAX_MAX_PAN * sensitivity.x, 0.0)
}

/// Model transform of the grid plane for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridTransform {
    pub translation: Vec2,
    pub rotation: Vec3,
}

impl GridTransform {
    pub fn from_motion(motion: &MotionState) -> Self {
        Self {
            translation: motion.translation(),
            rotation: motion.camera_rotation,
        }
    }

    /// Rotate about the origin after translating in the grid plane.
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_quat(rotation) * Mat4::from_translation(self.translation.extend(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_stays_in_range() {
        let period = 64.0;
        for v in [-1e6, -64.0, -63.9, -1e-7, 0.0, 1e-7, 63.99, 64.0, 128.5, 1e6] {
            let w = wrap_into_period(v, period);
            assert!((0.0..period).contains(&w), "{v} wrapped to {w}");
        }
        assert_eq!(wrap_into_period(-16.0, 64.0), 48.0);
        assert_eq!(wrap_into_period(70.0, 64.0), 6.0);
    }

    #[test]
    fn wrap_degenerate_inputs() {
        assert_eq!(wrap_into_period(5.0, 0.0), 0.0);
        assert_eq!(wrap_into_period(f32::NAN, 64.0), 0.0);
        assert_eq!(wrap_into_period(f32::INFINITY, 64.0), 0.0);
    }

    #[test]
    fn sensor_rotation_scales_per_axis() {
        let full = SensorSample::new(1.0, 1.0, 0.0);
        let r = sensor_rotation(full, SensorSensitivity::default());
        assert!((r.x - 10f32.to_radians()).abs() < 1e-6);
        assert!((r.y - 35f32.to_radians()).abs() < 1e-6);
        assert_eq!(r.z, 0.0);

        let doubled = SensorSensitivity {
            x: 2.0,
            y: 0.5,
            parallax_pan: false,
        };
        let r = sensor_rotation(SensorSample::new(4.0, -1.0, 0.0), doubled);
        assert!((r.x - 5f32.to_radians()).abs() < 1e-6, "pitch is clamped first");
        assert!((r.y + 70f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn parallax_requires_flag() {
        let sample = SensorSample::new(0.0, 0.5, 0.0);
        assert_eq!(sensor_parallax(sample, SensorSensitivity::default()), Vec2::ZERO);
        let pan = SensorSensitivity {
            parallax_pan: true,
            ..SensorSensitivity::default()
        };
        assert_eq!(sensor_parallax(sample, pan), Vec2::new(12.5, 0.0));
    }

    #[test]
    fn identity_transform() {
        let t = GridTransform::default();
        assert_eq!(t.model_matrix(), Mat4::IDENTITY);
        let moved = GridTransform {
            translation: Vec2::new(3.0, 4.0),
            rotation: Vec3::ZERO,
        };
        let p = moved.model_matrix().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(3.0, 4.0, 0.0)).length() < 1e-6);
    }
}
