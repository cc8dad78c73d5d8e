use std::f32::consts::{FRAC_PI_3, FRAC_PI_4, PI};

/// Pitch (radians) that maps to a full-scale sample.
const MAX_PITCH: f32 = FRAC_PI_4;
/// Roll (radians) that maps to a full-scale sample.
const MAX_ROLL: f32 = FRAC_PI_3;
const MAX_YAW: f32 = PI;

/// Raw device attitude in radians, as reported by orientation hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Orientation reading normalized to `[-1, 1]` per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl SensorSample {
    pub const NEUTRAL: Self = Self {
        pitch: 0.0,
        roll: 0.0,
        yaw: 0.0,
    };

    pub fn new(pitch: f32, roll: f32, yaw: f32) -> Self {
        Self { pitch, roll, yaw }
    }

    /// Normalize a raw attitude. Pitch spans ±45°, roll ±60° and is inverted
    /// so tilting right pans content left, yaw spans ±180°.
    pub fn from_attitude(attitude: Attitude) -> Self {
        Self {
            pitch: clamp_unit(attitude.pitch / MAX_PITCH),
            roll: clamp_unit(-attitude.roll / MAX_ROLL),
            yaw: clamp_unit(attitude.yaw / MAX_YAW),
        }
    }

    /// Copy with every axis clamped to `[-1, 1]`. NaN becomes 0.
    pub fn clamped(self) -> Self {
        Self {
            pitch: clamp_unit(self.pitch),
            roll: clamp_unit(self.roll),
            yaw: clamp_unit(self.yaw),
        }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}

/// Sensor failures. Never fatal to rendering; the hub reports them through
/// `is_active` and logs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("orientation sensor unavailable on this device")]
    Unavailable,
    #[error("orientation sensor failed to start: {0}")]
    StartFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_attitude_normalizes_to_unit() {
        let s = SensorSample::from_attitude(Attitude {
            pitch: FRAC_PI_4,
            roll: FRAC_PI_3,
            yaw: -PI,
        });
        assert!((s.pitch - 1.0).abs() < 1e-6);
        assert!((s.roll + 1.0).abs() < 1e-6, "roll is inverted");
        assert!((s.yaw + 1.0).abs() < 1e-6);
    }

    #[test]
    fn extreme_attitude_is_clamped() {
        let s = SensorSample::from_attitude(Attitude {
            pitch: 3.0,
            roll: -3.0,
            yaw: 10.0,
        });
        assert_eq!(s, SensorSample::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn clamped_handles_nan() {
        let s = SensorSample::new(f32::NAN, 2.0, -0.5).clamped();
        assert_eq!(s, SensorSample::new(0.0, 1.0, -0.5));
    }
}
