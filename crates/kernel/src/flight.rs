//! Aviation camera rig: taxi and flight perspectives over a grid engine.
//!
//! The rig owns no motion of its own. It translates flight phases into engine
//! inputs (velocity, manual pitch target) and widens spacing as the camera
//! tilts, so the grid reads as a runway when taxiing and a map in flight.

use glam::Vec2;
use gridscape_common::{GridError, ManualRotationTarget};
use serde::{Deserialize, Serialize};

use crate::engine::GridEngine;

/// Camera pitch preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    /// Tilted toward the horizon.
    Taxiing,
    /// Looking straight down.
    #[default]
    Flight,
}

impl FlightMode {
    pub fn pitch_degrees(self) -> f32 {
        match self {
            FlightMode::Taxiing => 100.0,
            FlightMode::Flight => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    Takeoff,
    Landing,
    Taxiing,
}

impl FlightPhase {
    pub fn velocity(self) -> Vec2 {
        match self {
            FlightPhase::Takeoff => Vec2::new(20.0, -10.0),
            FlightPhase::Landing => Vec2::new(20.0, 10.0),
            FlightPhase::Taxiing => Vec2::new(15.0, 0.0),
        }
    }

    pub fn mode(self) -> FlightMode {
        match self {
            FlightPhase::Takeoff | FlightPhase::Landing => FlightMode::Flight,
            FlightPhase::Taxiing => FlightMode::Taxiing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AviationRig {
    base_spacing: f32,
    animation_duration: f32,
    mode: FlightMode,
}

impl AviationRig {
    pub fn new(base_spacing: f32) -> Self {
        Self {
            base_spacing,
            animation_duration: 0.6,
            mode: FlightMode::default(),
        }
    }

    pub fn with_animation_duration(mut self, seconds: f32) -> Self {
        self.animation_duration = seconds;
        self
    }

    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    pub fn base_spacing(&self) -> f32 {
        self.base_spacing
    }

    /// Apply the current mode to an engine without animating.
    pub fn attach(&self, engine: &mut GridEngine) -> Result<(), GridError> {
        engine.set_manual_rotation(ManualRotationTarget::pitch(self.mode.pitch_degrees(), 0.0));
        self.sync_spacing(engine)
    }

    pub fn set_mode(&mut self, engine: &mut GridEngine, mode: FlightMode) {
        self.mode = mode;
        engine.set_manual_rotation(ManualRotationTarget::pitch(
            mode.pitch_degrees(),
            self.animation_duration,
        ));
        tracing::debug!(?mode, "flight mode");
    }

    pub fn set_phase(&mut self, engine: &mut GridEngine, phase: FlightPhase) {
        engine.set_velocity(phase.velocity());
        self.set_mode(engine, phase.mode());
        tracing::info!(?phase, "flight phase");
    }

    /// Spacing for a camera pitch in degrees.
    pub fn adjusted_spacing(&self, pitch_degrees: f32) -> f32 {
        self.base_spacing * (1.0 + pitch_degrees.abs() / 90.0)
    }

    /// Advance the engine one step, tracking spacing to the animated pitch.
    pub fn tick(&self, engine: &mut GridEngine, dt: f32) -> Result<(), GridError> {
        engine.advance(dt);
        self.sync_spacing(engine)
    }

    fn sync_spacing(&self, engine: &mut GridEngine) -> Result<(), GridError> {
        let spacing = self.adjusted_spacing(engine.manual_rotation().x.to_degrees());
        if spacing != engine.config().spacing {
            engine.set_spacing(spacing)?;
        }
        Ok(())
    }
}
