use std::time::Instant;

use glam::{Vec2, Vec3};
use gridscape_common::{
    EngineOptions, GridConfig, GridError, GridSettings, LineStyle, ManualRotationTarget,
    SensorSensitivity,
};
use gridscape_input::{GridAction, SensorHub, SensorSample, Subscription};

use crate::geometry::GridGeometry;
use crate::motion::{GridTransform, MotionState, sensor_parallax, sensor_rotation, wrap_offset};
use crate::stats::EngineStats;
use crate::transition::Tween;

/// Longest step `tick` will integrate, in seconds.
pub const MAX_DT: f32 = 0.1;

/// Colors and widths for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMaterials {
    pub minor: LineStyle,
    pub major: LineStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing could change; no work was done.
    Skipped,
    Updated { rebuilt: bool },
}

/// One animated infinite grid.
///
/// The engine owns its motion state and cached geometry. Each tick runs, in
/// order: geometry rebuild (only if spacing, major interval, or extent
/// changed), material update, transform update.
///
/// Velocity and the orientation sensor are mutually exclusive: a non-zero
/// velocity releases the sensor subscription, and returning to zero velocity
/// re-acquires it if the sensor is still enabled.
#[derive(Debug)]
pub struct GridEngine {
    config: GridConfig,
    options: EngineOptions,
    geometry: GridGeometry,
    generation: u64,
    half_extent: f32,
    extent_changed: bool,
    effective_spacing: f32,
    spacing_tween: Option<Tween<f32>>,
    motion: MotionState,
    drift: Vec2,
    phase_offset: Vec2,
    velocity: Vec2,
    sensitivity: Option<SensorSensitivity>,
    manual_target: Option<ManualRotationTarget>,
    manual_rotation: Vec3,
    rotation_tween: Option<Tween<Vec3>>,
    sensor_rotation: Vec3,
    sensor_pan: Vec2,
    hub: Option<SensorHub>,
    subscription: Option<Subscription>,
    last_sample: Option<SensorSample>,
    visible: bool,
    dirty: bool,
    last_tick: Option<Instant>,
    stats: EngineStats,
}

impl GridEngine {
    /// Create a visible engine with the given config. Fails if the config is
    /// invalid.
    pub fn new(config: GridConfig, options: EngineOptions) -> Result<Self, GridError> {
        let config = config.normalized()?;
        let half_extent = GridGeometry::half_extent_for(options.viewport);
        let geometry = GridGeometry::build(&config, half_extent)?;
        Ok(Self {
            config,
            options,
            geometry,
            generation: 1,
            half_extent,
            extent_changed: false,
            effective_spacing: config.spacing,
            spacing_tween: None,
            motion: MotionState::default(),
            drift: Vec2::ZERO,
            phase_offset: Vec2::ZERO,
            velocity: Vec2::ZERO,
            sensitivity: None,
            manual_target: None,
            manual_rotation: Vec3::ZERO,
            rotation_tween: None,
            sensor_rotation: Vec3::ZERO,
            sensor_pan: Vec2::ZERO,
            hub: None,
            subscription: None,
            last_sample: None,
            visible: true,
            dirty: true,
            last_tick: None,
            stats: EngineStats {
                rebuilds: 1,
                ..EngineStats::default()
            },
        })
    }

    /// Build an engine from a settings document, applying its motion inputs.
    pub fn from_settings(settings: &GridSettings, hub: Option<SensorHub>) -> Result<Self, GridError> {
        let mut engine = Self::new(settings.grid, settings.engine)?;
        if let Some(hub) = hub {
            engine = engine.with_sensor_hub(hub);
        }
        engine.set_velocity(settings.motion.velocity);
        engine.set_phase_offset(settings.motion.phase);
        if let Some(sensitivity) = settings.motion.sensor {
            engine.enable_sensor(sensitivity);
        }
        if let Some(target) = settings.motion.manual_rotation {
            engine.set_manual_rotation(target);
        }
        Ok(engine)
    }

    /// Attach the shared orientation sensor.
    pub fn with_sensor_hub(mut self, hub: SensorHub) -> Self {
        self.subscription = None;
        self.hub = Some(hub);
        self.sync_subscription();
        self
    }

    /// Replace the configuration.
    ///
    /// Material-only changes never rebuild. Spacing changes either rebuild
    /// immediately or ease over `transition_duration` when
    /// `animate_spacing_changes` is set and the grid is visible. Changing only
    /// the major interval mid-transition keeps the transition running. An
    /// invalid config leaves the committed one in place.
    pub fn set_config(&mut self, config: GridConfig) -> Result<(), GridError> {
        let config = match config.normalized() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("rejected grid config: {e}");
                return Err(e);
            }
        };
        let spacing_changed = config.spacing != self.config.spacing;
        let geometry_changed = !config.same_geometry(&self.config);
        self.config = config;
        self.dirty = true;
        if !geometry_changed {
            return Ok(());
        }

        if !spacing_changed && self.spacing_tween.is_some() {
            return self.rebuild();
        }

        let duration = self.options.transition_duration;
        let animate = self.visible && self.options.animate_spacing_changes && duration > 0.0;
        if spacing_changed && animate {
            self.spacing_tween = Some(Tween::new(self.effective_spacing, config.spacing, duration));
            tracing::debug!(to = config.spacing, duration, "spacing transition started");
            return Ok(());
        }

        self.spacing_tween = None;
        self.effective_spacing = config.spacing;
        self.rebuild()
    }

    pub fn set_spacing(&mut self, spacing: f32) -> Result<(), GridError> {
        self.set_config(GridConfig {
            spacing,
            ..self.config
        })
    }

    pub fn set_major_every(&mut self, major_every: i32) -> Result<(), GridError> {
        self.set_config(GridConfig {
            major_every,
            ..self.config
        })
    }

    /// Resize the logical frame. Geometry is rebuilt on the next tick if the
    /// covered extent changes.
    pub fn set_viewport(&mut self, viewport: Vec2) {
        if !viewport.is_finite() {
            return;
        }
        self.options.viewport = viewport;
        let half_extent = GridGeometry::half_extent_for(viewport);
        if half_extent != self.half_extent {
            self.half_extent = half_extent;
            self.extent_changed = true;
            self.dirty = true;
        }
    }

    /// Constant drift in points per second. A non-finite velocity counts as
    /// zero.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        let velocity = if velocity.is_finite() { velocity } else { Vec2::ZERO };
        if velocity == self.velocity {
            return;
        }
        self.velocity = velocity;
        self.dirty = true;
        self.sync_subscription();
    }

    /// External offset layered on the velocity drift, for example from
    /// scrolling. The sum is wrapped into the major period. A non-finite
    /// offset counts as zero.
    pub fn set_phase_offset(&mut self, phase: Vec2) {
        let phase = if phase.is_finite() { phase } else { Vec2::ZERO };
        if phase == self.phase_offset {
            return;
        }
        self.phase_offset = phase;
        self.dirty = true;
        self.compose_offset();
    }

    pub fn enable_sensor(&mut self, sensitivity: SensorSensitivity) {
        self.sensitivity = Some(sensitivity);
        self.dirty = true;
        self.sync_subscription();
    }

    pub fn disable_sensor(&mut self) {
        self.sensitivity = None;
        self.dirty = true;
        self.sync_subscription();
    }

    /// Replace the manual rotation override. An empty target clears it.
    /// While hidden the target applies immediately.
    pub fn set_manual_rotation(&mut self, target: ManualRotationTarget) {
        let goal = target.to_radians();
        let current_goal = self
            .rotation_tween
            .map(|t| t.target())
            .unwrap_or(self.manual_rotation);
        self.manual_target = (!target.is_empty()).then_some(target);
        self.dirty = true;
        if goal == current_goal {
            return;
        }
        if self.visible && target.animation_duration > 0.0 {
            self.rotation_tween = Some(Tween::new(
                self.manual_rotation,
                goal,
                target.animation_duration,
            ));
        } else {
            self.rotation_tween = None;
            self.manual_rotation = goal;
        }
    }

    /// The hosting view appeared.
    pub fn on_show(&mut self) {
        if self.visible {
            return;
        }
        self.visible = true;
        self.last_tick = None;
        self.dirty = true;
        self.sync_subscription();
        tracing::debug!("grid shown");
    }

    /// The hosting view disappeared. Releases the sensor subscription and
    /// finishes in-flight transitions at their targets.
    pub fn on_hide(&mut self) {
        if !self.visible {
            return;
        }
        self.visible = false;
        self.last_tick = None;
        self.sync_subscription();
        if let Some(tween) = self.rotation_tween.take() {
            self.manual_rotation = tween.target();
        }
        if let Some(tween) = self.spacing_tween.take() {
            self.effective_spacing = tween.target();
        }
        self.motion.camera_rotation = self.manual_rotation;
        self.motion.parallax = Vec2::ZERO;
        self.dirty = true;
        tracing::debug!("grid hidden");
    }

    pub fn apply(&mut self, action: GridAction) -> Result<(), GridError> {
        match action {
            GridAction::Configure(config) => self.set_config(config)?,
            GridAction::SetSpacing(spacing) => self.set_spacing(spacing)?,
            GridAction::SetMajorEvery(every) => self.set_major_every(every)?,
            GridAction::SetVelocity(v) => self.set_velocity(v),
            GridAction::SetPhase(phase) => self.set_phase_offset(phase),
            GridAction::EnableSensor(sensitivity) => self.enable_sensor(sensitivity),
            GridAction::DisableSensor => self.disable_sensor(),
            GridAction::SetManualRotation(target) => self.set_manual_rotation(target),
            GridAction::Show => self.on_show(),
            GridAction::Hide => self.on_hide(),
            GridAction::Noop => {}
        }
        Ok(())
    }

    /// Advance using wall-clock time. The first tick after creation or
    /// `on_show` integrates zero time; gaps longer than [`MAX_DT`] are
    /// clamped.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32().min(MAX_DT))
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.advance(dt)
    }

    /// Advance by an explicit step in seconds.
    pub fn advance(&mut self, dt: f32) -> TickOutcome {
        if !self.visible {
            self.stats.skipped_ticks += 1;
            return TickOutcome::Skipped;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let sensor_live = self.sensor_live();
        let idle = self.velocity == Vec2::ZERO
            && !sensor_live
            && self.spacing_tween.is_none()
            && self.rotation_tween.is_none()
            && !self.dirty;
        if idle {
            self.stats.skipped_ticks += 1;
            return TickOutcome::Skipped;
        }

        let _span = tracing::info_span!("grid_tick", dt).entered();

        if let Some(tween) = self.spacing_tween.as_mut() {
            self.effective_spacing = tween.advance(dt);
            if tween.is_finished() {
                self.spacing_tween = None;
            }
        }

        let rebuilt = if self.extent_changed
            || !self
                .geometry
                .matches(self.effective_spacing, self.config.major_every())
        {
            match self.rebuild() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("geometry rebuild failed, keeping previous: {e}");
                    false
                }
            }
        } else {
            false
        };

        self.stats.material_updates += 1;

        self.drift += self.velocity * dt;
        self.compose_offset();

        if sensor_live {
            // A contended or empty cell keeps the last good sample.
            if let Some(sample) = self.hub.as_ref().and_then(SensorHub::latest_sample) {
                self.last_sample = Some(sample);
            }
        }
        if let (Some(sample), Some(sensitivity)) = (self.last_sample, self.sensitivity) {
            self.sensor_rotation = sensor_rotation(sample, sensitivity);
            self.sensor_pan = sensor_parallax(sample, sensitivity);
        }

        if let Some(tween) = self.rotation_tween.as_mut() {
            self.manual_rotation = tween.advance(dt);
            if tween.is_finished() {
                self.rotation_tween = None;
            }
        }

        self.motion.camera_rotation = self.sensor_rotation + self.manual_rotation;
        self.motion.parallax = self.sensor_pan;
        self.stats.transform_updates += 1;
        self.stats.ticks += 1;
        self.dirty = false;

        TickOutcome::Updated { rebuilt }
    }

    fn sensor_live(&self) -> bool {
        self.subscription.is_some() && self.hub.as_ref().is_some_and(SensorHub::is_active)
    }

    fn wants_sensor(&self) -> bool {
        self.visible && self.sensitivity.is_some() && self.velocity == Vec2::ZERO && self.hub.is_some()
    }

    fn sync_subscription(&mut self) {
        let wants = self.wants_sensor();
        if wants && self.subscription.is_none() {
            if let Some(hub) = &self.hub {
                self.subscription = Some(hub.subscribe());
                tracing::debug!("grid subscribed to sensor");
            }
        } else if !wants && self.subscription.take().is_some() {
            tracing::debug!("grid released sensor");
        }
        if self.subscription.is_none() || self.sensitivity.is_none() {
            self.last_sample = None;
            self.sensor_rotation = Vec3::ZERO;
            self.sensor_pan = Vec2::ZERO;
        }
    }

    fn compose_offset(&mut self) {
        let period = self.major_period();
        self.drift = wrap_offset(self.drift, period);
        self.motion.position_offset = wrap_offset(self.drift + self.phase_offset, period);
    }

    fn rebuild(&mut self) -> Result<(), GridError> {
        let config = GridConfig {
            spacing: self.effective_spacing,
            ..self.config
        };
        self.geometry = GridGeometry::build(&config, self.half_extent)?;
        self.generation += 1;
        self.extent_changed = false;
        self.stats.rebuilds += 1;
        self.compose_offset();
        tracing::debug!(
            generation = self.generation,
            spacing = self.effective_spacing,
            lines = self.geometry.line_count(),
            "grid geometry rebuilt"
        );
        Ok(())
    }

    /// Committed configuration (the target, not the animated value).
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Spacing currently in effect, mid-transition if one is running.
    pub fn effective_spacing(&self) -> f32 {
        self.effective_spacing
    }

    /// Length of one repeat of the major pattern at the effective spacing.
    pub fn major_period(&self) -> f32 {
        self.effective_spacing * self.config.major_every() as f32
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Incremented on every rebuild. Renderers compare it to decide when to
    /// re-upload line data.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn phase_offset(&self) -> Vec2 {
        self.phase_offset
    }

    /// Manual rotation contribution in radians, mid-transition if animating.
    pub fn manual_rotation(&self) -> Vec3 {
        self.manual_rotation
    }

    pub fn manual_target(&self) -> Option<&ManualRotationTarget> {
        self.manual_target.as_ref()
    }

    pub fn sensitivity(&self) -> Option<SensorSensitivity> {
        self.sensitivity
    }

    pub fn materials(&self) -> GridMaterials {
        GridMaterials {
            minor: self.config.minor_style(),
            major: self.config.major_style(),
        }
    }

    pub fn transform(&self) -> GridTransform {
        GridTransform::from_motion(&self.motion)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_animating(&self) -> bool {
        self.spacing_tween.is_some() || self.rotation_tween.is_some()
    }

    /// True while a subscription is held and the sensor is delivering.
    pub fn sensor_active(&self) -> bool {
        self.sensor_live()
    }

    pub fn has_sensor_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use gridscape_common::Rgba;
    use gridscape_input::{ManualSensor, ManualSensorControl, UnavailableSensor};

    fn engine() -> GridEngine {
        GridEngine::new(GridConfig::default(), EngineOptions::default()).unwrap()
    }

    fn sensor_engine() -> (GridEngine, SensorHub, ManualSensorControl) {
        let (source, control) = ManualSensor::pair();
        let hub = SensorHub::new(source);
        let engine = engine().with_sensor_hub(hub.clone());
        (engine, hub, control)
    }

    #[test]
    fn static_grid_builds_once() {
        let mut e = engine();
        for _ in 0..100 {
            e.advance(1.0 / 60.0);
        }
        assert_eq!(e.stats().rebuilds, 1);
        assert_eq!(e.stats().ticks, 1);
        assert_eq!(e.stats().skipped_ticks, 99);
    }

    #[test]
    fn velocity_wrap_matches_raw_modulo() {
        let mut e = engine();
        e.set_velocity(Vec2::new(20.0, -10.0));
        let period = e.major_period();
        assert_eq!(period, 64.0);
        for k in 1..=50 {
            e.advance(1.0);
            let raw = Vec2::new(20.0 * k as f32, -10.0 * k as f32);
            let expected = Vec2::new(raw.x.rem_euclid(period), raw.y.rem_euclid(period));
            assert_eq!(e.motion().position_offset, expected, "step {k}");
        }
    }

    #[test]
    fn offset_always_inside_period() {
        let mut e = engine();
        e.set_velocity(Vec2::new(-37.3, 91.7));
        for _ in 0..500 {
            e.advance(0.016);
            let o = e.motion().position_offset;
            assert!((0.0..64.0).contains(&o.x) && (0.0..64.0).contains(&o.y));
        }
    }

    #[test]
    fn immediate_spacing_change_is_visible_next_query() {
        let mut e = engine();
        let before = e.generation();
        e.set_config(GridConfig {
            spacing: 32.0,
            ..GridConfig::default()
        })
        .unwrap();
        assert_eq!(e.geometry().spacing(), 32.0);
        assert_eq!(e.generation(), before + 1);
        assert_eq!(e.stats().rebuilds, 2);
    }

    #[test]
    fn animated_spacing_eases_to_target() {
        let options = EngineOptions {
            animate_spacing_changes: true,
            transition_duration: 0.6,
            ..EngineOptions::default()
        };
        let mut e = GridEngine::new(GridConfig::default(), options).unwrap();
        e.set_spacing(32.0).unwrap();
        assert_eq!(e.geometry().spacing(), 16.0);
        e.advance(0.3);
        assert!(e.effective_spacing() > 16.0 && e.effective_spacing() < 32.0);
        assert_eq!(e.geometry().spacing(), e.effective_spacing());
        e.advance(0.3);
        e.advance(0.1);
        assert_eq!(e.effective_spacing(), 32.0);
        assert!(!e.is_animating());
        assert_eq!(e.geometry().spacing(), 32.0);
    }

    #[test]
    fn major_change_keeps_spacing_transition() {
        let options = EngineOptions {
            animate_spacing_changes: true,
            transition_duration: 0.6,
            ..EngineOptions::default()
        };
        let mut e = GridEngine::new(GridConfig::default(), options).unwrap();
        e.set_spacing(32.0).unwrap();
        e.advance(0.1);
        let mid = e.effective_spacing();
        assert!(mid > 16.0 && mid < 32.0);

        e.set_major_every(2).unwrap();
        assert!(e.is_animating());
        assert_eq!(e.effective_spacing(), mid);
        assert_eq!(e.geometry().spacing(), mid);
        assert_eq!(e.geometry().major_every(), 2);
        assert_eq!(e.major_period(), mid * 2.0);

        e.advance(0.1);
        assert!(e.effective_spacing() > mid && e.effective_spacing() < 32.0);
        for _ in 0..10 {
            e.advance(0.1);
        }
        assert_eq!(e.effective_spacing(), 32.0);
        assert_eq!(e.geometry().spacing(), 32.0);
    }

    #[test]
    fn zero_duration_spacing_change_is_immediate() {
        let options = EngineOptions {
            animate_spacing_changes: true,
            transition_duration: 0.0,
            ..EngineOptions::default()
        };
        let mut e = GridEngine::new(GridConfig::default(), options).unwrap();
        e.set_spacing(32.0).unwrap();
        assert!(!e.is_animating());
        assert_eq!(e.effective_spacing(), 32.0);
        assert_eq!(e.geometry().spacing(), 32.0);
    }

    #[test]
    fn hidden_changes_apply_immediately() {
        let options = EngineOptions {
            animate_spacing_changes: true,
            transition_duration: 0.6,
            ..EngineOptions::default()
        };
        let mut e = GridEngine::new(GridConfig::default(), options).unwrap();
        e.on_hide();
        e.set_manual_rotation(ManualRotationTarget::pitch(90.0, 0.6));
        e.set_spacing(32.0).unwrap();
        assert!(!e.is_animating());
        assert_eq!(e.manual_rotation(), Vec3::new(90f32.to_radians(), 0.0, 0.0));
        assert_eq!(e.geometry().spacing(), 32.0);
    }

    #[test]
    fn phase_offset_adds_to_drift_and_wraps() {
        let mut e = engine();
        e.set_phase_offset(Vec2::new(70.0, -5.0));
        assert_eq!(e.motion().position_offset, Vec2::new(6.0, 59.0));
        assert_eq!(e.transform().translation, Vec2::new(6.0, 59.0));

        e.set_velocity(Vec2::new(20.0, 0.0));
        e.advance(1.0);
        assert_eq!(e.motion().position_offset, Vec2::new(26.0, 59.0));
        e.advance(2.0);
        assert_eq!(e.motion().position_offset, Vec2::new(2.0, 59.0));

        e.set_velocity(Vec2::ZERO);
        e.apply(GridAction::SetPhase(Vec2::ZERO)).unwrap();
        assert_eq!(e.phase_offset(), Vec2::ZERO);
        assert_eq!(e.motion().position_offset, Vec2::new(60.0, 0.0));
    }

    #[test]
    fn non_finite_phase_counts_as_zero() {
        let mut e = engine();
        e.set_phase_offset(Vec2::new(f32::NAN, 3.0));
        assert_eq!(e.phase_offset(), Vec2::ZERO);
        assert_eq!(e.motion().position_offset, Vec2::ZERO);
    }

    #[test]
    fn material_change_does_not_rebuild() {
        let mut e = engine();
        e.set_config(GridConfig {
            minor_color: Rgba::WHITE,
            major_line_width: 2.0,
            ..GridConfig::default()
        })
        .unwrap();
        assert_eq!(e.advance(0.016), TickOutcome::Updated { rebuilt: false });
        assert_eq!(e.stats().rebuilds, 1);
        assert_eq!(e.materials().minor.color, Rgba::WHITE);
        assert_eq!(e.materials().major.width, 2.0);
    }

    #[test]
    fn invalid_config_keeps_previous() {
        let mut e = engine();
        let err = e.set_spacing(0.0).unwrap_err();
        assert!(matches!(err, GridError::InvalidConfig(_)));
        assert_eq!(e.config().spacing, 16.0);
        assert!(GridEngine::new(
            GridConfig {
                spacing: f32::NAN,
                ..GridConfig::default()
            },
            EngineOptions::default()
        )
        .is_err());
    }

    #[test]
    fn velocity_suppresses_sensor() {
        let (mut e, hub, control) = sensor_engine();
        e.enable_sensor(SensorSensitivity::default());
        assert!(e.has_sensor_subscription());
        assert_eq!(hub.ref_count(), 1);

        e.set_velocity(Vec2::new(20.0, -10.0));
        assert!(!e.has_sensor_subscription());
        assert_eq!(hub.ref_count(), 0);
        assert!(!control.push(SensorSample::new(1.0, 1.0, 0.0)));
        e.advance(0.1);
        assert_eq!(e.motion().camera_rotation, Vec3::ZERO);

        e.set_velocity(Vec2::ZERO);
        assert!(e.has_sensor_subscription());
        assert_eq!(hub.ref_count(), 1);
    }

    #[test]
    fn sensor_sample_drives_rotation() {
        let (mut e, _hub, control) = sensor_engine();
        e.enable_sensor(SensorSensitivity::default());
        control.push(SensorSample::new(1.0, -1.0, 0.0));
        e.advance(0.016);
        let r = e.motion().camera_rotation;
        assert!((r.x - 10f32.to_radians()).abs() < 1e-6);
        assert!((r.y + 35f32.to_radians()).abs() < 1e-6);
        assert!(e.sensor_active());
    }

    #[test]
    fn manual_rotation_adds_to_sensor() {
        let (mut e, _hub, control) = sensor_engine();
        e.enable_sensor(SensorSensitivity::default());
        e.set_manual_rotation(ManualRotationTarget::pitch(20.0, 0.0));
        control.push(SensorSample::new(1.0, 0.0, 0.0));
        e.advance(0.016);
        assert!((e.motion().camera_rotation.x - 30f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn manual_rotation_animates() {
        let mut e = engine();
        e.set_manual_rotation(ManualRotationTarget::pitch(100.0, 0.6));
        assert!(e.is_animating());
        e.advance(0.3);
        let mid = e.motion().camera_rotation.x;
        assert!(mid > 0.0 && mid < 100f32.to_radians());
        e.advance(0.4);
        assert!((e.motion().camera_rotation.x - 100f32.to_radians()).abs() < 1e-6);
        assert_eq!(e.advance(0.016), TickOutcome::Skipped);
    }

    #[test]
    fn hide_releases_sensor_and_snaps_transitions() {
        let (mut e, hub, _control) = sensor_engine();
        e.enable_sensor(SensorSensitivity::default());
        e.set_manual_rotation(ManualRotationTarget::pitch(100.0, 0.6));
        e.advance(0.1);
        e.on_hide();
        assert_eq!(hub.ref_count(), 0);
        assert!(!hub.is_active());
        assert!(!e.is_animating());
        assert_eq!(e.manual_rotation(), Vec3::new(100f32.to_radians(), 0.0, 0.0));
        assert_eq!(e.advance(0.1), TickOutcome::Skipped);

        e.on_show();
        assert_eq!(hub.ref_count(), 1);
    }

    #[test]
    fn shared_hub_counts_every_engine() {
        let (source, _control) = ManualSensor::pair();
        let hub = SensorHub::new(source);
        let mut engines: Vec<GridEngine> = (0..3)
            .map(|_| {
                let mut e = engine().with_sensor_hub(hub.clone());
                e.enable_sensor(SensorSensitivity::default());
                e
            })
            .collect();
        assert_eq!(hub.ref_count(), 3);
        engines[0].on_hide();
        engines[1].disable_sensor();
        assert_eq!(hub.ref_count(), 1);
        assert!(hub.is_active());
        engines.clear();
        assert_eq!(hub.ref_count(), 0);
        assert!(!hub.is_active());
    }

    #[test]
    fn unavailable_sensor_degrades_to_static() {
        let hub = SensorHub::new(UnavailableSensor);
        let mut e = engine().with_sensor_hub(hub);
        e.enable_sensor(SensorSensitivity::default());
        assert!(e.has_sensor_subscription());
        assert!(!e.sensor_active());
        e.advance(0.016);
        assert_eq!(e.advance(0.016), TickOutcome::Skipped);
        assert_eq!(e.motion().camera_rotation, Vec3::ZERO);
    }

    #[test]
    fn major_every_change_rewraps_offset() {
        let mut e = engine();
        e.set_velocity(Vec2::new(50.0, 0.0));
        e.advance(1.0);
        assert_eq!(e.motion().position_offset.x, 50.0);
        e.set_major_every(2).unwrap();
        assert_eq!(e.major_period(), 32.0);
        assert_eq!(e.motion().position_offset.x, 18.0);
    }

    #[test]
    fn viewport_resize_rebuilds_on_next_tick() {
        let mut e = engine();
        e.advance(0.0);
        e.set_viewport(Vec2::new(2000.0, 2000.0));
        assert_eq!(e.advance(0.016), TickOutcome::Updated { rebuilt: true });
        assert!(e.geometry().half_extent() >= GridGeometry::half_extent_for(Vec2::splat(2000.0)));
    }

    #[test]
    fn tick_clamps_long_gaps() {
        let mut e = engine();
        e.set_velocity(Vec2::new(10.0, 0.0));
        let start = Instant::now();
        e.tick(start);
        assert_eq!(e.motion().position_offset.x, 0.0);
        e.tick(start + Duration::from_secs(5));
        assert!((e.motion().position_offset.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn actions_route_to_engine() {
        let mut e = engine();
        e.apply(GridAction::SetSpacing(10.0)).unwrap();
        e.apply(GridAction::SetMajorEvery(1)).unwrap();
        assert_eq!(e.geometry().spacing(), 10.0);
        assert!(e.geometry().minor().is_empty());
        assert!(e.apply(GridAction::SetSpacing(-1.0)).is_err());
        e.apply(GridAction::Hide).unwrap();
        assert!(!e.is_visible());
        e.apply(GridAction::Noop).unwrap();
    }

    #[test]
    fn from_settings_applies_motion() {
        let settings = GridSettings::from_yaml_str(
            "grid:\n  spacing: 10.0\nmotion:\n  velocity: [20.0, -10.0]\n  phase: [0.0, 45.0]\n  manual_rotation:\n    x: 100.0\n",
        )
        .unwrap();
        let e = GridEngine::from_settings(&settings, None).unwrap();
        assert_eq!(e.velocity(), Vec2::new(20.0, -10.0));
        assert_eq!(e.manual_rotation().x, 100f32.to_radians());
        assert_eq!(e.config().spacing, 10.0);
        assert_eq!(e.phase_offset(), Vec2::new(0.0, 45.0));
        assert_eq!(e.motion().position_offset, Vec2::new(0.0, 5.0));
    }
}
