use std::fmt::Write as _;

use glam::{Mat4, Vec2, Vec3, Vec4};
use gridscape_common::LineStyle;
use gridscape_kernel::{GridEngine, GridLine};

use crate::camera::GridCamera;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// Renderers read engine state and a camera, then produce output. They never
/// mutate the engine.
pub trait Renderer {
    type Output;

    fn render(&self, engine: &GridEngine, camera: &GridCamera) -> Self::Output;
}

/// Drawable 2D line primitives for one frame, in screen points.
#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    pub minor: Vec<[Vec2; 2]>,
    pub major: Vec<[Vec2; 2]>,
    pub minor_style: LineStyle,
    pub major_style: LineStyle,
    /// Geometry generation the frame was projected from.
    pub generation: u64,
    pub viewport: Vec2,
}

impl GridFrame {
    pub fn segment_count(&self) -> usize {
        self.minor.len() + self.major.len()
    }
}

/// Project the engine's current geometry through its transform and the
/// camera.
pub fn project_frame(engine: &GridEngine, camera: &GridCamera) -> GridFrame {
    let mvp = camera.view_projection() * engine.transform().model_matrix();
    let geometry = engine.geometry();
    let materials = engine.materials();
    let frame = GridFrame {
        minor: project_lines(geometry.minor(), &mvp, camera),
        major: project_lines(geometry.major(), &mvp, camera),
        minor_style: materials.minor,
        major_style: materials.major,
        generation: engine.generation(),
        viewport: camera.viewport,
    };
    tracing::trace!(
        minor = frame.minor.len(),
        major = frame.major.len(),
        "frame projected"
    );
    frame
}

fn project_lines(lines: &[GridLine], mvp: &Mat4, camera: &GridCamera) -> Vec<[Vec2; 2]> {
    lines
        .iter()
        .filter_map(|line| {
            let a = *mvp * line.segment.start.extend(0.0).extend(1.0);
            let b = *mvp * line.segment.end.extend(0.0).extend(1.0);
            let (a, b) = clip_near(a, b)?;
            if outside_same_side(a, b) {
                return None;
            }
            Some([to_screen(a, camera), to_screen(b, camera)])
        })
        .collect()
}

/// Clip a clip-space segment to `z >= 0`, the near plane for a 0..1 depth
/// range. Returns `None` when the whole segment is behind it.
fn clip_near(a: Vec4, b: Vec4) -> Option<(Vec4, Vec4)> {
    match (a.z >= 0.0, b.z >= 0.0) {
        (true, true) => Some((a, b)),
        (false, false) => None,
        (a_in, _) => {
            let t = a.z / (a.z - b.z);
            let hit = a.lerp(b, t);
            if a_in { Some((a, hit)) } else { Some((hit, b)) }
        }
    }
}

/// Both endpoints beyond the same side plane.
fn outside_same_side(a: Vec4, b: Vec4) -> bool {
    (a.x < -a.w && b.x < -b.w)
        || (a.x > a.w && b.x > b.w)
        || (a.y < -a.w && b.y < -b.w)
        || (a.y > a.w && b.y > b.w)
}

fn to_screen(clip: Vec4, camera: &GridCamera) -> Vec2 {
    camera.ndc_to_screen(Vec2::new(clip.x, clip.y) / clip.w)
}

/// Produces [`GridFrame`]s for 2D hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineFrameRenderer;

impl Renderer for LineFrameRenderer {
    type Output = GridFrame;

    fn render(&self, engine: &GridEngine, camera: &GridCamera) -> GridFrame {
        project_frame(engine, camera)
    }
}

/// Human-readable summary of engine state for the CLI and logs.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn degrees(v: Vec3) -> Vec3 {
    Vec3::new(v.x.to_degrees(), v.y.to_degrees(), v.z.to_degrees())
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, engine: &GridEngine, camera: &GridCamera) -> String {
        let config = engine.config();
        let motion = engine.motion();
        let stats = engine.stats();
        let rot = degrees(motion.camera_rotation);
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Grid (generation={}, visible={}) ===",
            engine.generation(),
            engine.is_visible()
        );
        let _ = writeln!(
            out,
            "Spacing: {:.2} (target {:.2}) major every {} period {:.2}",
            engine.effective_spacing(),
            config.spacing,
            config.major_every(),
            engine.major_period()
        );
        let _ = writeln!(
            out,
            "Lines: minor={} major={} extent={:.0}",
            engine.geometry().minor().len(),
            engine.geometry().major().len(),
            engine.geometry().half_extent()
        );
        let _ = writeln!(
            out,
            "Offset: ({:.2}, {:.2}) parallax=({:.2}, {:.2}) velocity=({:.1}, {:.1})",
            motion.position_offset.x,
            motion.position_offset.y,
            motion.parallax.x,
            motion.parallax.y,
            engine.velocity().x,
            engine.velocity().y
        );
        let _ = writeln!(
            out,
            "Rotation: pitch={:.1} yaw={:.1} roll={:.1} sensor={}",
            rot.x,
            rot.y,
            rot.z,
            if engine.sensor_active() { "live" } else { "off" }
        );
        let _ = writeln!(
            out,
            "Camera: viewport=({:.0}, {:.0}) distance={:.1}",
            camera.viewport.x,
            camera.viewport.y,
            camera.distance()
        );
        let _ = writeln!(
            out,
            "Stats: ticks={} skipped={} rebuilds={}",
            stats.ticks, stats.skipped_ticks, stats.rebuilds
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridscape_common::{EngineOptions, GridConfig, ManualRotationTarget};

    fn engine() -> GridEngine {
        GridEngine::new(GridConfig::default(), EngineOptions::default()).unwrap()
    }

    #[test]
    fn debug_renderer_summarizes_state() {
        let e = engine();
        let out = DebugTextRenderer::new().render(&e, &GridCamera::default());
        assert!(out.contains("generation=1"));
        assert!(out.contains("major every 4"));
        assert!(out.contains("sensor=off"));
    }

    #[test]
    fn flat_grid_projects_to_points() {
        let e = engine();
        let camera = GridCamera::new(Vec2::new(400.0, 800.0));
        let frame = LineFrameRenderer.render(&e, &camera);
        assert!(!frame.major.is_empty());
        assert!(!frame.minor.is_empty());
        assert_eq!(frame.generation, 1);
        // The vertical major line through the origin lands on the center column.
        assert!(
            frame
                .major
                .iter()
                .any(|[a, b]| (a.x - 200.0).abs() < 1e-2 && (b.x - 200.0).abs() < 1e-2)
        );
    }

    #[test]
    fn steep_pitch_never_yields_nan() {
        let mut e = engine();
        let camera = GridCamera::default();
        for pitch in [60.0, 89.0, 90.0, 100.0, 135.0, 180.0] {
            e.set_manual_rotation(ManualRotationTarget::pitch(pitch, 0.0));
            e.advance(0.016);
            let frame = project_frame(&e, &camera);
            for [a, b] in frame.minor.iter().chain(&frame.major) {
                assert!(a.is_finite() && b.is_finite(), "pitch {pitch}");
            }
        }
    }

    #[test]
    fn segment_fully_behind_near_plane_is_dropped() {
        let a = Vec4::new(0.0, 0.0, -1.0, 0.5);
        let b = Vec4::new(1.0, 0.0, -2.0, 0.2);
        assert!(clip_near(a, b).is_none());
    }

    #[test]
    fn crossing_segment_is_cut_at_near_plane() {
        let a = Vec4::new(0.0, 0.0, -1.0, 0.5);
        let b = Vec4::new(0.0, 0.0, 1.0, 2.0);
        let (p, q) = clip_near(a, b).unwrap();
        assert_eq!(p.z, 0.0);
        assert_eq!(q, b);
    }
}
