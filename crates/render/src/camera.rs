use glam::{Mat4, Vec2, Vec3};

/// Fixed perspective camera on +Z looking at the grid origin.
///
/// The distance is derived from the viewport height so that, with no grid
/// rotation, one world unit at z = 0 covers exactly one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCamera {
    /// Logical frame size in points.
    pub viewport: Vec2,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
}

impl Default for GridCamera {
    fn default() -> Self {
        Self::new(Vec2::new(390.0, 844.0))
    }
}

impl GridCamera {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            viewport: viewport.max(Vec2::ONE),
            fov: 60.0_f32.to_radians(),
            near: 1.0,
        }
    }

    pub fn resize(&mut self, viewport: Vec2) {
        self.viewport = viewport.max(Vec2::ONE);
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    /// Eye distance from the grid plane.
    pub fn distance(&self) -> f32 {
        self.viewport.y * 0.5 / (self.fov * 0.5).tan()
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.distance())
    }

    /// Far enough to keep an oversized, tilted grid in view.
    pub fn far(&self) -> f32 {
        self.distance() * 4.0 + self.viewport.max_element() * 4.0
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect(), self.near, self.far())
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Normalized device coordinates to screen points, y down.
    pub fn ndc_to_screen(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc.y) * 0.5 * self.viewport.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn screen(cam: &GridCamera, p: Vec3) -> Vec2 {
        let clip = cam.view_projection() * Vec4::new(p.x, p.y, p.z, 1.0);
        cam.ndc_to_screen(Vec2::new(clip.x, clip.y) / clip.w)
    }

    #[test]
    fn origin_maps_to_center() {
        let cam = GridCamera::new(Vec2::new(400.0, 800.0));
        let s = screen(&cam, Vec3::ZERO);
        assert!((s - Vec2::new(200.0, 400.0)).length() < 1e-3);
    }

    #[test]
    fn one_unit_is_one_point() {
        let cam = GridCamera::new(Vec2::new(400.0, 800.0));
        let right = screen(&cam, Vec3::new(100.0, 0.0, 0.0));
        let up = screen(&cam, Vec3::new(0.0, 100.0, 0.0));
        assert!((right.x - 300.0).abs() < 1e-2);
        assert!((up.y - 300.0).abs() < 1e-2, "y grows downward on screen");
    }

    #[test]
    fn degenerate_viewport_is_clamped() {
        let cam = GridCamera::new(Vec2::ZERO);
        assert!(cam.view_projection().is_finite());
    }
}
