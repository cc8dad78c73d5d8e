use glam::Vec2;
use gridscape_common::{Axis, GridConfig, GridError, LineKind, LineSegment};

/// Coverage multiplier over the viewport's larger side, so rotated or
/// panned grids never reveal an edge.
pub const OVERSIZE: f32 = 1.8;
/// Extra coverage in points beyond the oversized viewport.
pub const PADDING: f32 = 600.0;
/// Upper bound on lines per side of the origin, per axis.
pub const MAX_HALF_LINES: i32 = 2048;

/// One grid line, tagged with its world index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    /// World grid index: the line sits at `index * spacing` on its axis.
    pub index: i32,
    pub axis: Axis,
    pub segment: LineSegment,
}

/// Cached line geometry for one (spacing, major interval, extent) triple.
///
/// Lines are centered on the origin and split into disjoint minor and major
/// sets. Classification uses the world index, so the pattern is identical no
/// matter how the array is rebuilt or the grid is translated by a whole
/// major period.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    spacing: f32,
    major_every: u32,
    half_extent: f32,
    minor: Vec<GridLine>,
    major: Vec<GridLine>,
}

impl GridGeometry {
    /// Half-extent needed to cover a viewport of the given size.
    pub fn half_extent_for(viewport: Vec2) -> f32 {
        viewport.max_element().max(0.0) * 0.5 * OVERSIZE + PADDING
    }

    /// Major iff `index mod major_every == 0` under floored modulo.
    pub fn classify(index: i32, major_every: u32) -> LineKind {
        let every = major_every.max(1) as i32;
        if index.rem_euclid(every) == 0 {
            LineKind::Major
        } else {
            LineKind::Minor
        }
    }

    /// Build line geometry covering at least `half_extent` plus one major
    /// period on every side of the origin.
    pub fn build(config: &GridConfig, half_extent: f32) -> Result<Self, GridError> {
        config.validate()?;
        let spacing = config.spacing;
        let major_every = config.major_every();
        let period = config.major_period();

        let wanted = ((half_extent.max(0.0) + period) / spacing).ceil();
        let max = MAX_HALF_LINES as i64;
        let half_lines = if wanted.is_finite() {
            (wanted as i64).clamp(1, max)
        } else {
            max
        };
        // Round outward so the outermost lines sit on the major pattern.
        let every = major_every as i64;
        let rounded = (half_lines + every - 1) / every * every;
        let half_lines = if rounded <= max {
            rounded
        } else if every <= max {
            max / every * every
        } else {
            half_lines
        } as i32;
        let extent = half_lines as f32 * spacing;

        let mut minor = Vec::new();
        let mut major = Vec::new();
        for axis in [Axis::Vertical, Axis::Horizontal] {
            for index in -half_lines..=half_lines {
                let at = index as f32 * spacing;
                let segment = match axis {
                    Axis::Vertical => LineSegment::new(Vec2::new(at, -extent), Vec2::new(at, extent)),
                    Axis::Horizontal => {
                        LineSegment::new(Vec2::new(-extent, at), Vec2::new(extent, at))
                    }
                };
                let line = GridLine {
                    index,
                    axis,
                    segment,
                };
                match Self::classify(index, major_every) {
                    LineKind::Major => major.push(line),
                    LineKind::Minor => minor.push(line),
                }
            }
        }

        tracing::debug!(
            spacing,
            major_every,
            half_lines,
            minor = minor.len(),
            major = major.len(),
            "grid geometry built"
        );

        Ok(Self {
            spacing,
            major_every,
            half_extent: extent,
            minor,
            major,
        })
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn major_every(&self) -> u32 {
        self.major_every
    }

    /// Half-size of the square the lines span.
    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn lines(&self, kind: LineKind) -> &[GridLine] {
        match kind {
            LineKind::Minor => &self.minor,
            LineKind::Major => &self.major,
        }
    }

    pub fn minor(&self) -> &[GridLine] {
        &self.minor
    }

    pub fn major(&self) -> &[GridLine] {
        &self.major
    }

    pub fn line_count(&self) -> usize {
        self.minor.len() + self.major.len()
    }

    /// True when this geometry was built from the given parameters.
    pub fn matches(&self, spacing: f32, major_every: u32) -> bool {
        self.spacing == spacing && self.major_every == major_every
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(spacing: f32, major_every: i32) -> GridConfig {
        GridConfig {
            spacing,
            major_every,
            ..GridConfig::default()
        }
    }

    #[test]
    fn classification_uses_world_index() {
        assert_eq!(GridGeometry::classify(0, 4), LineKind::Major);
        assert_eq!(GridGeometry::classify(4, 4), LineKind::Major);
        assert_eq!(GridGeometry::classify(-4, 4), LineKind::Major);
        assert_eq!(GridGeometry::classify(-3, 4), LineKind::Minor);
        assert_eq!(GridGeometry::classify(7, 4), LineKind::Minor);
        assert_eq!(GridGeometry::classify(7, 1), LineKind::Major);
    }

    #[test]
    fn rebuild_is_deterministic() {
        for (spacing, every) in [(16.0, 4), (10.0, 1), (7.5, 3), (32.0, 10), (1.25, 6)] {
            let a = GridGeometry::build(&config(spacing, every), 500.0).unwrap();
            let b = GridGeometry::build(&config(spacing, every), 500.0).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn minor_and_major_are_disjoint_and_classified() {
        let geometry = GridGeometry::build(&config(16.0, 4), 300.0).unwrap();
        assert!(geometry.major().iter().all(|l| l.index.rem_euclid(4) == 0));
        assert!(geometry.minor().iter().all(|l| l.index.rem_euclid(4) != 0));
        for line in geometry.major() {
            let pos = match line.axis {
                Axis::Vertical => line.segment.start.x,
                Axis::Horizontal => line.segment.start.y,
            };
            assert_eq!(pos, line.index as f32 * 16.0);
        }
    }

    #[test]
    fn covers_requested_extent_plus_a_period() {
        let geometry = GridGeometry::build(&config(16.0, 4), 1000.0).unwrap();
        assert!(geometry.half_extent() >= 1000.0 + 64.0);
        let outermost = geometry
            .major()
            .iter()
            .filter(|l| l.axis == Axis::Vertical)
            .map(|l| l.index)
            .max()
            .unwrap();
        assert_eq!(outermost as f32 * 16.0, geometry.half_extent());
    }

    #[test]
    fn majors_every_one_has_no_minor_lines() {
        let geometry = GridGeometry::build(&config(10.0, 1), 200.0).unwrap();
        assert!(geometry.minor().is_empty());
        assert!(!geometry.major().is_empty());
    }

    #[test]
    fn non_positive_major_every_is_clamped() {
        let geometry = GridGeometry::build(&config(16.0, 0), 200.0).unwrap();
        assert_eq!(geometry.major_every(), 1);
        let negative = GridGeometry::build(&config(16.0, -5), 200.0).unwrap();
        assert_eq!(negative.major_every(), 1);
    }

    #[test]
    fn invalid_spacing_fails() {
        assert!(matches!(
            GridGeometry::build(&config(0.0, 4), 200.0),
            Err(GridError::InvalidConfig(_))
        ));
        assert!(GridGeometry::build(&config(-1.0, 4), 200.0).is_err());
    }

    #[test]
    fn tiny_spacing_is_capped() {
        let geometry = GridGeometry::build(&config(0.001, 4), 5000.0).unwrap();
        assert!(geometry.line_count() <= 2 * (2 * MAX_HALF_LINES as usize + 1));
    }

    #[test]
    fn extent_from_viewport() {
        let half = GridGeometry::half_extent_for(Vec2::new(390.0, 844.0));
        assert!((half - (422.0 * OVERSIZE + PADDING)).abs() < 1e-3);
    }
}
