//! 2D geometry for wall-distance queries.
//!
//! Everything operates on the 2D projection of moves within one layer;
//! there is no Z anywhere in the distance model.

/// A point in the layer plane (mm).
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in the layer plane (mm).
pub type Vec2 = nalgebra::Vector2<f64>;

/// A finite line segment between two points.
///
/// Used both for collected wall toolpath moves and for the virtual segment
/// formed by consecutive infill move endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// First endpoint.
    pub a: Point2,
    /// Second endpoint.
    pub b: Point2,
}

impl Segment {
    /// Create a segment from two endpoints.
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    /// Midpoint of the segment.
    pub fn midpoint(&self) -> Point2 {
        nalgebra::center(&self.a, &self.b)
    }

    /// Segment length.
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// Minimum distance from `point` to this finite segment.
    ///
    /// The projection parameter is clamped to `[0, 1]` so the distance is
    /// measured to the nearest point on the segment, not the infinite line.
    /// A degenerate zero-length segment yields 0.
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        let d = self.b - self.a;
        let norm = d.norm_squared();
        if norm == 0.0 {
            return 0.0;
        }
        let u = ((point - self.a).dot(&d) / norm).clamp(0.0, 1.0);
        let projected = self.a + d * u;
        (point - projected).norm()
    }

    /// Angle between this segment's direction and `other`'s, in radians.
    ///
    /// Direction is unsigned: the result is the minimum of the angle and
    /// its 180° complement, so anti-parallel segments count as parallel.
    /// Degenerate segments are treated as perpendicular (never parallel).
    pub fn angle_to(&self, other: &Segment) -> f64 {
        let d1 = self.b - self.a;
        let d2 = other.b - other.a;
        let lengths = d1.norm() * d2.norm();
        if lengths == 0.0 {
            return std::f64::consts::FRAC_PI_2;
        }
        (d1.dot(&d2) / lengths).abs().min(1.0).acos()
    }
}

/// Distance between two points.
pub fn points_distance(a: &Point2, b: &Point2) -> f64 {
    (b - a).norm()
}

/// Find the wall segment nearest to the midpoint of `query`.
///
/// Returns the distance and the minimizing wall, or `None` when no wall
/// geometry has been collected for the layer. The scan is linear in the
/// number of walls; a single layer's perimeter never warrants an index.
pub fn nearest_wall<'a>(query: &Segment, walls: &'a [Segment]) -> Option<(f64, &'a Segment)> {
    let midpoint = query.midpoint();
    let mut best: Option<(f64, &Segment)> = None;
    for wall in walls {
        let d = wall.distance_to_point(&midpoint);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, wall));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_perpendicular() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert_relative_eq!(seg.distance_to_point(&Point2::new(5.0, 3.0)), 3.0);
    }

    #[test]
    fn test_distance_clamps_to_endpoints() {
        let seg = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        // Beyond the far endpoint: distance to (10, 0), not the infinite line.
        assert_relative_eq!(
            seg.distance_to_point(&Point2::new(13.0, 4.0)),
            5.0
        );
        // Before the near endpoint.
        assert_relative_eq!(
            seg.distance_to_point(&Point2::new(-3.0, 4.0)),
            5.0
        );
    }

    #[test]
    fn test_distance_degenerate_segment() {
        let seg = Segment::new(Point2::new(2.0, 2.0), Point2::new(2.0, 2.0));
        assert_eq!(seg.distance_to_point(&Point2::new(7.0, 2.0)), 0.0);
    }

    #[test]
    fn test_distance_never_negative() {
        let seg = Segment::new(Point2::new(-1.0, -1.0), Point2::new(4.0, 3.0));
        for &(x, y) in &[(0.0, 0.0), (-5.0, 2.0), (4.0, 3.0), (100.0, -40.0)] {
            assert!(seg.distance_to_point(&Point2::new(x, y)) >= 0.0);
        }
    }

    #[test]
    fn test_nearest_wall() {
        let walls = vec![
            Segment::new(Point2::new(0.0, 5.0), Point2::new(10.0, 5.0)),
            Segment::new(Point2::new(0.0, 2.0), Point2::new(10.0, 2.0)),
        ];
        let query = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let (d, wall) = nearest_wall(&query, &walls).unwrap();
        assert_relative_eq!(d, 2.0);
        assert_eq!(wall, &walls[1]);

        assert!(nearest_wall(&query, &[]).is_none());
    }

    #[test]
    fn test_angle_between_segments() {
        let horizontal = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let reversed = Segment::new(Point2::new(10.0, 1.0), Point2::new(0.0, 1.0));
        let diagonal = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0));

        assert_relative_eq!(horizontal.angle_to(&reversed), 0.0);
        assert_relative_eq!(
            horizontal.angle_to(&diagonal),
            std::f64::consts::FRAC_PI_4,
            epsilon = 1e-12
        );
    }
}
