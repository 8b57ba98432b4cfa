use std::f32::consts::FRAC_PI_2;

/// 2D point or direction in surface coordinates (x grows right, y grows down).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }
}

/// Angle such that an entity at `origin` facing the result looks toward
/// `target`, with zero pointing straight up.
///
/// This is deliberately not the plain `atan2` convention; `look_at` and the
/// rotational operations agree with it, so it must not be "corrected".
pub fn angle_from_points(origin: Vec2, target: Vec2) -> f32 {
    let dx = target.x - origin.x;
    let dy = target.y - origin.y;
    if dy >= 0.0 {
        FRAC_PI_2 + (-dy).atan2(dx)
    } else {
        -(FRAC_PI_2 + dy.atan2(dx))
    }
}

/// Corners of the `width` x `height` rectangle centered at `center` and
/// rotated by `angle`, in consistent counter-clockwise order.
///
/// The fixed ordering matters: the SAT test walks consecutive edges.
pub fn oriented_rect_corners(center: Vec2, angle: f32, width: f32, height: f32) -> [Vec2; 4] {
    let half_w = width * 0.5;
    let half_h = height * 0.5;
    let local = [
        Vec2::new(-half_w, -half_h),
        Vec2::new(half_w, -half_h),
        Vec2::new(half_w, half_h),
        Vec2::new(-half_w, half_h),
    ];
    let (sin, cos) = angle.sin_cos();
    local.map(|corner| Vec2 {
        x: center.x + corner.x * cos - corner.y * sin,
        y: center.y + corner.x * sin + corner.y * cos,
    })
}

/// Separating Axis Theorem test for convex polygons.
///
/// Projects both vertex sets onto every edge normal of both polygons and
/// reports intersection unless some axis separates the projection intervals.
/// Touching intervals count as intersecting (strict comparison). Only valid
/// for convex input. An empty polygon never intersects anything; a single
/// point is a valid degenerate polygon and participates only through the
/// other polygon's axes, which makes the same routine usable for hit-tests.
pub fn convex_polygons_intersect(a: &[Vec2], b: &[Vec2]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    !(separated_on_axis_of(a, a, b) || separated_on_axis_of(b, a, b))
}

/// True when `point` lies inside the oriented rectangle, edges included.
pub fn point_in_oriented_rect(
    point: Vec2,
    center: Vec2,
    angle: f32,
    width: f32,
    height: f32,
) -> bool {
    let corners = oriented_rect_corners(center, angle, width, height);
    convex_polygons_intersect(&corners, &[point])
}

fn separated_on_axis_of(edges_of: &[Vec2], a: &[Vec2], b: &[Vec2]) -> bool {
    if edges_of.len() < 2 {
        return false;
    }
    for i in 0..edges_of.len() {
        let j = (i + 1) % edges_of.len();
        let edge = Vec2 {
            x: edges_of[j].x - edges_of[i].x,
            y: edges_of[j].y - edges_of[i].y,
        };
        let axis = Vec2 {
            x: -edge.y,
            y: edge.x,
        };
        // Zero-length edges (degenerate polygons) contribute no axis.
        if axis.dot(axis) <= f32::EPSILON {
            continue;
        }
        let (min_a, max_a) = project_onto(a, axis);
        let (min_b, max_b) = project_onto(b, axis);
        if max_a < min_b || max_b < min_a {
            return true;
        }
    }
    false
}

fn project_onto(polygon: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for vertex in polygon {
        let projected = vertex.dot(axis);
        min = min.min(projected);
        max = max.max(projected);
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use super::*;

    const TOLERANCE: f32 = 0.0001;

    fn rect(center_x: f32, center_y: f32, angle: f32, width: f32, height: f32) -> [Vec2; 4] {
        oriented_rect_corners(Vec2::new(center_x, center_y), angle, width, height)
    }

    #[test]
    fn angle_to_target_straight_up_is_zero() {
        let angle = angle_from_points(Vec2::new(0.0, 0.0), Vec2::new(0.0, -10.0));
        assert!(angle.abs() < TOLERANCE);
    }

    #[test]
    fn angle_to_target_straight_right_is_quarter_turn() {
        let angle = angle_from_points(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        assert!((angle - FRAC_PI_2).abs() < TOLERANCE);
    }

    #[test]
    fn angle_is_translation_invariant() {
        let at_origin = angle_from_points(Vec2::new(0.0, 0.0), Vec2::new(3.0, -4.0));
        let shifted = angle_from_points(Vec2::new(100.0, 50.0), Vec2::new(103.0, 46.0));
        assert!((at_origin - shifted).abs() < TOLERANCE);
    }

    #[test]
    fn unrotated_corners_are_the_axis_aligned_rectangle() {
        let corners = rect(10.0, 20.0, 0.0, 4.0, 6.0);
        assert_eq!(corners[0], Vec2::new(8.0, 17.0));
        assert_eq!(corners[1], Vec2::new(12.0, 17.0));
        assert_eq!(corners[2], Vec2::new(12.0, 23.0));
        assert_eq!(corners[3], Vec2::new(8.0, 23.0));
    }

    #[test]
    fn half_turn_swaps_opposite_corners() {
        let corners = rect(0.0, 0.0, PI, 4.0, 6.0);
        assert!((corners[0].x - 2.0).abs() < TOLERANCE);
        assert!((corners[0].y - 3.0).abs() < TOLERANCE);
        assert!((corners[2].x + 2.0).abs() < TOLERANCE);
        assert!((corners[2].y + 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn quarter_turn_swaps_width_and_height_extents() {
        let corners = rect(0.0, 0.0, FRAC_PI_2, 10.0, 2.0);
        let max_x = corners.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max);
        let max_y = corners.iter().map(|c| c.y).fold(f32::NEG_INFINITY, f32::max);
        assert!((max_x - 1.0).abs() < TOLERANCE);
        assert!((max_y - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn distant_rectangles_do_not_intersect() {
        let a = rect(0.0, 0.0, 0.0, 30.0, 70.0);
        let b = rect(200.0, 0.0, 0.0, 30.0, 70.0);
        assert!(!convex_polygons_intersect(&a, &b));
    }

    #[test]
    fn overlapping_rectangles_intersect() {
        let a = rect(0.0, 0.0, 0.0, 30.0, 70.0);
        let b = rect(10.0, 0.0, 0.0, 30.0, 70.0);
        assert!(convex_polygons_intersect(&a, &b));
    }

    #[test]
    fn intersection_is_symmetric() {
        let a = rect(0.0, 0.0, 0.3, 20.0, 10.0);
        let b = rect(12.0, 4.0, 1.1, 16.0, 16.0);
        assert_eq!(
            convex_polygons_intersect(&a, &b),
            convex_polygons_intersect(&b, &a)
        );
    }

    #[test]
    fn touching_edges_intersect() {
        // Exactly abutting along x: the projection intervals share an
        // endpoint, which the strict comparison treats as overlapping.
        let a = rect(0.0, 0.0, 0.0, 10.0, 10.0);
        let b = rect(10.0, 0.0, 0.0, 10.0, 10.0);
        assert!(convex_polygons_intersect(&a, &b));
    }

    #[test]
    fn rotated_rectangle_clears_gap_its_aabb_would_not() {
        // A thin bar rotated 45 degrees misses a box that overlaps the
        // bar's axis-aligned bounds, so only the diagonal axis separates.
        let bar = rect(0.0, 0.0, std::f32::consts::FRAC_PI_4, 30.0, 1.0);
        let clear = rect(6.0, -6.0, 0.0, 4.0, 4.0);
        let near = rect(1.5, 0.0, 0.0, 4.0, 4.0);
        assert!(!convex_polygons_intersect(&bar, &clear));
        assert!(convex_polygons_intersect(&bar, &near));
    }

    #[test]
    fn empty_polygon_never_intersects() {
        let a = rect(0.0, 0.0, 0.0, 10.0, 10.0);
        assert!(!convex_polygons_intersect(&a, &[]));
        assert!(!convex_polygons_intersect(&[], &a));
    }

    #[test]
    fn point_inside_rotated_rectangle_is_hit() {
        assert!(point_in_oriented_rect(
            Vec2::new(0.5, 0.5),
            Vec2::new(0.0, 0.0),
            0.7,
            4.0,
            4.0,
        ));
    }

    #[test]
    fn point_outside_rotated_rectangle_is_missed() {
        // The bar lies along the y = x diagonal; a point mirrored across it
        // sits inside the axis-aligned bounds but well off the bar.
        assert!(!point_in_oriented_rect(
            Vec2::new(2.6, -2.6),
            Vec2::new(0.0, 0.0),
            std::f32::consts::FRAC_PI_4,
            8.0,
            1.0,
        ));
    }

    #[test]
    fn zero_area_rectangle_collapses_to_its_center() {
        let degenerate = rect(5.0, 5.0, 0.0, 0.0, 0.0);
        assert!(degenerate.iter().all(|c| *c == Vec2::new(5.0, 5.0)));
    }
}
