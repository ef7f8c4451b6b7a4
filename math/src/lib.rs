mod angle;

pub use angle::*;
use glam::DVec2;

/// Smallest distance two map points can be apart and still be treated as
/// distinct. One unit of the 16.16 fixed-point map format.
pub const EQUAL_EPSILON: f64 = 1.0 / 65536.0;

/// Angle from `point2` to `point1` as a binary angle
#[inline]
pub fn point_to_angle_2(point1: DVec2, point2: DVec2) -> Angle {
    Angle::from_vector(point1 - point2)
}

/// Reflect `point` across the line through `v1` and `v2`.
///
/// The parametric projection form; callers handle the axis-aligned
/// shortcuts themselves where numerical drift compensation differs.
#[inline]
pub fn reflect_across_line(point: DVec2, v1: DVec2, v2: DVec2) -> DVec2 {
    let d = v2 - v1;
    let r = (point - v1).dot(d) / d.dot(d);
    (v1 + d * r) * 2.0 - point
}
