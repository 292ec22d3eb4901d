//! Planar geometry over landmark coordinates.
//!
//! All functions are pure and operate on 2-D points in the detector's
//! normalized image space. Degenerate inputs (coincident points) yield `NaN`,
//! which callers treat as "no sample this frame".

use nalgebra::Point2;

const DEGENERATE_EPS: f64 = 1e-9;

/// Inner angle at vertex `b`, in degrees within [0, 180].
///
/// Computed as `|atan2(c.y - b.y, c.x - b.x) - atan2(a.y - b.y, a.x - b.x)|`,
/// reflected past 180°. Symmetric under swapping `a` and `c`.
pub fn angle_between(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> f64 {
    if (a - b).norm() < DEGENERATE_EPS || (c - b).norm() < DEGENERATE_EPS {
        return f64::NAN;
    }

    let raw = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = raw.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Distance between `p` and `q` expressed as a ratio of the reference
/// segment `ref_a`..`ref_b`. `NaN` when the reference segment is degenerate.
pub fn normalized_distance(
    p: Point2<f64>,
    q: Point2<f64>,
    ref_a: Point2<f64>,
    ref_b: Point2<f64>,
) -> f64 {
    let reference = (ref_a - ref_b).norm();
    if reference < DEGENERATE_EPS {
        return f64::NAN;
    }
    (p - q).norm() / reference
}

/// Tilt of the segment `p`..`q` away from the vertical axis, in degrees
/// within [0, 90]. A plumb segment scores 0, a horizontal one 90.
pub fn vertical_deviation(p: Point2<f64>, q: Point2<f64>) -> f64 {
    let d = q - p;
    if d.norm() < DEGENERATE_EPS {
        return f64::NAN;
    }
    d.x.abs().atan2(d.y.abs()).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn test_angle_straight_line() {
        let angle = angle_between(p(0.0, 0.0), p(0.5, 0.0), p(1.0, 0.0));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_right_angle() {
        let angle = angle_between(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_symmetric_in_endpoints() {
        let a = p(0.3, 0.8);
        let b = p(0.5, 0.5);
        let c = p(0.9, 0.6);
        assert!((angle_between(a, b, c) - angle_between(c, b, a)).abs() < 1e-12);
    }

    #[test]
    fn test_angle_reflected_past_180() {
        // Reflex configuration must fold back into [0, 180]
        let angle = angle_between(p(1.0, 0.0), p(0.0, 0.0), p(0.7, -0.7));
        assert!((0.0..=180.0).contains(&angle));
        assert!((angle - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_degenerate_is_nan() {
        let b = p(0.5, 0.5);
        assert!(angle_between(b, b, p(1.0, 1.0)).is_nan());
        assert!(angle_between(p(1.0, 1.0), b, b).is_nan());
    }

    #[test]
    fn test_normalized_distance() {
        let ratio = normalized_distance(p(0.0, 0.0), p(0.0, 2.0), p(0.0, 0.0), p(4.0, 0.0));
        assert!((ratio - 0.5).abs() < 1e-12);

        let degenerate = normalized_distance(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 2.0), p(2.0, 2.0));
        assert!(degenerate.is_nan());
    }

    #[test]
    fn test_vertical_deviation_bounds() {
        assert!(vertical_deviation(p(0.5, 0.0), p(0.5, 1.0)).abs() < 1e-9);
        assert!((vertical_deviation(p(0.0, 0.5), p(1.0, 0.5)) - 90.0).abs() < 1e-9);

        let tilted = vertical_deviation(p(0.0, 0.0), p(1.0, 1.0));
        assert!((tilted - 45.0).abs() < 1e-9);

        assert!(vertical_deviation(p(0.2, 0.2), p(0.2, 0.2)).is_nan());
    }
}
