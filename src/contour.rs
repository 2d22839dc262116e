//! Sampling of a reference contour at unit arc length spacing.

use cgmath::prelude::*;

use crate::curve::ClosedCurve;
use crate::math::Point2d;

/// Walks the curve and records a point after every unit of travelled length.
///
/// The walk uses `target_count` parameter steps over the whole curve. The
/// fractional length left over after each recorded point is carried into
/// the next one, so the spacing stays close to one unit across steps.
///
/// A target that is not a positive number (e.g. from a zero length
/// reference) yields no samples.
pub fn sample_contour(curve: &ClosedCurve, target_count: f64) -> Vec<Point2d> {
    if curve.is_empty() || !target_count.is_finite() || target_count <= 0.0 {
        return vec![];
    }
    let dt = curve.len() as f64 / target_count;

    let mut points = vec![];
    let mut travelled = 0.0;
    for span in curve.spans() {
        for (_, pos, delta) in span.step_fn(dt).walk(span.points()[0], dt) {
            travelled += delta.magnitude();
            if travelled >= 1.0 {
                points.push(pos);
                travelled %= 1.0;
            }
        }
    }
    points
}

/// The number of contour samples to take from a reference curve.
pub fn contour_density(curve: &ClosedCurve, ratio_contour: f64) -> f64 {
    curve.control_net_length() * ratio_contour
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::steps_per_span;
    use assert_approx_eq::assert_approx_eq;

    fn ring(radius: f64) -> ClosedCurve {
        let anchors = (0..8)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::FRAC_PI_4;
                Point2d::new(200.0 + radius * angle.cos(), 200.0 + radius * angle.sin())
            })
            .collect();
        ClosedCurve::new(anchors)
    }

    #[test]
    fn fine_steps_give_unit_spacing() {
        let curve = ring(100.0);
        let target = 6000.0;
        let points = sample_contour(&curve, target);
        for pair in points.windows(2) {
            let gap = pair[0].distance(pair[1]);
            assert!(gap > 0.9 && gap < 1.2, "gap {gap}");
        }
        let walked = curve.walk_length(curve.len() as f64 / target);
        assert_approx_eq!(points.len() as f64, walked.floor(), 2.0);
    }

    #[test]
    fn coarse_steps_emit_every_step() {
        let curve = ring(100.0);
        let target = contour_density(&curve, 1.0 / 6.0);
        let dt = curve.len() as f64 / target;
        let points = sample_contour(&curve, target);
        assert_eq!(points.len(), curve.len() * steps_per_span(dt));
        assert_eq!(points[0], curve.anchors()[0]);
    }

    #[test]
    fn degenerate_curves_yield_nothing() {
        let point = ClosedCurve::new(vec![Point2d::new(5.0, 5.0); 4]);
        let target = contour_density(&point, 1.0 / 6.0);
        assert_eq!(target, 0.0);
        assert!(sample_contour(&point, target).is_empty());
        assert!(sample_contour(&ring(50.0), f64::NAN).is_empty());
        assert!(sample_contour(&ClosedCurve::new(vec![]), 10.0).is_empty());
    }
}
