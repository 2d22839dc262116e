use super::curve::ParametricCurve2d;
use super::step::StepFn;
use super::{Point2d, Vector2d};
use crate::util::Interval;
use cgmath::prelude::*;

/// A cubic bezier curve
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CubicBezier2d {
    points: [Point2d; 4],
}

impl CubicBezier2d {
    pub const fn new(points: &[Point2d; 4]) -> Self {
        Self { points: *points }
    }

    /// The start point, the two off-curve control points and the end point.
    pub fn points(&self) -> &[Point2d; 4] {
        &self.points
    }

    /// The coefficients of the power basis `a·t³ + b·t² + c·t + d`.
    fn power_basis(&self) -> [Vector2d; 4] {
        let [p0, p1, p2, p3] = self.points.map(|p| p.to_vec());
        let a = -p0 + p1 * 3.0 - p2 * 3.0 + p3;
        let b = p0 * 3.0 - p1 * 6.0 + p2 * 3.0;
        let c = (p1 - p0) * 3.0;
        [a, b, c, p0]
    }

    /// Creates the forward difference polynomial used to walk the curve
    /// with a fixed parameter step of `dt`.
    pub fn step_fn(&self, dt: f64) -> StepFn {
        let [a, b, c, _] = self.power_basis();
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        StepFn::new([a * (3.0 * dt), a * (3.0 * dt2) + b * (2.0 * dt), a * dt3 + b * dt2 + c * dt])
    }
}

impl ParametricCurve2d for CubicBezier2d {
    fn sample(&self, t: f64) -> Point2d {
        let t1 = 1.0 - t;
        Point2d::from_vec(
            t1 * t1 * t1 * self.points[0].to_vec()
                + 3.0 * t1 * t1 * t * self.points[1].to_vec()
                + 3.0 * t1 * t * t * self.points[2].to_vec()
                + t * t * t * self.points[3].to_vec(),
        )
    }

    fn bounds(&self) -> Interval<f64> {
        Interval { min: 0.0, max: 1.0 }
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let t1 = 1.0 - t;
        (-3.0 * t1 * t1) * self.points[0].to_vec()
            + (9.0 * t * t - 12.0 * t + 3.0) * self.points[1].to_vec()
            + (-9.0 * t * t + 6.0 * t) * self.points[2].to_vec()
            + (3.0 * t * t) * self.points[3].to_vec()
    }
}
