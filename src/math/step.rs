//! Forward difference walking of cubic spans.

use super::{Point2d, Vector2d};

/// The position increment of a cubic span for a fixed parameter step.
///
/// For a step `dt`, `delta(t) = P(t + dt) - P(t)`, which is a quadratic in `t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepFn {
    coeffs: [Vector2d; 3],
}

impl StepFn {
    /// Creates the step function `k2·t² + k1·t + k0` from `[k2, k1, k0]`.
    pub const fn new(coeffs: [Vector2d; 3]) -> Self {
        Self { coeffs }
    }

    /// The position increment when moving from `t` to `t + dt`.
    #[inline(always)]
    pub fn delta(&self, t: f64) -> Vector2d {
        let [k2, k1, k0] = self.coeffs;
        k2 * (t * t) + k1 * t + k0
    }

    /// Walks a span from `start`, advancing `t` by `dt` until it reaches 1.
    pub fn walk(&self, start: Point2d, dt: f64) -> StepWalk {
        StepWalk {
            step: *self,
            dt,
            t: 0.0,
            pos: start,
        }
    }
}

/// Iterator over the forward Euler steps of a single span.
///
/// Yields the parameter, the position before the step and the step itself.
/// The parameter is accumulated by repeated addition so every walk of a span
/// with the same `dt` produces the same number of steps.
#[derive(Clone, Debug)]
pub struct StepWalk {
    step: StepFn,
    dt: f64,
    t: f64,
    pos: Point2d,
}

impl Iterator for StepWalk {
    type Item = (f64, Point2d, Vector2d);

    fn next(&mut self) -> Option<Self::Item> {
        if self.t < 1.0 {
            let t = self.t;
            let pos = self.pos;
            let delta = self.step.delta(t);
            self.pos = pos + delta;
            self.t += self.dt;
            Some((t, pos, delta))
        } else {
            None
        }
    }
}

/// Counts the steps taken when walking a span with a parameter step of `dt`.
///
/// Returns zero for a step that is not a positive finite number.
pub fn steps_per_span(dt: f64) -> usize {
    if !dt.is_finite() || dt <= 0.0 {
        return 0;
    }
    let mut count = 0;
    let mut t = 0.0;
    while t < 1.0 {
        t += dt;
        count += 1;
    }
    count
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::{CubicBezier2d, ParametricCurve2d};
    use assert_approx_eq::assert_approx_eq;
    use rand::{Rng, SeedableRng};

    #[test]
    fn delta_is_exact_difference() {
        let mut rng = rand::rngs::StdRng::from_seed(*b"closed continuous bezier curves!");
        for _ in 0..100 {
            let points = [(); 4].map(|_| {
                Point2d::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0))
            });
            let curve = CubicBezier2d::new(&points);
            let dt = rng.gen_range(0.001..0.5);
            let step = curve.step_fn(dt);
            let t = rng.gen_range(0.0..1.0);
            let expected = curve.sample(t + dt) - curve.sample(t);
            let delta = step.delta(t);
            assert_approx_eq!(delta.x, expected.x, 1e-6);
            assert_approx_eq!(delta.y, expected.y, 1e-6);
        }
    }

    #[test]
    fn walk_reaches_the_span_end() {
        let curve = CubicBezier2d::new(&[
            Point2d::new(0.0, 0.0),
            Point2d::new(30.0, 0.0),
            Point2d::new(60.0, 30.0),
            Point2d::new(60.0, 60.0),
        ]);
        let dt = 0.125;
        let steps = curve.step_fn(dt).walk(Point2d::new(0.0, 0.0), dt).collect::<Vec<_>>();
        assert_eq!(steps.len(), steps_per_span(dt));
        assert_eq!(steps.len(), 8);
        let (_, last, delta) = steps[steps.len() - 1];
        let end = last + delta;
        assert_approx_eq!(end.x, 60.0, 1e-9);
        assert_approx_eq!(end.y, 60.0, 1e-9);
    }

    #[test]
    fn step_count_follows_accumulated_parameter() {
        // 0.1 accumulated ten times stays just below 1.0
        assert_eq!(steps_per_span(0.1), 11);
        assert_eq!(steps_per_span(0.25), 4);
        assert_eq!(steps_per_span(2.0), 1);
    }
}
