use super::{Point2d, Vector2d};
use crate::util::Interval;

/// A parametric curve in 2D space.
pub trait ParametricCurve2d {
    /// Samples the parametric curve.
    fn sample(&self, t: f64) -> Point2d;

    /// Returns the minimum and maximum t-values that define the bounds of the curve.
    fn bounds(&self) -> Interval<f64>;

    /// Samples the derivative of the parametric curve.
    ///
    /// The default implementation approximates the derivative by sampling
    /// two very nearby points along the curve.
    fn sample_dt(&self, t: f64) -> Vector2d {
        let delta = self.bounds().length() * 0.0001;
        let p1 = self.sample(t);
        let p2 = self.sample(t + delta);
        (p2 - p1) / delta
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    struct Line {
        from: Point2d,
        to: Point2d,
    }

    impl ParametricCurve2d for Line {
        fn sample(&self, t: f64) -> Point2d {
            self.from + (self.to - self.from) * t
        }

        fn bounds(&self) -> Interval<f64> {
            Interval::new(0.0, 2.0)
        }
    }

    #[test]
    fn default_derivative_is_finite_difference() {
        let line = Line {
            from: Point2d::new(10.0, 20.0),
            to: Point2d::new(40.0, -20.0),
        };
        let dt = line.sample_dt(0.5);
        assert_approx_eq!(dt.x, 30.0, 1e-6);
        assert_approx_eq!(dt.y, -40.0, 1e-6);
    }
}
