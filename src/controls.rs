//! Derivation of the off-curve control points of a closed curve.

use cgmath::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::{Point2d, Vector2d};

/// The two off-curve points of the span leaving an anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPair {
    /// The control point next to the span's start anchor.
    pub b: Point2d,
    /// The control point next to the span's end anchor.
    pub c: Point2d,
}

/// Weights of the anchor differences `A[j+k] - A[j-k]` for `k = 1..=4`,
/// followed by the common divisor.
struct Coefficients {
    weights: &'static [f64],
    divisor: f64,
}

/// Closed form solutions for rings of 3 to 8 anchors.
const SMALL_RINGS: [Coefficients; 6] = [
    Coefficients { weights: &[1.0], divisor: 3.0 },
    Coefficients { weights: &[1.0], divisor: 4.0 },
    Coefficients { weights: &[3.0, -1.0], divisor: 11.0 },
    Coefficients { weights: &[4.0, -1.0], divisor: 15.0 },
    Coefficients { weights: &[11.0, -3.0, 1.0], divisor: 41.0 },
    Coefficients { weights: &[15.0, -4.0, 1.0], divisor: 56.0 },
];

/// Truncated solution for large odd rings.
const ODD_RING: Coefficients = Coefficients {
    weights: &[41.0, -11.0, 3.0, -1.0],
    divisor: 153.0,
};

/// Truncated solution for large even rings.
const EVEN_RING: Coefficients = Coefficients {
    weights: &[56.0, -15.0, 4.0, -1.0],
    divisor: 209.0,
};

fn coefficients(n: usize) -> Option<&'static Coefficients> {
    match n {
        0..=2 => None,
        3..=8 => Some(&SMALL_RINGS[n - 3]),
        _ if n % 2 == 0 => Some(&EVEN_RING),
        _ => Some(&ODD_RING),
    }
}

/// Computes the control points that make a closed ring of cubic spans through
/// `anchors` continuous in tangent and curvature.
///
/// Rings of fewer than 3 anchors degenerate: every control point coincides
/// with its anchor.
pub fn derive_controls(anchors: &[Point2d]) -> Vec<ControlPair> {
    let n = anchors.len();
    let at = |j: usize, k: usize, forward: bool| {
        let idx = if forward { (j + k) % n } else { (j + n - k % n) % n };
        anchors[idx]
    };

    let bs = match coefficients(n) {
        Some(coeffs) => (0..n)
            .map(|j| {
                let sum = coeffs
                    .weights
                    .iter()
                    .enumerate()
                    .fold(Vector2d::zero(), |acc, (k, w)| {
                        acc + (at(j, k + 1, true) - at(j, k + 1, false)) * *w
                    });
                anchors[j] + sum / coeffs.divisor
            })
            .collect::<Vec<_>>(),
        None => anchors.to_vec(),
    };

    (0..n)
        .map(|i| {
            let next = (i + 1) % n;
            ControlPair {
                b: bs[i],
                c: mirror(anchors[next], bs[next]),
            }
        })
        .collect()
}

/// Reflects `point` through `centre`.
#[inline(always)]
pub fn mirror(centre: Point2d, point: Point2d) -> Point2d {
    Point2d::from_vec(centre.to_vec() * 2.0 - point.to_vec())
}
