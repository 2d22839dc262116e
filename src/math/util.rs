use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// The index after `i` on a ring of `n` elements.
#[inline(always)]
pub fn ring_next(i: usize, n: usize) -> usize {
    if i + 1 >= n {
        0
    } else {
        i + 1
    }
}

/// The index before `i` on a ring of `n` elements.
#[inline(always)]
pub fn ring_prev(i: usize, n: usize) -> usize {
    if i == 0 {
        n - 1
    } else {
        i - 1
    }
}

/// Squared euclidean distance between two points.
#[inline(always)]
pub fn dist2(a: Point2d, b: Point2d) -> f64 {
    (a - b).magnitude2()
}

/// Computes the average of a set of points.
///
/// Returns the origin for an empty set.
pub fn centroid(points: &[Point2d]) -> Point2d {
    if points.is_empty() {
        return Point2d::origin();
    }
    let sum = points
        .iter()
        .fold(Vector2d::zero(), |acc, p| acc + p.to_vec());
    Point2d::from_vec(sum / points.len() as f64)
}
