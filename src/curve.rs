use cgmath::prelude::*;
use serde::{Deserialize, Serialize};

use crate::controls::{derive_controls, ControlPair};
use crate::math::{centroid, CubicBezier2d, ParametricCurve2d, Point2d, Vector2d};
use crate::util::Interval;

/// A closed ring of cubic spans through a sequence of anchors.
///
/// The control points are always derived from the anchors, so every
/// mutation re-derives them in full.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosedCurve {
    /// The on-curve points.
    anchors: Vec<Point2d>,
    /// The off-curve points of the span leaving each anchor.
    controls: Vec<ControlPair>,
}

impl ClosedCurve {
    /// Creates a closed curve through the given anchors.
    pub fn new(anchors: Vec<Point2d>) -> Self {
        let controls = derive_controls(&anchors);
        Self { anchors, controls }
    }

    /// The number of anchors, which is also the number of spans.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// The on-curve points.
    pub fn anchors(&self) -> &[Point2d] {
        &self.anchors
    }

    /// The off-curve points, one pair per span.
    pub fn controls(&self) -> &[ControlPair] {
        &self.controls
    }

    /// Replaces all anchors.
    pub fn set_anchors(&mut self, anchors: Vec<Point2d>) {
        self.anchors = anchors;
        self.update_controls();
    }

    /// Displaces a single anchor.
    pub fn move_anchor(&mut self, idx: usize, offset: Vector2d) {
        self.anchors[idx] += offset;
        self.update_controls();
    }

    /// Places a single anchor at `pos`.
    pub fn set_anchor(&mut self, idx: usize, pos: Point2d) {
        self.anchors[idx] = pos;
        self.update_controls();
    }

    /// Inserts an anchor before position `idx`.
    pub fn insert_anchor(&mut self, idx: usize, anchor: Point2d) {
        self.anchors.insert(idx, anchor);
        self.update_controls();
    }

    /// Removes the anchor at position `idx`.
    pub fn remove_anchor(&mut self, idx: usize) -> Point2d {
        let anchor = self.anchors.remove(idx);
        self.update_controls();
        anchor
    }

    /// Scales all anchors about their centroid and truncates the result to
    /// whole coordinates.
    pub fn rescale_about_centroid(&mut self, factor: f64) {
        let centre = centroid(&self.anchors);
        for anchor in &mut self.anchors {
            let scaled = centre + (*anchor - centre) * factor;
            *anchor = Point2d::new(scaled.x.trunc(), scaled.y.trunc());
        }
        self.update_controls();
    }

    fn update_controls(&mut self) {
        self.controls = derive_controls(&self.anchors);
    }

    /// Gets the span leaving anchor `idx`.
    ///
    /// Panics if `idx` is not an anchor index.
    pub fn span(&self, idx: usize) -> CubicBezier2d {
        let next = (idx + 1) % self.anchors.len();
        let ControlPair { b, c } = self.controls[idx];
        CubicBezier2d::new(&[self.anchors[idx], b, c, self.anchors[next]])
    }

    /// Iterates over the spans in ring order.
    pub fn spans(&self) -> impl Iterator<Item = CubicBezier2d> + '_ {
        (0..self.len()).map(|idx| self.span(idx))
    }

    /// A fast and rough upper bound of the curve length: the total length of
    /// the control polygon.
    pub fn control_net_length(&self) -> f64 {
        self.spans()
            .map(|span| {
                let [a, b, c, d] = *span.points();
                a.distance(b) + b.distance(c) + c.distance(d)
            })
            .sum()
    }

    /// Estimates the curve length by walking each span with a parameter step of `dt`.
    pub fn walk_length(&self, dt: f64) -> f64 {
        self.spans()
            .map(|span| {
                span.step_fn(dt)
                    .walk(span.points()[0], dt)
                    .map(|(_, _, delta)| delta.magnitude())
                    .sum::<f64>()
            })
            .sum()
    }
}

impl ParametricCurve2d for ClosedCurve {
    /// Samples the curve, where the integer part of `t` selects the span.
    /// A curve without anchors is the origin.
    fn sample(&self, t: f64) -> Point2d {
        match self.locate(t) {
            Some((span, t)) => self.span(span).sample(t),
            None => Point2d::origin(),
        }
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.len() as f64)
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        match self.locate(t) {
            Some((span, t)) => self.span(span).sample_dt(t),
            None => Vector2d::zero(),
        }
    }
}

impl ClosedCurve {
    /// Splits a curve parameter into a span index and the local parameter.
    fn locate(&self, t: f64) -> Option<(usize, f64)> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        let t = t.rem_euclid(n as f64);
        let idx = usize::min(t as usize, n - 1);
        Some((idx, t - idx as f64))
    }
}
