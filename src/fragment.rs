//! Subdivision of a curve into fixed parameter fragments.

use cgmath::prelude::*;

use crate::curve::ClosedCurve;
use crate::math::{steps_per_span, Point2d};

/// One fixed parameter step along the curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    /// The position at the start of the fragment.
    pub pos: Point2d,
    /// The length of the step to the next fragment.
    pub len: f64,
}

/// The fragments of a closed curve, in ring order.
///
/// Every span contributes the same number of fragments, so fragment `k`
/// belongs to span `k / steps_per_span`.
#[derive(Clone, Debug)]
pub struct FragmentRing {
    /// The parameter step within a span.
    dt: f64,
    /// The number of fragments in each span.
    steps_per_span: usize,
    /// The fragments.
    fragments: Vec<Fragment>,
}

impl FragmentRing {
    /// Fragments a curve with a parameter step of `dt` per span.
    pub fn build(curve: &ClosedCurve, dt: f64) -> Self {
        let mut ring = Self {
            dt,
            steps_per_span: steps_per_span(dt),
            fragments: vec![],
        };
        ring.rebuild(curve);
        ring
    }

    /// Fragments a curve so the whole ring has approximately `count` fragments.
    pub fn with_count(curve: &ClosedCurve, count: f64) -> Self {
        Self::build(curve, curve.len() as f64 / count)
    }

    /// Recomputes all fragments for a changed curve, keeping the parameter step.
    pub fn rebuild(&mut self, curve: &ClosedCurve) {
        let dt = self.dt;
        self.fragments.clear();
        for span in curve.spans() {
            let walk = span.step_fn(dt).walk(span.points()[0], dt);
            self.fragments.extend(walk.map(|(_, pos, delta)| Fragment {
                pos,
                len: delta.magnitude(),
            }));
        }
        debug_assert_eq!(self.fragments.len(), curve.len() * self.steps_per_span);
    }

    /// The parameter step within a span.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Gets all fragments.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Gets the fragment at `idx`.
    #[inline(always)]
    pub fn get(&self, idx: usize) -> &Fragment {
        &self.fragments[idx]
    }

    /// The length of the whole ring.
    pub fn total_length(&self) -> f64 {
        self.fragments.iter().map(|frag| frag.len).sum()
    }

    /// The fragments of the span leaving anchor `span`.
    pub fn section(&self, span: usize) -> &[Fragment] {
        let start = span * self.steps_per_span;
        &self.fragments[start..start + self.steps_per_span]
    }

    /// The length of the span leaving anchor `span`.
    pub fn section_length(&self, span: usize) -> f64 {
        self.section(span).iter().map(|frag| frag.len).sum()
    }

    /// The rounded position of the first fragment at or past the halfway
    /// parameter of a span, or the last fragment of a span too coarse to have one.
    pub fn section_midpoint(&self, span: usize) -> Option<Point2d> {
        let section = self.section(span);
        // Accumulate the parameter the same way the walk does.
        let mut t = 0.0;
        let pos = section
            .iter()
            .find(|_| {
                let half = t >= 0.5;
                t += self.dt;
                half
            })
            .or_else(|| section.last())
            .map(|frag| frag.pos)?;
        Some(Point2d::new(pos.x.round(), pos.y.round()))
    }
}
