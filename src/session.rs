use arrayvec::ArrayVec;
use itertools::iproduct;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::{EditMode, FitConfig};
use crate::contour::{contour_density, sample_contour};
use crate::controls::ControlPair;
use crate::curve::ClosedCurve;
use crate::fragment::FragmentRing;
use crate::mapping::SegmentMap;
use crate::matcher::compare;
use crate::math::{Point2d, Vector2d};
use crate::FitError;

/// The outcome of a single [FitSession::step].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// The pass over the anchors is still in progress.
    Continue,
    /// A pass over all anchors completed and improved the fit.
    FrameComplete,
    /// A pass found no improvement, so the anchors were pushed away from
    /// their centroid to escape a local minimum.
    Rescaled,
    /// Nothing improves the fit any more. The anchors were rolled back to
    /// the best fit found.
    Converged,
}

/// Work counters of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitStats {
    /// Calls to the segment matcher.
    pub compares: u64,
    /// Segment boundary moves, including those of rejected trials.
    pub relocations: u64,
    /// Calls to [FitSession::step].
    pub steps: u64,
}

/// The best fit seen so far, kept to roll back to on convergence.
#[derive(Clone, Debug)]
struct Snapshot {
    anchors: Vec<Point2d>,
    map: SegmentMap,
    error: f64,
}

/// A resumable fit of a closed curve to a contour.
///
/// Each call to [FitSession::step] searches the neighbourhood of one anchor
/// and keeps the moves that lower the error, so a caller can interleave
/// steps with rendering or stop at any time.
#[derive(Clone, Debug)]
pub struct FitSession {
    config: FitConfig,
    /// The curve being fitted.
    curve: ClosedCurve,
    /// The contour samples being matched.
    contour: Vec<Point2d>,
    fragments: FragmentRing,
    map: SegmentMap,
    /// The anchor to move next.
    pt: usize,
    /// Whether any move was kept during the current pass.
    improved: bool,
    /// The error of the current fit.
    best_error: f64,
    grand: Snapshot,
    converged: bool,
    stats: FitStats,
}

impl FitSession {
    /// Creates a session fitting `anchors` to a contour sampled from `reference`.
    pub fn setup(
        config: FitConfig,
        anchors: Vec<Point2d>,
        reference: &ClosedCurve,
    ) -> Result<Self, FitError> {
        config.validate()?;
        let contour = reference_contour(&config, reference)?;
        Self::with_contour(config, anchors, contour)
    }

    /// Creates a session fitting `anchors` to the given contour samples.
    pub fn with_contour(
        config: FitConfig,
        anchors: Vec<Point2d>,
        contour: Vec<Point2d>,
    ) -> Result<Self, FitError> {
        config.validate()?;
        if anchors.len() < 3 {
            return Err(FitError::TooFewAnchors(anchors.len()));
        }
        if contour.is_empty() {
            return Err(FitError::EmptyContour);
        }

        let curve = ClosedCurve::new(anchors);
        let fragments = FragmentRing::build(&curve, fragment_dt(&config, &curve, &contour));
        let map = SegmentMap::new(&fragments, &contour)?;
        let grand = Snapshot {
            anchors: curve.anchors().to_vec(),
            map: map.clone(),
            error: f64::INFINITY,
        };
        let mut session = Self {
            config,
            curve,
            contour,
            fragments,
            map,
            pt: 0,
            improved: false,
            best_error: f64::INFINITY,
            grand,
            converged: false,
            stats: FitStats::default(),
        };
        session.settle()?;
        Ok(session)
    }

    /// Replaces the contour with one sampled from a new reference curve.
    pub fn set_reference(&mut self, reference: &ClosedCurve) -> Result<(), FitError> {
        let contour = reference_contour(&self.config, reference)?;
        self.set_contour(contour)
    }

    /// Replaces the contour being matched and restarts the fit from the
    /// current anchors.
    pub fn set_contour(&mut self, contour: Vec<Point2d>) -> Result<(), FitError> {
        if contour.is_empty() {
            return Err(FitError::EmptyContour);
        }
        self.contour = contour;
        self.restart()
    }

    /// Rebuilds fragments and mapping from scratch for the current anchors.
    fn restart(&mut self) -> Result<(), FitError> {
        let dt = fragment_dt(&self.config, &self.curve, &self.contour);
        self.fragments = FragmentRing::build(&self.curve, dt);
        self.map = SegmentMap::new(&self.fragments, &self.contour)?;
        self.settle()
    }

    /// Matches the fresh mapping and takes it as the starting point of the fit.
    fn settle(&mut self) -> Result<(), FitError> {
        self.best_error = self.compare_current()?;
        self.grand = Snapshot {
            anchors: self.curve.anchors().to_vec(),
            map: self.map.clone(),
            error: self.best_error,
        };
        self.pt = 0;
        self.improved = false;
        self.converged = false;
        Ok(())
    }

    fn compare_current(&mut self) -> Result<f64, FitError> {
        let before = self.map.relocations();
        let result = compare(&mut self.map, &self.fragments, &self.contour, &self.config);
        self.stats.compares += 1;
        self.stats.relocations += self.map.relocations() - before;
        result
    }

    /// Tries the 8 neighbouring positions of the current anchor.
    pub fn step(&mut self) -> Result<FitStatus, FitError> {
        if self.converged {
            return Ok(FitStatus::Converged);
        }
        self.stats.steps += 1;

        let pt = self.pt;
        let step = self.config.step_size;
        let offsets: ArrayVec<Vector2d, 8> = iproduct!(-1..=1, -1..=1)
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .map(|(dx, dy)| Vector2d::new(dx as f64, dy as f64) * step)
            .collect();

        let mut origin = self.curve.anchors()[pt];
        for offset in offsets {
            self.curve.set_anchor(pt, origin + offset);
            self.fragments.rebuild(&self.curve);
            let mut trial = self.map.clone();
            trial.refresh(&self.fragments, &self.contour);

            let before = trial.relocations();
            let result = compare(&mut trial, &self.fragments, &self.contour, &self.config);
            self.stats.compares += 1;
            self.stats.relocations += trial.relocations() - before;

            match result {
                Ok(error) if error < self.best_error => {
                    trace!("anchor {} moved by {:?}, error {}", pt, offset, error);
                    origin += offset;
                    self.map = trial;
                    self.best_error = error;
                    self.improved = true;
                }
                Ok(_) => self.curve.set_anchor(pt, origin),
                Err(err) => {
                    warn!("anchor {} trial move by {:?} failed: {}", pt, offset, err);
                    self.curve.set_anchor(pt, origin);
                    self.fragments.rebuild(&self.curve);
                    return Err(err);
                }
            }
        }
        self.fragments.rebuild(&self.curve);

        self.pt += 1;
        if self.pt < self.curve.len() {
            return Ok(FitStatus::Continue);
        }
        self.pt = 0;

        if self.improved {
            self.improved = false;
            debug!("frame complete, error {}", self.best_error);
            return Ok(FitStatus::FrameComplete);
        }

        if self.best_error < self.grand.error {
            self.grand = Snapshot {
                anchors: self.curve.anchors().to_vec(),
                map: self.map.clone(),
                error: self.best_error,
            };
            self.curve.rescale_about_centroid(self.config.rescale);
            self.fragments.rebuild(&self.curve);
            self.map.refresh(&self.fragments, &self.contour);
            self.map.reset_flows();
            self.best_error = self.compare_current()?;
            debug!(
                "no improvement, rescaled by {}, error {} (best {})",
                self.config.rescale, self.best_error, self.grand.error
            );
            return Ok(FitStatus::Rescaled);
        }

        self.curve.set_anchors(self.grand.anchors.clone());
        self.fragments.rebuild(&self.curve);
        self.map = self.grand.map.clone();
        self.best_error = self.grand.error;
        self.converged = true;
        debug!("converged, error {}", self.best_error);
        Ok(FitStatus::Converged)
    }

    /// Inserts anchors until there are `count`, each in the middle of the
    /// span chosen by `mode`, and restarts the fit.
    pub fn increase_controls(&mut self, count: usize, mode: EditMode) -> Result<(), FitError> {
        while self.curve.len() < count {
            let lengths = (0..self.curve.len()).map(|i| self.fragments.section_length(i));
            let span = match mode {
                EditMode::Precise => pick(lengths, |len, best| len > best),
                EditMode::Visual => pick(lengths, |len, best| len < best),
            };
            let midpoint = self
                .fragments
                .section_midpoint(span)
                .unwrap_or_else(|| self.curve.anchors()[span]);
            self.curve.insert_anchor(span + 1, midpoint);
            debug!("inserted anchor {} at {:?}", span + 1, midpoint);
            self.restart()?;
        }
        Ok(())
    }

    /// Removes anchors until there are `count`, each shared by the pair of
    /// spans chosen by `mode`, and restarts the fit.
    pub fn decrease_controls(&mut self, count: usize, mode: EditMode) -> Result<(), FitError> {
        if count < 3 {
            return Err(FitError::TooFewAnchors(count));
        }
        while self.curve.len() > count {
            let n = self.curve.len();
            let lengths = (0..n).map(|i| {
                self.fragments.section_length(i) + self.fragments.section_length((i + 1) % n)
            });
            let pair = match mode {
                EditMode::Precise => pick(lengths, |len, best| len < best),
                EditMode::Visual => pick(lengths, |len, best| len > best),
            };
            let removed = self.curve.remove_anchor((pair + 1) % n);
            debug!("removed anchor {} at {:?}", (pair + 1) % n, removed);
            self.restart()?;
        }
        Ok(())
    }

    /// Gets the configuration.
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Gets the curve being fitted.
    pub fn curve(&self) -> &ClosedCurve {
        &self.curve
    }

    pub fn anchors(&self) -> &[Point2d] {
        self.curve.anchors()
    }

    pub fn controls(&self) -> &[ControlPair] {
        self.curve.controls()
    }

    /// Gets the contour samples being matched.
    pub fn contour(&self) -> &[Point2d] {
        &self.contour
    }

    pub fn fragments(&self) -> &FragmentRing {
        &self.fragments
    }

    pub fn mapping(&self) -> &SegmentMap {
        &self.map
    }

    /// Pairs each contour sample with the curve position it is matched to.
    pub fn correspondences(&self) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        self.contour
            .iter()
            .zip(self.map.segments())
            .map(|(sample, seg)| (*sample, self.fragments.get(seg.start).pos))
    }

    /// The error of the current fit.
    pub fn total_error(&self) -> f64 {
        self.best_error
    }

    /// The error of the best fit kept for rolling back.
    pub fn grand_error(&self) -> f64 {
        self.grand.error
    }

    /// Whether the last step reported convergence.
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn stats(&self) -> FitStats {
        self.stats
    }
}

/// Samples the contour of a reference curve.
fn reference_contour(config: &FitConfig, reference: &ClosedCurve) -> Result<Vec<Point2d>, FitError> {
    let contour = sample_contour(reference, contour_density(reference, config.ratio_contour));
    if contour.is_empty() {
        return Err(FitError::EmptyContour);
    }
    Ok(contour)
}

/// The per span parameter step giving `ratio_compare` fragments per contour sample.
fn fragment_dt(config: &FitConfig, curve: &ClosedCurve, contour: &[Point2d]) -> f64 {
    curve.len() as f64 / (contour.len() as f64 * config.ratio_compare)
}

/// Finds the index of the first value that no later value beats.
fn pick(values: impl Iterator<Item = f64>, beats: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = None;
    for (idx, value) in values.enumerate() {
        match best {
            Some((_, best_value)) if !beats(value, best_value) => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map_or(0, |(idx, _)| idx)
}
