//! Playback of recorded fitting sessions.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::config::FitConfig;
use crate::curve::ClosedCurve;
use crate::math::Point2d;
use crate::session::FitSession;
use crate::FitError;

/// A recording of one or more fits, each replayed from its initial anchors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub width: f64,
    pub height: f64,
    pub trails: Vec<Trail>,
}

/// One recorded fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    /// Anchors of the reference curve.
    #[serde(rename = "contourAX")]
    pub contour_x: Vec<f64>,
    #[serde(rename = "contourAY")]
    pub contour_y: Vec<f64>,
    /// Initial anchors of the fitted curve.
    #[serde(rename = "AX")]
    pub anchor_x: Vec<f64>,
    #[serde(rename = "AY")]
    pub anchor_y: Vec<f64>,
    /// Cumulative step counts at which a frame was captured.
    pub frames: Vec<u64>,
}

/// The state of a replayed fit at a captured frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Index of the trail being replayed.
    pub trail: usize,
    /// Steps taken since the trail started.
    pub tick: u64,
    pub anchors: Vec<Point2d>,
    pub total_error: f64,
}

impl ReplayLog {
    /// Parses a replay log from JSON text.
    pub fn from_json(json: &str) -> Result<Self, FitError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a replay log from a JSON stream.
    pub fn from_reader(reader: impl Read) -> Result<Self, FitError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Replays every trail, reporting the initial state and every captured
    /// frame to `on_frame`.
    pub fn run(
        &self,
        config: &FitConfig,
        mut on_frame: impl FnMut(ReplayFrame),
    ) -> Result<(), FitError> {
        for (idx, trail) in self.trails.iter().enumerate() {
            let reference = ClosedCurve::new(zip_points(&trail.contour_x, &trail.contour_y)?);
            let anchors = zip_points(&trail.anchor_x, &trail.anchor_y)?;
            let mut session = FitSession::setup(config.clone(), anchors, &reference)?;

            let mut tick = 0;
            on_frame(capture(idx, tick, &session));
            for &target in &trail.frames {
                while tick < target {
                    session.step()?;
                    tick += 1;
                }
                on_frame(capture(idx, tick, &session));
            }
        }
        Ok(())
    }
}

fn capture(trail: usize, tick: u64, session: &FitSession) -> ReplayFrame {
    ReplayFrame {
        trail,
        tick,
        anchors: session.anchors().to_vec(),
        total_error: session.total_error(),
    }
}

fn zip_points(xs: &[f64], ys: &[f64]) -> Result<Vec<Point2d>, FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::MalformedReplay(format!(
            "{} x coordinates but {} y coordinates",
            xs.len(),
            ys.len()
        )));
    }
    Ok(xs.iter().zip(ys).map(|(&x, &y)| Point2d::new(x, y)).collect())
}
