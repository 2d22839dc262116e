use serde::{Deserialize, Serialize};

use crate::FitError;

/// How segment lengths are kept within `max_ratio` of their neighbours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStrategy {
    /// Moves that would break the ratio bound ask the offending neighbour
    /// to relocate on the next pass.
    #[default]
    Inline,
    /// Lengths are balanced in a separate sweep before matching, and moves
    /// that would break the ratio bound are rejected.
    PrePass,
}

/// Which span a structural edit targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditMode {
    /// Inserts into the shortest span and removes around the longest,
    /// adding the most stress to the fit.
    Visual,
    /// Inserts into the longest span and removes around the shortest,
    /// adding the least stress to the fit.
    Precise,
}

/// Settings of a fitting session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Adjacent segments may not differ in length by more than this factor.
    pub max_ratio: f64,
    /// Contour samples per unit of reference control net length.
    pub ratio_contour: f64,
    /// Curve fragments per contour sample.
    pub ratio_compare: f64,
    /// Factor used to push anchors away from their centroid when a pass
    /// finds no improvement.
    pub rescale: f64,
    /// Distance an anchor is moved when probing its neighbourhood.
    pub step_size: f64,
    /// Upper bound on matching passes before the mapping is declared unstable.
    pub max_passes: usize,
    /// How segment length balance is maintained.
    pub strategy: BalanceStrategy,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_ratio: 1.2,
            ratio_contour: 1.0 / 6.0,
            ratio_compare: 8.0,
            rescale: 1.1,
            step_size: 1.0,
            max_passes: 10_000,
            strategy: BalanceStrategy::Inline,
        }
    }
}

impl FitConfig {
    /// Checks that the settings describe a usable session.
    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.max_ratio > 1.0) {
            return Err(FitError::InvalidConfig("max_ratio must exceed 1"));
        }
        if !(self.ratio_contour > 0.0) {
            return Err(FitError::InvalidConfig("ratio_contour must be positive"));
        }
        if !(self.ratio_compare > 1.0) {
            return Err(FitError::InvalidConfig("ratio_compare must exceed 1"));
        }
        if !(self.rescale > 1.0) {
            return Err(FitError::InvalidConfig("rescale must exceed 1"));
        }
        if !(self.step_size > 0.0) {
            return Err(FitError::InvalidConfig("step_size must be positive"));
        }
        if self.max_passes == 0 {
            return Err(FitError::InvalidConfig("max_passes must be non-zero"));
        }
        Ok(())
    }
}
