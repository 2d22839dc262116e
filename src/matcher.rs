//! Local search for the segment mapping with the lowest error.

use log::trace;

use crate::config::{BalanceStrategy, FitConfig};
use crate::fragment::FragmentRing;
use crate::mapping::SegmentMap;
use crate::math::Point2d;
use crate::FitError;

/// Relocates segment boundaries until no further move is possible, and
/// returns the resulting total error.
///
/// Calling this again without changing the fragments or the contour makes
/// no relocations and returns the same error.
pub fn compare(
    map: &mut SegmentMap,
    fragments: &FragmentRing,
    contour: &[Point2d],
    config: &FitConfig,
) -> Result<f64, FitError> {
    let before = map.relocations();

    if config.strategy == BalanceStrategy::PrePass {
        map.balance(fragments, contour, config.max_ratio, config.max_passes)?;
    }

    let mut passes = 0;
    while map.relocate_step(fragments, contour, config.max_ratio, config.strategy) {
        passes += 1;
        if passes == config.max_passes {
            return Err(FitError::Unstable { passes });
        }
    }

    debug_assert!(map.is_consistent(fragments), "segment mapping lost consistency");
    trace!(
        "compare settled after {} passes, {} relocations",
        passes,
        map.relocations() - before
    );
    Ok(map.total_error())
}
