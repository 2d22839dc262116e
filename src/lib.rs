pub use cgmath;
pub use config::{BalanceStrategy, EditMode, FitConfig};
pub use contour::{contour_density, sample_contour};
pub use controls::{derive_controls, ControlPair};
pub use curve::ClosedCurve;
pub use error::FitError;
pub use fragment::{Fragment, FragmentRing};
pub use mapping::{Flow, Segment, SegmentMap};
pub use matcher::compare;
pub use replay::{ReplayFrame, ReplayLog, Trail};
pub use session::{FitSession, FitStats, FitStatus};
pub use util::Interval;

mod config;
mod contour;
mod controls;
mod curve;
mod error;
mod fragment;
mod mapping;
mod matcher;
pub mod math;
mod replay;
mod session;
mod util;
