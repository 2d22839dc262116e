use thiserror::Error;

/// Errors that can occur while fitting a curve to a contour.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FitError {
    #[error("a closed curve needs at least 3 anchors, got {0}")]
    TooFewAnchors(usize),

    #[error("reference contour produced no samples")]
    EmptyContour,

    #[error("{fragments} curve fragments cannot cover {samples} contour samples")]
    TooFewFragments { fragments: usize, samples: usize },

    #[error("segment mapping did not stabilize after {passes} passes")]
    Unstable { passes: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("malformed replay log: {0}")]
    MalformedReplay(String),

    #[error("failed to parse replay log: {0}")]
    Json(#[from] serde_json::Error),
}
