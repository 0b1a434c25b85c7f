// THEORY:
// One error type for the whole engine. Stage-level failures (`InvalidParameter`,
// `ShapeMismatch`) end the current run and are handed straight back to the caller.
// `EmptyRun` is the odd one out: it is a reportable condition, not a broken run,
// and `is_fatal` lets orchestrators tell the two apart without matching variants.

use std::fmt;
use thiserror::Error;

/// Width and height of a frame or mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Error)]
pub enum MotionError {
    /// A configuration value is malformed. Raised before any frame is processed.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Two buffers that must share a shape do not.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: Dimensions,
        found: Dimensions,
    },

    /// Statistics were finalized without a single recorded sample.
    #[error("run `{label}` produced no motion samples")]
    EmptyRun { label: String },

    /// The frame source collaborator failed.
    #[error("frame source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A sweep worker panicked or was cancelled before finishing its run.
    #[error("sweep worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl MotionError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MotionError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the run it occurred in.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MotionError::EmptyRun { .. })
    }
}

pub type Result<T> = std::result::Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_is_not_fatal() {
        let err = MotionError::EmptyRun {
            label: "blur=3x3 thr=10 area=5".into(),
        };
        assert!(!err.is_fatal());
        assert!(MotionError::invalid("threshold", "out of range").is_fatal());
    }

    #[test]
    fn shape_mismatch_message_names_both_shapes() {
        let err = MotionError::ShapeMismatch {
            expected: Dimensions::new(10, 10),
            found: Dimensions::new(12, 8),
        };
        assert_eq!(err.to_string(), "shape mismatch: expected 10x10, found 12x8");
    }
}
