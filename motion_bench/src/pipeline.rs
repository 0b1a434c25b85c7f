// THEORY:
// The `pipeline` module is the configuration surface of the engine. A caller (CLI,
// GUI, JSON file) supplies an unchecked `MotionParams` tuple; `validate` turns it
// into a `DetectorConfig`, which is the only form the detector accepts. A run
// therefore never starts with a malformed kernel, an out-of-range threshold or a
// non-positive area limit.
//
// The defaults are the values the tool shipped with: a 15x15 blur, a threshold of
// 30 and a minimum region area of 500 pixels.

use crate::core_modules::smoother::KernelSize;
use crate::error::{MotionError, Result};

// Re-export the per-frame building blocks for the public API.
pub use crate::core_modules::frame::{BinaryMask, Frame, PixelFormat, RawFrame};
pub use crate::core_modules::morphology::DEFAULT_DILATE_ITERATIONS;
pub use crate::core_modules::motion_detector::{DetectorState, FrameMotionResult, MotionDetector};
pub use crate::core_modules::region::{BoundingBox, Region};

pub const DEFAULT_KERNEL_SIZE: (i64, i64) = (15, 15);
pub const DEFAULT_THRESHOLD: i64 = 30;
pub const DEFAULT_MIN_AREA: i64 = 500;

/// The configuration tuple as supplied by a parameter-input collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionParams {
    pub kernel_size: (i64, i64),
    pub threshold: i64,
    pub min_area: i64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_KERNEL_SIZE,
            threshold: DEFAULT_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

impl MotionParams {
    pub fn new(kernel_size: (i64, i64), threshold: i64, min_area: i64) -> Self {
        Self {
            kernel_size,
            threshold,
            min_area,
        }
    }

    /// Checks every field and produces a detector configuration.
    pub fn validate(&self) -> Result<DetectorConfig> {
        let kernel_size = KernelSize::new(self.kernel_size.0, self.kernel_size.1)?;

        let threshold = u8::try_from(self.threshold).map_err(|_| {
            MotionError::invalid("threshold", format!("{} is outside 0..=255", self.threshold))
        })?;

        if self.min_area <= 0 {
            return Err(MotionError::invalid(
                "min_area",
                format!("{} must be positive", self.min_area),
            ));
        }
        let min_area = usize::try_from(self.min_area)
            .map_err(|_| MotionError::invalid("min_area", format!("{} is too large", self.min_area)))?;

        Ok(DetectorConfig {
            kernel_size,
            threshold,
            min_area,
        })
    }

    /// Human readable parameter label, e.g. `blur=15x15 thr=30 area=500`.
    pub fn label(&self) -> String {
        format!(
            "blur={}x{} thr={} area={}",
            self.kernel_size.0, self.kernel_size.1, self.threshold, self.min_area
        )
    }
}

/// A validated, immutable detector configuration. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DetectorConfig {
    kernel_size: KernelSize,
    threshold: u8,
    min_area: usize,
}

impl DetectorConfig {
    pub fn kernel_size(&self) -> KernelSize {
        self.kernel_size
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn min_area(&self) -> usize {
        self.min_area
    }

    pub fn label(&self) -> String {
        self.params().label()
    }

    /// The tuple this configuration was validated from.
    pub fn params(&self) -> MotionParams {
        MotionParams {
            kernel_size: (
                self.kernel_size.width() as i64,
                self.kernel_size.height() as i64,
            ),
            threshold: self.threshold as i64,
            min_area: self.min_area as i64,
        }
    }
}

impl TryFrom<MotionParams> for DetectorConfig {
    type Error = MotionError;

    fn try_from(params: MotionParams) -> Result<Self> {
        params.validate()
    }
}

/// How a run walks its frame source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RunOptions {
    /// Number of passes over the sequence. Between passes the source is restarted
    /// and the detector reset, like a looping video.
    pub passes: usize,
    /// Upper bound on frames pulled from the source during the whole run.
    pub frame_limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            passes: 1,
            frame_limit: None,
        }
    }
}
