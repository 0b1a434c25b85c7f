// THEORY:
// The `MotionDetector` is the orchestrator of the per-frame pipeline and the only
// stateful piece of it. Its state is exactly one thing: the smoothed copy of the
// previous frame.
//
// 1.  **Startup skip**: the first frame of a sequence (or the first after `reset`)
//     has nothing to be compared against. It is smoothed, stored and answered with
//     `None`. This is a normal value, not an error.
// 2.  **Stage order**: grayscale, smooth, difference against the stored frame,
//     binarize, dilate, label, filter by area. The motion-pixel count is taken from
//     the dilated mask, before the area filter, so it measures all motion in the
//     frame and not only the motion inside surviving regions.
// 3.  **Strictly sequential**: each call finishes every stage before the stored
//     frame is replaced, so frame n+1 is always compared against frame n.
// 4.  **Fixed configuration**: the config is set at construction. A new parameter
//     tuple means a new detector.

use crate::core_modules::binarizer::threshold;
use crate::core_modules::differencer::abs_diff;
use crate::core_modules::frame::{BinaryMask, Frame, RawFrame};
use crate::core_modules::morphology::{DEFAULT_DILATE_ITERATIONS, dilate};
use crate::core_modules::region::Region;
use crate::core_modules::region_extractor::region_extractor::{extract_regions, filter_by_area};
use crate::core_modules::smoother::smooth;
use crate::error::Result;
use crate::pipeline::DetectorConfig;
use log::{debug, trace};

/// Lifecycle of a [`MotionDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// No previous frame; the next frame only primes the detector.
    Uninitialized,
    /// A previous smoothed frame is held and the next frame will be compared to it.
    Tracking,
}

/// Everything the detector learned about one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMotionResult {
    /// Position of the frame within the current sequence, counting from zero.
    pub frame_index: u64,
    /// Total "on" pixels in the dilated mask.
    pub motion_pixel_count: usize,
    /// Regions that passed the minimum-area filter, in raster order of their first pixel.
    pub regions: Vec<Region>,
    /// The dilated mask the regions were extracted from.
    pub mask: BinaryMask,
}

pub struct MotionDetector {
    config: DetectorConfig,
    previous: Option<Frame>,
    /// Frames seen since construction or the last reset.
    frame_index: u64,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            previous: None,
            frame_index: 0,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> DetectorState {
        if self.previous.is_some() {
            DetectorState::Tracking
        } else {
            DetectorState::Uninitialized
        }
    }

    /// Runs one frame through the pipeline.
    ///
    /// Returns `Ok(None)` for the priming frame of a sequence. Fails with
    /// `ShapeMismatch` if the frame's size differs from the stored previous frame,
    /// in which case the stored frame is kept.
    pub fn process_frame(&mut self, raw: RawFrame) -> Result<Option<FrameMotionResult>> {
        let smoothed = smooth(&raw.to_grayscale(), self.config.kernel_size());
        let index = self.frame_index;

        let Some(previous) = self.previous.as_ref() else {
            debug!("frame {index}: priming detector ({})", smoothed.dimensions());
            self.previous = Some(smoothed);
            self.frame_index += 1;
            return Ok(None);
        };

        let difference = abs_diff(previous, &smoothed)?;
        let mask = dilate(
            &threshold(&difference, self.config.threshold()),
            DEFAULT_DILATE_ITERATIONS,
        );
        let motion_pixel_count = mask.count_on();

        let labeled = extract_regions(&mask);
        let labeled_count = labeled.len();
        let regions = filter_by_area(labeled, self.config.min_area());

        trace!(
            "frame {index}: {motion_pixel_count} motion pixels, {} of {labeled_count} regions kept",
            regions.len()
        );

        self.previous = Some(smoothed);
        self.frame_index += 1;

        Ok(Some(FrameMotionResult {
            frame_index: index,
            motion_pixel_count,
            regions,
            mask,
        }))
    }

    /// Forgets the previous frame. The next frame primes the detector again.
    pub fn reset(&mut self) {
        debug!("resetting detector after {} frames", self.frame_index);
        self.previous = None;
        self.frame_index = 0;
    }
}
