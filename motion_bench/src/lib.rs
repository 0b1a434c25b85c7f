// THEORY:
// This file is the main entry point for the `motion_bench` library crate.
//
// The engine answers one question per frame: how much of the picture moved since
// the previous frame, and where? It does so with plain two-frame differencing:
// grayscale, Gaussian blur, absolute difference, threshold, dilation, connected
// components, area filter. Around that core sit the pieces an experiment needs:
// validated configuration (`pipeline`), per-run statistics and cross-run
// comparison (`session`), a parallel parameter sweep (`parallel_sweep`), and the
// traits collaborators implement to feed frames in and take results out
// (`interfaces`).
//
// The individual stages in `core_modules` are public so that they can be tested
// and reused on their own, but most callers only need the re-exports below.

pub mod core_modules;
pub mod error;
pub mod interfaces;
pub mod parallel_sweep;
pub mod pipeline;
pub mod session;

pub use crate::core_modules::run_statistics::{ComparisonRow, RunRecorder, RunStatistics};
pub use crate::core_modules::smoother::KernelSize;
pub use crate::error::{Dimensions, MotionError, Result};
pub use crate::interfaces::{FrameSource, NullSink, ReportSink, ResultSink, VecSource};
pub use crate::parallel_sweep::{SweepOutcome, parameter_grid, sweep};
pub use crate::pipeline::{
    BinaryMask, BoundingBox, DetectorConfig, DetectorState, Frame, FrameMotionResult,
    MotionDetector, MotionParams, PixelFormat, RawFrame, Region, RunOptions,
};
pub use crate::session::{Session, execute_run};
