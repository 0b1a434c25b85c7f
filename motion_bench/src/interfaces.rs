// THEORY:
// The engine's boundary with the outside world. Decoding video, drawing boxes and
// writing reports all happen elsewhere; this module only names the contracts those
// collaborators fulfil.
//
// - `FrameSource` produces raw frames until the sequence ends, and can be asked to
//   start over. Looping a video is the source's business; the detector only ever
//   sees a `reset`.
// - `ResultSink` observes the frames going in, per-frame results and finished runs
//   (live display, annotated video).
// - `ReportSink` receives the whole comparison list at the end (CSV, charts).

use crate::core_modules::frame::RawFrame;
use crate::core_modules::motion_detector::FrameMotionResult;
use crate::core_modules::run_statistics::RunStatistics;
use std::convert::Infallible;

pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The next frame, or `None` at the end of the sequence.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, Self::Error>;

    /// Rewinds to the first frame.
    fn restart(&mut self) -> Result<(), Self::Error>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    type Error = S::Error;

    fn next_frame(&mut self) -> Result<Option<RawFrame>, Self::Error> {
        (**self).next_frame()
    }

    fn restart(&mut self) -> Result<(), Self::Error> {
        (**self).restart()
    }
}

pub trait ResultSink {
    /// Called with every frame pulled from the source, before it is processed.
    fn on_source_frame(&mut self, _raw: &RawFrame) {}

    fn on_frame(&mut self, _result: &FrameMotionResult) {}

    fn on_run_complete(&mut self, _stats: &RunStatistics) {}
}

/// A sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ResultSink for NullSink {}

impl<T: ResultSink + ?Sized> ResultSink for &mut T {
    fn on_source_frame(&mut self, raw: &RawFrame) {
        (**self).on_source_frame(raw)
    }

    fn on_frame(&mut self, result: &FrameMotionResult) {
        (**self).on_frame(result)
    }

    fn on_run_complete(&mut self, stats: &RunStatistics) {
        (**self).on_run_complete(stats)
    }
}

pub trait ReportSink {
    type Error;

    fn publish(&mut self, runs: &[RunStatistics]) -> Result<(), Self::Error>;
}

/// In-memory, restartable frame sequence.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    frames: Vec<RawFrame>,
    position: usize,
    restarts: usize,
}

impl VecSource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self {
            frames,
            position: 0,
            restarts: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// How many times `restart` has been called.
    pub fn restarts(&self) -> usize {
        self.restarts
    }
}

impl FrameSource for VecSource {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<RawFrame>, Self::Error> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }

    fn restart(&mut self) -> Result<(), Self::Error> {
        self.position = 0;
        self.restarts += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_source_ends_and_restarts() {
        let frame = RawFrame::gray(1, 1, vec![9]).unwrap();
        let mut source = VecSource::new(vec![frame.clone(), frame]);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        source.restart().unwrap();
        assert_eq!(source.restarts(), 1);
        assert!(source.next_frame().unwrap().is_some());
    }
}
