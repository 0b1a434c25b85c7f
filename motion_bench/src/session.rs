// THEORY:
// The `Session` replaces what used to be ambient global state: the list of
// finished runs and the configuration currently being tried. It is passed
// explicitly to whoever needs it.
//
// The run driver (`execute_run`) is deliberately free of the session so that the
// parallel sweep can run it on worker threads and hand results back; only the
// owner of the session appends to the comparison list.

use crate::core_modules::motion_detector::MotionDetector;
use crate::core_modules::run_statistics::{ComparisonRow, RunRecorder, RunStatistics, compare};
use crate::error::{MotionError, Result};
use crate::interfaces::{FrameSource, ReportSink, ResultSink};
use crate::pipeline::{DetectorConfig, MotionParams, RunOptions};
use log::{debug, info, warn};

/// Drives one complete run of `config` over `source`.
///
/// Every pulled frame and every produced result goes to `sink`; the finalized statistics are passed to
/// `sink.on_run_complete` and returned. A run in which no frame produced a result
/// fails with `EmptyRun`.
pub fn execute_run<S, K>(
    config: DetectorConfig,
    source: &mut S,
    mut sink: K,
    options: RunOptions,
) -> Result<RunStatistics>
where
    S: FrameSource + ?Sized,
    K: ResultSink,
{
    if options.passes == 0 {
        return Err(MotionError::invalid("passes", "a run needs at least one pass"));
    }

    let label = config.label();
    let mut detector = MotionDetector::new(config);
    let mut recorder = RunRecorder::new(label.as_str());
    let mut pulled = 0usize;

    info!("run `{label}`: starting ({} pass(es))", options.passes);

    'passes: for pass in 0..options.passes {
        if pass > 0 {
            debug!("run `{label}`: end of sequence, restarting for pass {}", pass + 1);
            source.restart().map_err(source_error)?;
            detector.reset();
        }

        loop {
            if options.frame_limit.is_some_and(|limit| pulled >= limit) {
                debug!("run `{label}`: frame limit of {pulled} reached");
                break 'passes;
            }
            let Some(raw) = source.next_frame().map_err(source_error)? else {
                break;
            };
            pulled += 1;

            sink.on_source_frame(&raw);
            if let Some(result) = detector.process_frame(raw)? {
                recorder.record(result.motion_pixel_count);
                sink.on_frame(&result);
            }
        }
    }

    let stats = recorder.finalize()?;
    info!(
        "run `{label}`: {} frames, mean {:.1}, max {} motion pixels",
        stats.frames, stats.mean_motion_pixels, stats.max_motion_pixels
    );
    sink.on_run_complete(&stats);
    Ok(stats)
}

fn source_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> MotionError {
    MotionError::Source(Box::new(err))
}

/// Owns the ordered list of finished runs and the active configuration.
#[derive(Debug, Default)]
pub struct Session {
    runs: Vec<RunStatistics>,
    active: Option<DetectorConfig>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `params` and hands out a fresh detector/recorder pair for a run
    /// driven by the caller. Finish it with [`RunRecorder::finalize`] and
    /// [`Session::record_run`].
    pub fn begin_run(&mut self, params: &MotionParams) -> Result<(MotionDetector, RunRecorder)> {
        let config = params.validate()?;
        self.active = Some(config);
        Ok((MotionDetector::new(config), RunRecorder::new(config.label())))
    }

    /// Validates `params`, runs them over `source` and appends the result.
    ///
    /// An `EmptyRun` is logged and returned without touching the comparison list.
    pub fn run<S, K>(
        &mut self,
        params: &MotionParams,
        source: &mut S,
        sink: K,
        options: RunOptions,
    ) -> Result<RunStatistics>
    where
        S: FrameSource + ?Sized,
        K: ResultSink,
    {
        let config = params.validate()?;
        self.active = Some(config);

        match execute_run(config, source, sink, options) {
            Ok(stats) => {
                self.record_run(stats.clone());
                Ok(stats)
            }
            Err(err @ MotionError::EmptyRun { .. }) => {
                warn!("{err}; it will not be compared");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Appends a finalized run to the comparison list.
    pub fn record_run(&mut self, stats: RunStatistics) {
        debug!("session: recorded run `{}`", stats.parameter_label);
        self.runs.push(stats);
    }

    pub fn runs(&self) -> &[RunStatistics] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn active_config(&self) -> Option<&DetectorConfig> {
        self.active.as_ref()
    }

    pub fn comparison(&self) -> Vec<ComparisonRow> {
        compare(&self.runs)
    }

    /// The run with the highest mean motion, first one wins ties.
    pub fn best_run(&self) -> Option<&RunStatistics> {
        self.runs.iter().reduce(|best, run| {
            if run.mean_motion_pixels > best.mean_motion_pixels {
                run
            } else {
                best
            }
        })
    }

    pub fn publish<R: ReportSink>(&self, sink: &mut R) -> std::result::Result<(), R::Error> {
        sink.publish(&self.runs)
    }

    /// Ends the session: forgets every run and the active configuration.
    pub fn clear(&mut self) {
        self.runs.clear();
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::{Frame, RawFrame};
    use crate::core_modules::motion_detector::FrameMotionResult;
    use crate::interfaces::{NullSink, VecSource};
    use assert_approx_eq::assert_approx_eq;
    use std::convert::Infallible;

    fn square_at(offset: u32) -> RawFrame {
        let mut frame = Frame::filled(24, 24, 10);
        for y in 4..10 {
            for x in offset..offset + 6 {
                frame.set(x, y, 240);
            }
        }
        RawFrame::gray(24, 24, frame.into_raw()).unwrap()
    }

    fn moving_square(frames: u32) -> VecSource {
        VecSource::new((0..frames).map(|i| square_at(2 + i * 2)).collect())
    }

    fn params() -> MotionParams {
        MotionParams::new((3, 3), 20, 10)
    }

    #[derive(Default)]
    struct Collect {
        pulled: usize,
        frames: Vec<u64>,
        completed: Vec<String>,
    }

    impl ResultSink for Collect {
        fn on_source_frame(&mut self, _raw: &RawFrame) {
            self.pulled += 1;
        }

        fn on_frame(&mut self, result: &FrameMotionResult) {
            self.frames.push(result.frame_index);
        }

        fn on_run_complete(&mut self, stats: &RunStatistics) {
            self.completed.push(stats.parameter_label.clone());
        }
    }

    #[test]
    fn run_records_every_compared_frame() {
        let mut session = Session::new();
        let mut sink = Collect::default();
        let stats = session
            .run(&params(), &mut moving_square(5), &mut sink, RunOptions::default())
            .unwrap();

        assert_eq!(stats.frames, 4);
        assert!(stats.mean_motion_pixels > 0.0);
        assert_eq!(sink.pulled, 5);
        assert_eq!(sink.frames, vec![1, 2, 3, 4]);
        assert_eq!(sink.completed, vec![params().label()]);
        assert_eq!(session.runs(), &[stats]);
        assert_eq!(session.active_config().unwrap().threshold(), 20);
    }

    #[test]
    fn extra_passes_restart_the_source_and_skip_the_first_frame_again() {
        let mut session = Session::new();
        let mut source = moving_square(3);
        let options = RunOptions {
            passes: 3,
            frame_limit: None,
        };
        let stats = session.run(&params(), &mut source, NullSink, options).unwrap();
        assert_eq!(source.restarts(), 2);
        assert_eq!(stats.frames, 6);
    }

    #[test]
    fn frame_limit_caps_the_run() {
        let options = RunOptions {
            passes: 4,
            frame_limit: Some(4),
        };
        let config = params().validate().unwrap();
        let stats = execute_run(config, &mut moving_square(3), NullSink, options).unwrap();
        // Pass one yields frames 1 and 2, pass two primes on its first frame.
        assert_eq!(stats.frames, 2);
    }

    #[test]
    fn single_frame_run_is_empty_and_not_recorded() {
        let mut session = Session::new();
        let err = session
            .run(&params(), &mut moving_square(1), NullSink, RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, MotionError::EmptyRun { .. }));
        assert!(session.is_empty());
    }

    struct Untouchable;

    impl FrameSource for Untouchable {
        type Error = Infallible;

        fn next_frame(&mut self) -> std::result::Result<Option<RawFrame>, Infallible> {
            panic!("frames must not be read for an invalid configuration");
        }

        fn restart(&mut self) -> std::result::Result<(), Infallible> {
            Ok(())
        }
    }

    #[test]
    fn invalid_parameters_fail_before_any_frame_is_read() {
        let mut session = Session::new();
        let err = session
            .run(&MotionParams::new((4, 4), 20, 10), &mut Untouchable, NullSink, RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, MotionError::InvalidParameter { .. }));
        assert!(session.active_config().is_none());
    }

    /// Yields `frames` good frames per pass, then fails the way it is told to.
    struct Failing {
        inner: VecSource,
        fail_read_after: Option<usize>,
        fail_restart: bool,
        read: usize,
    }

    impl FrameSource for Failing {
        type Error = std::io::Error;

        fn next_frame(&mut self) -> std::io::Result<Option<RawFrame>> {
            if self.fail_read_after == Some(self.read) {
                return Err(std::io::Error::other("decoder lost sync"));
            }
            self.read += 1;
            Ok(self.inner.next_frame().unwrap())
        }

        fn restart(&mut self) -> std::io::Result<()> {
            if self.fail_restart {
                return Err(std::io::Error::other("stream is not seekable"));
            }
            self.inner.restart().unwrap();
            Ok(())
        }
    }

    #[test]
    fn source_read_failure_is_fatal_and_not_recorded() {
        let mut source = Failing {
            inner: moving_square(5),
            fail_read_after: Some(1),
            fail_restart: false,
            read: 0,
        };
        let mut session = Session::new();
        let mut sink = Collect::default();
        let err = session
            .run(&params(), &mut source, &mut sink, RunOptions::default())
            .unwrap_err();

        assert!(matches!(err, MotionError::Source(_)));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("decoder lost sync"));
        assert!(session.is_empty());
        assert!(sink.completed.is_empty());
    }

    #[test]
    fn restart_failure_between_passes_is_fatal() {
        let mut source = Failing {
            inner: moving_square(3),
            fail_read_after: None,
            fail_restart: true,
            read: 0,
        };
        let options = RunOptions {
            passes: 2,
            frame_limit: None,
        };
        let mut session = Session::new();
        let mut sink = Collect::default();
        let err = session
            .run(&params(), &mut source, &mut sink, options)
            .unwrap_err();

        assert!(matches!(err, MotionError::Source(_)));
        assert!(err.is_fatal());
        // The whole first pass was processed before the restart was attempted.
        assert_eq!(sink.frames, vec![1, 2]);
        assert!(session.is_empty());
    }

    #[test]
    fn resolution_change_aborts_the_run() {
        let mut frames = vec![square_at(2), square_at(4)];
        frames.push(RawFrame::gray(8, 8, vec![0; 64]).unwrap());
        let mut session = Session::new();
        let err = session
            .run(&params(), &mut VecSource::new(frames), NullSink, RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, MotionError::ShapeMismatch { .. }));
        assert!(session.is_empty());
    }

    #[test]
    fn manual_runs_use_the_same_collection() {
        let mut session = Session::new();
        let (mut detector, mut recorder) = session.begin_run(&params()).unwrap();
        let mut source = moving_square(3);
        while let Some(raw) = source.next_frame().unwrap() {
            if let Some(result) = detector.process_frame(raw).unwrap() {
                recorder.record(result.motion_pixel_count);
            }
        }
        session.record_run(recorder.finalize().unwrap());
        assert_eq!(session.len(), 1);
        assert_eq!(session.runs()[0].frames, 2);
    }

    struct Capture(Vec<String>);

    impl ReportSink for Capture {
        type Error = Infallible;

        fn publish(&mut self, runs: &[RunStatistics]) -> std::result::Result<(), Infallible> {
            self.0 = runs.iter().map(|r| r.parameter_label.clone()).collect();
            Ok(())
        }
    }

    #[test]
    fn comparison_best_run_publish_and_clear() {
        let mut session = Session::new();
        for (label, mean) in [("a", 10.0), ("b", 40.0), ("c", 40.0)] {
            session.record_run(RunStatistics {
                parameter_label: label.into(),
                mean_motion_pixels: mean,
                max_motion_pixels: mean as usize,
                frames: 1,
            });
        }
        assert_eq!(session.best_run().unwrap().parameter_label, "b");
        assert_approx_eq!(session.comparison()[0].relative_mean, 0.25);

        let mut report = Capture(Vec::new());
        session.publish(&mut report).unwrap();
        assert_eq!(report.0, vec!["a", "b", "c"]);

        session.clear();
        assert!(session.is_empty());
    }
}
