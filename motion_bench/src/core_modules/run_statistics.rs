// THEORY:
// Streaming statistics for one run. A `RunRecorder` folds the motion-pixel count
// of every frame that produced a result into a running count, sum and maximum, so
// its size does not grow with the run. `finalize` consumes it, so a closed run
// cannot be recorded into again. The resulting `RunStatistics` is immutable and is
// what the session keeps for cross-run comparison.

use crate::error::{MotionError, Result};

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStatistics {
    pub parameter_label: String,
    pub mean_motion_pixels: f64,
    pub max_motion_pixels: usize,
    /// Number of frames that contributed a sample.
    pub frames: usize,
}

/// Accumulates per-frame motion-pixel counts for the current run.
#[derive(Debug, Clone)]
pub struct RunRecorder {
    label: String,
    count: usize,
    sum: u128,
    max: usize,
}

impl RunRecorder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            count: 0,
            sum: 0,
            max: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn record(&mut self, motion_pixel_count: usize) {
        self.count += 1;
        self.sum += motion_pixel_count as u128;
        self.max = self.max.max(motion_pixel_count);
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Closes the run. Fails with `EmptyRun` if nothing was recorded.
    pub fn finalize(self) -> Result<RunStatistics> {
        if self.count == 0 {
            return Err(MotionError::EmptyRun { label: self.label });
        }
        Ok(RunStatistics {
            mean_motion_pixels: self.sum as f64 / self.count as f64,
            max_motion_pixels: self.max,
            frames: self.count,
            parameter_label: self.label,
        })
    }
}

/// One row of a cross-run comparison.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComparisonRow {
    pub parameter_label: String,
    pub mean_motion_pixels: f64,
    pub max_motion_pixels: usize,
    pub frames: usize,
    /// Mean of this run divided by the largest mean among the compared runs.
    pub relative_mean: f64,
}

/// Scales every run against the run with the largest mean.
pub fn compare(runs: &[RunStatistics]) -> Vec<ComparisonRow> {
    let peak = runs
        .iter()
        .map(|run| run.mean_motion_pixels)
        .fold(0.0f64, f64::max);

    runs.iter()
        .map(|run| ComparisonRow {
            parameter_label: run.parameter_label.clone(),
            mean_motion_pixels: run.mean_motion_pixels,
            max_motion_pixels: run.max_motion_pixels,
            frames: run.frames,
            relative_mean: if peak > 0.0 {
                run.mean_motion_pixels / peak
            } else {
                0.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn stats(label: &str, mean: f64, max: usize) -> RunStatistics {
        RunStatistics {
            parameter_label: label.into(),
            mean_motion_pixels: mean,
            max_motion_pixels: max,
            frames: 1,
        }
    }

    #[test]
    fn mean_and_max_over_samples() {
        let mut recorder = RunRecorder::new("run");
        for sample in [10, 20, 30] {
            recorder.record(sample);
        }
        assert_eq!(recorder.len(), 3);
        let stats = recorder.finalize().unwrap();
        assert_approx_eq!(stats.mean_motion_pixels, 20.0);
        assert_eq!(stats.max_motion_pixels, 30);
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.parameter_label, "run");
    }

    #[test]
    fn long_runs_are_folded_without_keeping_samples() {
        let mut recorder = RunRecorder::new("long");
        for i in 0..200_000usize {
            recorder.record(i % 1000);
        }
        assert_eq!(recorder.len(), 200_000);
        let stats = recorder.finalize().unwrap();
        assert_approx_eq!(stats.mean_motion_pixels, 499.5);
        assert_eq!(stats.max_motion_pixels, 999);
        assert_eq!(stats.frames, 200_000);
    }

    #[test]
    fn finalizing_without_samples_is_an_empty_run() {
        let err = RunRecorder::new("idle").finalize().unwrap_err();
        assert!(matches!(err, MotionError::EmptyRun { ref label } if label == "idle"));
    }

    #[test]
    fn zero_motion_samples_still_count() {
        let mut recorder = RunRecorder::new("still");
        recorder.record(0);
        recorder.record(0);
        let stats = recorder.finalize().unwrap();
        assert_eq!(stats.max_motion_pixels, 0);
        assert_approx_eq!(stats.mean_motion_pixels, 0.0);
    }

    #[test]
    fn comparison_is_relative_to_the_busiest_run() {
        let rows = compare(&[stats("a", 50.0, 80), stats("b", 200.0, 300), stats("c", 0.0, 0)]);
        assert_eq!(rows.len(), 3);
        assert_approx_eq!(rows[0].relative_mean, 0.25);
        assert_approx_eq!(rows[1].relative_mean, 1.0);
        assert_approx_eq!(rows[2].relative_mean, 0.0);
        assert_eq!(rows[1].parameter_label, "b");
    }

    #[test]
    fn all_idle_runs_compare_as_zero() {
        let rows = compare(&[stats("a", 0.0, 0)]);
        assert_approx_eq!(rows[0].relative_mean, 0.0);
    }
}
