// THEORY:
// A sweep tries many parameter tuples against the same input. Runs are independent
// of each other, so they can be spread over the machine's cores, but each run on
// its own is still the strictly sequential pipeline: one source, one detector and
// one recorder, confined to a single blocking worker.
//
// Concurrency is bounded by a semaphore sized to the number of CPUs. Results are
// joined in input order and only then appended to the session, so the comparison
// list reads the same regardless of which run finished first, and the session is
// never shared between workers.

use crate::error::MotionError;
use crate::interfaces::{FrameSource, NullSink};
use crate::pipeline::{MotionParams, RunOptions};
use crate::session::{Session, execute_run};
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// What happened to each tuple of a sweep, in input order.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Labels of runs appended to the session.
    pub completed: Vec<String>,
    /// Labels of runs that produced no samples.
    pub empty: Vec<String>,
    /// Runs that failed, with the reason.
    pub failed: Vec<(String, MotionError)>,
}

/// Cartesian product of the given kernel sizes, thresholds and minimum areas.
pub fn parameter_grid(kernels: &[(i64, i64)], thresholds: &[i64], min_areas: &[i64]) -> Vec<MotionParams> {
    let mut grid = Vec::with_capacity(kernels.len() * thresholds.len() * min_areas.len());
    for &kernel in kernels {
        for &threshold in thresholds {
            for &min_area in min_areas {
                grid.push(MotionParams::new(kernel, threshold, min_area));
            }
        }
    }
    grid
}

/// Runs every tuple in `params` over a fresh source from `make_source`.
pub async fn sweep<F, S>(
    session: &mut Session,
    params: &[MotionParams],
    make_source: F,
    options: RunOptions,
) -> SweepOutcome
where
    F: Fn() -> S + Send + Sync + 'static,
    S: FrameSource + 'static,
{
    let workers = num_cpus::get().max(1);
    let permits = Arc::new(Semaphore::new(workers));
    let make_source = Arc::new(make_source);

    info!("sweep: {} configurations on {workers} workers", params.len());

    let runs = params.iter().map(|params| {
        let params = *params;
        let permits = Arc::clone(&permits);
        let make_source = Arc::clone(&make_source);

        async move {
            let label = params.label();
            let config = match params.validate() {
                Ok(config) => config,
                Err(err) => return (label, Err(err)),
            };

            // The semaphore is never closed, so acquiring only waits for a free slot.
            let permit = permits.acquire_owned().await.ok();
            let result = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let mut source = make_source();
                execute_run(config, &mut source, NullSink, options)
            })
            .await
            .map_err(MotionError::from)
            .and_then(|result| result);

            (label, result)
        }
    });

    let mut outcome = SweepOutcome::default();
    for (label, result) in join_all(runs).await {
        match result {
            Ok(stats) => {
                session.record_run(stats);
                outcome.completed.push(label);
            }
            Err(MotionError::EmptyRun { .. }) => {
                warn!("sweep: `{label}` produced no samples");
                outcome.empty.push(label);
            }
            Err(err) => {
                warn!("sweep: `{label}` failed: {err}");
                outcome.failed.push((label, err));
            }
        }
    }
    outcome
}
