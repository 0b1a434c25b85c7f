// THEORY:
// `motion_tester` is the experiment runner around `motion_bench`. It supplies the
// concrete collaborators the library only names: frame sources backed by image
// directories, video files or a synthetic scene, a result sink that writes
// annotated masks and per-frame samples, and CSV/console reports.
//
// `run` tries one configuration and can keep everything it saw. `sweep` tries the
// cartesian product of the given values (or a JSON list) in parallel and prints a
// comparison of the runs.

mod annotate;
mod report;
mod sources;

use annotate::RunSink;
use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use motion_bench::pipeline::{DEFAULT_MIN_AREA, DEFAULT_THRESHOLD};
use motion_bench::{MotionParams, RunOptions, Session, parameter_grid};
use report::{CsvReport, print_comparison, write_samples};
use sources::{InputSpec, list_frames};
use std::path::{Path, PathBuf};

const SYNTHETIC_WIDTH: u32 = 320;
const SYNTHETIC_HEIGHT: u32 = 240;

#[derive(Parser, Debug)]
#[command(name = "motion_tester", version, about = "Frame-differencing motion detection experiments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one configuration over the input.
    Run(RunArgs),
    /// Run many configurations in parallel and compare them.
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputSource {
    /// Directory of frame images, processed in file name order.
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,
    /// Video file (needs the `opencv` feature).
    #[arg(long, value_name = "FILE")]
    video: Option<PathBuf>,
    /// A bright square sliding over a dark background.
    #[arg(long)]
    synthetic: bool,
}

#[derive(Args, Debug)]
struct InputArgs {
    #[command(flatten)]
    source: InputSource,
    /// Length of the synthetic sequence.
    #[arg(long, value_name = "N", default_value_t = 60)]
    synthetic_frames: u32,
    /// Passes over the input; the source is restarted between passes.
    #[arg(long, default_value_t = 1)]
    passes: usize,
    /// Stop after this many frames.
    #[arg(long, value_name = "N")]
    max_frames: Option<usize>,
}

impl InputArgs {
    fn resolve(&self) -> anyhow::Result<InputSpec> {
        let source = &self.source;
        if let Some(dir) = &source.frames {
            return Ok(InputSpec::Images(list_frames(dir)?.into()));
        }
        if let Some(path) = &source.video {
            return video_input(path);
        }
        if source.synthetic {
            return Ok(InputSpec::Synthetic {
                width: SYNTHETIC_WIDTH,
                height: SYNTHETIC_HEIGHT,
                frames: self.synthetic_frames,
            });
        }
        bail!("no input given; use --frames, --video or --synthetic")
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            passes: self.passes,
            frame_limit: self.max_frames,
        }
    }
}

#[cfg(feature = "opencv")]
fn video_input(path: &Path) -> anyhow::Result<InputSpec> {
    Ok(InputSpec::Video(path.to_path_buf()))
}

#[cfg(not(feature = "opencv"))]
fn video_input(path: &Path) -> anyhow::Result<InputSpec> {
    bail!(
        "cannot read {}: motion_tester was built without the `opencv` feature",
        path.display()
    )
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Blur kernel as WxH, or a single odd size for a square kernel.
    #[arg(long, value_parser = parse_kernel, default_value = "15x15", allow_negative_numbers = true)]
    kernel: (i64, i64),
    /// Pixels whose difference is strictly above this are motion.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, allow_negative_numbers = true)]
    threshold: i64,
    /// Smallest region, in pixels, that is reported.
    #[arg(long, default_value_t = DEFAULT_MIN_AREA, allow_negative_numbers = true)]
    min_area: i64,
    /// Write every processed mask with region outlines as PNG into this directory.
    #[arg(long, value_name = "DIR")]
    annotate: Option<PathBuf>,
    /// Draw the region outlines over the input frames instead of the mask.
    #[arg(long, requires = "annotate")]
    annotate_source: bool,
    /// Write per-frame motion counts as CSV.
    #[arg(long, value_name = "CSV")]
    samples: Option<PathBuf>,
    /// Write the run statistics as CSV.
    #[arg(long, value_name = "CSV")]
    report: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Blur kernel to try; repeat for more.
    #[arg(long = "kernel", value_parser = parse_kernel, allow_negative_numbers = true)]
    kernels: Vec<(i64, i64)>,
    /// Threshold to try; repeat for more.
    #[arg(long = "threshold", allow_negative_numbers = true)]
    thresholds: Vec<i64>,
    /// Minimum area to try; repeat for more.
    #[arg(long = "min-area", allow_negative_numbers = true)]
    min_areas: Vec<i64>,
    /// JSON file holding a list of parameter sets, instead of the flags above.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["kernels", "thresholds", "min_areas"])]
    config: Option<PathBuf>,
    /// Write the statistics of every run as CSV.
    #[arg(long, value_name = "CSV")]
    report: Option<PathBuf>,
}

impl SweepArgs {
    fn params(&self) -> anyhow::Result<Vec<MotionParams>> {
        if let Some(path) = &self.config {
            return load_params(path);
        }
        let defaults = MotionParams::default();
        Ok(parameter_grid(
            &or_default(&self.kernels, defaults.kernel_size),
            &or_default(&self.thresholds, defaults.threshold),
            &or_default(&self.min_areas, defaults.min_area),
        ))
    }
}

fn or_default<T: Copy>(values: &[T], fallback: T) -> Vec<T> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// Parses `15x15`, `15X9` or `15`.
fn parse_kernel(value: &str) -> Result<(i64, i64), String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<i64>()
            .map_err(|err| format!("`{part}` is not a kernel size: {err}"))
    };
    match value.split_once(['x', 'X']) {
        Some((width, height)) => Ok((parse(width)?, parse(height)?)),
        None => {
            let size = parse(value)?;
            Ok((size, size))
        }
    }
}

fn load_params(path: &Path) -> anyhow::Result<Vec<MotionParams>> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let spec = args.input.resolve()?;
    let params = MotionParams::new(args.kernel, args.threshold, args.min_area);
    log::info!("running `{}` over {}", params.label(), spec.describe());

    let mut session = Session::new();
    let mut sink = RunSink::new(args.annotate, args.annotate_source)?;
    let outcome = session.run(&params, &mut spec.open(), &mut sink, args.input.run_options());
    let samples = sink.finish()?;

    match outcome {
        Ok(_) => {}
        // Already logged; an empty run has nothing to report.
        Err(err) if !err.is_fatal() => return Ok(()),
        Err(err) => {
            return Err(err).with_context(|| format!("run `{}` failed", params.label()));
        }
    }

    if let Some(path) = &args.samples {
        write_samples(path, &samples)?;
        log::info!("wrote {} sample(s) to {}", samples.len(), path.display());
    }
    print_comparison(&session.comparison())?;
    if let Some(path) = args.report {
        session.publish(&mut CsvReport::new(path))?;
    }
    Ok(())
}

async fn sweep(args: SweepArgs) -> anyhow::Result<()> {
    let spec = args.input.resolve()?;
    let params = args.params()?;
    if params.is_empty() {
        bail!("nothing to sweep");
    }
    log::info!("sweeping {} configuration(s) over {}", params.len(), spec.describe());

    let mut session = Session::new();
    let outcome = motion_bench::sweep(
        &mut session,
        &params,
        move || spec.open(),
        args.input.run_options(),
    )
    .await;

    if session.is_empty() {
        bail!(
            "no configuration produced results ({} failed, {} empty)",
            outcome.failed.len(),
            outcome.empty.len()
        );
    }
    print_comparison(&session.comparison())?;
    if let Some(best) = session.best_run() {
        println!("most motion: {}", best.parameter_label);
    }
    if !outcome.failed.is_empty() {
        log::warn!("{} configuration(s) failed", outcome.failed.len());
    }
    if let Some(path) = args.report {
        session.publish(&mut CsvReport::new(path))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Run(args) => run(args),
        Commands::Sweep(args) => sweep(args).await,
    }
}
