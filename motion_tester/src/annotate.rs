//! Result sink for single runs: optionally renders every result with its region
//! outlines to a directory, either over the motion mask or over the input frame,
//! and keeps one sample row per frame.

use crate::report::SampleRow;
use anyhow::Context;
use image::{Rgb, RgbImage};
use motion_bench::{BoundingBox, FrameMotionResult, RawFrame, ResultSink, RunStatistics};
use std::path::PathBuf;

const MASK_ON: Rgb<u8> = Rgb([96, 96, 96]);
const OUTLINE: Rgb<u8> = Rgb([255, 48, 48]);

#[derive(Default)]
pub struct RunSink {
    annotate_dir: Option<PathBuf>,
    // Draw on the input frame instead of the mask.
    on_source: bool,
    last_source: Option<RawFrame>,
    samples: Vec<SampleRow>,
    written: usize,
    // The first write failure; later frames are skipped once one is seen.
    error: Option<anyhow::Error>,
}

impl RunSink {
    pub fn new(annotate_dir: Option<PathBuf>, on_source: bool) -> anyhow::Result<Self> {
        if let Some(dir) = &annotate_dir {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(Self {
            annotate_dir,
            on_source,
            ..Self::default()
        })
    }

    /// Surfaces the first failure to write an annotated frame, if any.
    pub fn finish(self) -> anyhow::Result<Vec<SampleRow>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(dir) = &self.annotate_dir {
            log::info!("wrote {} annotated frame(s) to {}", self.written, dir.display());
        }
        Ok(self.samples)
    }

    fn write_frame(&mut self, result: &FrameMotionResult) -> anyhow::Result<()> {
        let Some(dir) = &self.annotate_dir else {
            return Ok(());
        };
        let path = dir.join(format!("motion_{:06}.png", result.frame_index));
        let image = match (&self.last_source, self.on_source) {
            (Some(raw), true) => render_on_source(raw, result),
            _ => render(result),
        };
        image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        self.written += 1;
        Ok(())
    }
}

impl ResultSink for RunSink {
    fn on_source_frame(&mut self, raw: &RawFrame) {
        if self.on_source && self.annotate_dir.is_some() && self.error.is_none() {
            self.last_source = Some(raw.clone());
        }
    }

    fn on_frame(&mut self, result: &FrameMotionResult) {
        self.samples.push(SampleRow {
            frame: result.frame_index,
            motion_pixels: result.motion_pixel_count,
            regions: result.regions.len(),
        });
        if self.error.is_none() {
            if let Err(err) = self.write_frame(result) {
                log::error!("{err:#}");
                self.error = Some(err);
            }
        }
    }

    fn on_run_complete(&mut self, stats: &RunStatistics) {
        log::debug!("sink: run `{}` complete", stats.parameter_label);
    }
}

/// The dilated mask in gray with every retained region outlined.
pub fn render(result: &FrameMotionResult) -> RgbImage {
    let mask = &result.mask;
    let mut image = RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get(x, y) { MASK_ON } else { Rgb([0, 0, 0]) }
    });
    for region in &result.regions {
        outline(&mut image, &region.bounding_box);
    }
    image
}

/// The input frame with every retained region outlined.
pub fn render_on_source(raw: &RawFrame, result: &FrameMotionResult) -> RgbImage {
    let mut image = raw.to_rgb_image();
    for region in &result.regions {
        outline(&mut image, &region.bounding_box);
    }
    image
}

fn outline(image: &mut RgbImage, bbox: &BoundingBox) {
    // `right`/`bottom` are exclusive.
    let (right, bottom) = (bbox.right() - 1, bbox.bottom() - 1);
    for x in bbox.x..=right {
        image.put_pixel(x, bbox.y, OUTLINE);
        image.put_pixel(x, bottom, OUTLINE);
    }
    for y in bbox.y..=bottom {
        image.put_pixel(bbox.x, y, OUTLINE);
        image.put_pixel(right, y, OUTLINE);
    }
}
