//! Frame sources backing the tester: image sequences on disk, an optional OpenCV
//! video reader, and a synthetic moving square for trying parameters without input.

use anyhow::{Context, bail};
use image::DynamicImage;
use motion_bench::{FrameSource, PixelFormat, RawFrame};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FRAME_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Image files in `dir` with a known extension, sorted by file name.
pub fn list_frames(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let known = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if known && path.is_file() {
            frames.push(path);
        }
    }
    if frames.is_empty() {
        bail!("no image frames found in {}", dir.display());
    }
    frames.sort();
    Ok(frames)
}

fn to_raw(image: DynamicImage) -> io::Result<RawFrame> {
    let (width, height, format, data) = match image {
        DynamicImage::ImageLuma8(gray) => {
            let (w, h) = gray.dimensions();
            (w, h, PixelFormat::Gray8, gray.into_raw())
        }
        DynamicImage::ImageRgba8(rgba) => {
            let (w, h) = rgba.dimensions();
            (w, h, PixelFormat::Rgba8, rgba.into_raw())
        }
        other => {
            let rgb = other.to_rgb8();
            let (w, h) = rgb.dimensions();
            (w, h, PixelFormat::Rgb8, rgb.into_raw())
        }
    };
    RawFrame::new(width, height, format, data).map_err(io::Error::other)
}

/// Decodes one file per frame, lazily.
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    paths: Arc<[PathBuf]>,
    position: usize,
}

impl ImageDirSource {
    pub fn new(paths: Arc<[PathBuf]>) -> Self {
        Self { paths, position: 0 }
    }
}

impl FrameSource for ImageDirSource {
    type Error = io::Error;

    fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
        let Some(path) = self.paths.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        let image = image::open(path).map_err(|err| {
            io::Error::other(format!("decoding {}: {err}", path.display()))
        })?;
        to_raw(image).map(Some)
    }

    fn restart(&mut self) -> io::Result<()> {
        self.position = 0;
        Ok(())
    }
}

/// A bright square sliding left to right over a dark, slightly noisy background.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frames: u32,
    position: u32,
}

impl SyntheticSource {
    pub const SQUARE: u32 = 24;
    const STEP: u32 = 4;

    pub fn new(width: u32, height: u32, frames: u32) -> Self {
        Self {
            width,
            height,
            frames,
            position: 0,
        }
    }

    fn render(&self, index: u32) -> Vec<u8> {
        let travel = self.width.saturating_sub(Self::SQUARE).max(1);
        let left = (u64::from(index) * u64::from(Self::STEP) % u64::from(travel)) as u32;
        let top = self.height.saturating_sub(Self::SQUARE) / 2;

        // xorshift, seeded per frame so a restarted source repeats itself.
        let mut state = 0x9e37_79b9u32 ^ index.wrapping_mul(0x85eb_ca6b);
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let inside = x >= left && x < left + Self::SQUARE && y >= top && y < top + Self::SQUARE;
                let base = if inside { 220 } else { 30 };
                data.push(base + (state % 8) as u8);
            }
        }
        data
    }
}

impl FrameSource for SyntheticSource {
    type Error = io::Error;

    fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
        if self.position >= self.frames {
            return Ok(None);
        }
        let data = self.render(self.position);
        self.position += 1;
        RawFrame::gray(self.width, self.height, data)
            .map(Some)
            .map_err(io::Error::other)
    }

    fn restart(&mut self) -> io::Result<()> {
        self.position = 0;
        Ok(())
    }
}

#[cfg(feature = "opencv")]
pub use video::VideoSource;

#[cfg(feature = "opencv")]
mod video {
    use motion_bench::{FrameSource, PixelFormat, RawFrame};
    use opencv::{
        core::Mat,
        prelude::*,
        videoio::{self, VideoCapture},
    };
    use std::io;
    use std::path::PathBuf;

    fn cv_error(err: opencv::Error) -> io::Error {
        io::Error::other(err.to_string())
    }

    /// Reads frames from a video file. The file is opened on the first read.
    pub struct VideoSource {
        path: PathBuf,
        capture: Option<VideoCapture>,
    }

    impl VideoSource {
        pub fn new(path: PathBuf) -> Self {
            Self {
                path,
                capture: None,
            }
        }

        fn capture(&mut self) -> io::Result<&mut VideoCapture> {
            if self.capture.is_none() {
                let path = self.path.to_string_lossy();
                let capture = VideoCapture::from_file(&path, videoio::CAP_ANY).map_err(cv_error)?;
                if !capture.is_opened().map_err(cv_error)? {
                    return Err(io::Error::other(format!("cannot open video {path}")));
                }
                self.capture = Some(capture);
            }
            self.capture
                .as_mut()
                .ok_or_else(|| io::Error::other("video capture unavailable"))
        }
    }

    impl FrameSource for VideoSource {
        type Error = io::Error;

        fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
            let capture = self.capture()?;
            let mut frame = Mat::default();
            if !capture.read(&mut frame).map_err(cv_error)? || frame.empty() {
                return Ok(None);
            }
            let width = frame.cols() as u32;
            let height = frame.rows() as u32;
            let data = frame.data_bytes().map_err(cv_error)?.to_vec();
            RawFrame::new(width, height, PixelFormat::Bgr8, data)
                .map(Some)
                .map_err(io::Error::other)
        }

        fn restart(&mut self) -> io::Result<()> {
            self.capture()?
                .set(videoio::CAP_PROP_POS_FRAMES, 0.0)
                .map_err(cv_error)?;
            Ok(())
        }
    }
}

/// Where frames come from, resolved once so that every run of a sweep can open
/// its own independent reader.
#[derive(Debug, Clone)]
pub enum InputSpec {
    Images(Arc<[PathBuf]>),
    Synthetic { width: u32, height: u32, frames: u32 },
    #[cfg(feature = "opencv")]
    Video(PathBuf),
}

impl InputSpec {
    pub fn open(&self) -> AnySource {
        match self {
            InputSpec::Images(paths) => AnySource::Images(ImageDirSource::new(Arc::clone(paths))),
            InputSpec::Synthetic {
                width,
                height,
                frames,
            } => AnySource::Synthetic(SyntheticSource::new(*width, *height, *frames)),
            #[cfg(feature = "opencv")]
            InputSpec::Video(path) => AnySource::Video(VideoSource::new(path.clone())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputSpec::Images(paths) => format!("{} image frames", paths.len()),
            InputSpec::Synthetic { width, height, frames } => {
                format!("{frames} synthetic {width}x{height} frames")
            }
            #[cfg(feature = "opencv")]
            InputSpec::Video(path) => format!("video {}", path.display()),
        }
    }
}

pub enum AnySource {
    Images(ImageDirSource),
    Synthetic(SyntheticSource),
    #[cfg(feature = "opencv")]
    Video(VideoSource),
}

impl FrameSource for AnySource {
    type Error = io::Error;

    fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
        match self {
            AnySource::Images(source) => source.next_frame(),
            AnySource::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "opencv")]
            AnySource::Video(source) => source.next_frame(),
        }
    }

    fn restart(&mut self) -> io::Result<()> {
        match self {
            AnySource::Images(source) => source.restart(),
            AnySource::Synthetic(source) => source.restart(),
            #[cfg(feature = "opencv")]
            AnySource::Video(source) => source.restart(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn frames_are_listed_in_name_order_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_002.png", "frame_000.png", "frame_001.PNG"] {
            GrayImage::from_pixel(4, 3, Luma([7])).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let frames = list_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["frame_000.png", "frame_001.PNG", "frame_002.png"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_frames(dir.path()).is_err());
    }

    #[test]
    fn image_source_decodes_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(5, 2, Rgb([255, 0, 0]))
            .save(dir.path().join("a.png"))
            .unwrap();
        let mut source = ImageDirSource::new(list_frames(dir.path()).unwrap().into());

        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width, frame.height, frame.format), (5, 2, PixelFormat::Rgb8));
        assert_eq!(frame.to_grayscale().get(0, 0), 76);
        assert!(source.next_frame().unwrap().is_none());
        source.restart().unwrap();
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn synthetic_square_position_wraps_for_very_long_sequences() {
        let source = SyntheticSource::new(64, 48, u32::MAX);
        let last = source.render(u32::MAX - 1);
        assert_eq!(last.len(), 64 * 48);
        // (u32::MAX - 1) * 4 % 40 == 16, so the square starts at column 16.
        let top = (48 - SyntheticSource::SQUARE) / 2;
        let row = &last[(top * 64) as usize..((top + 1) * 64) as usize];
        assert!(row[15] < 100);
        assert!(row[16] >= 220);
    }

    #[test]
    fn synthetic_source_is_repeatable() {
        let mut source = SyntheticSource::new(64, 48, 3);
        let first: Vec<_> = std::iter::from_fn(|| source.next_frame().unwrap()).collect();
        assert_eq!(first.len(), 3);
        source.restart().unwrap();
        assert_eq!(source.next_frame().unwrap().as_ref(), first.first());
        assert_ne!(first[0], first[1]);
    }
}
