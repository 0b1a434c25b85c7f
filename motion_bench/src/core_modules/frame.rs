// THEORY:
// The `frame` module holds the two buffer types every stage trades in.
//
// 1.  **`RawFrame`** is whatever the frame-source collaborator hands us: gray, RGB,
//     BGR or RGBA bytes, row-major, tightly packed. It stays a "dumb" container
//     and only knows how to collapse itself into luma.
// 2.  **`Frame`** is the single-channel 8-bit image the pipeline works on. Every
//     stage takes a `Frame` by reference and returns a newly owned one, so no two
//     stages ever alias the same buffer.
// 3.  **`BinaryMask`** is the on/off output of thresholding and morphology.
//
// Both `Frame` and `BinaryMask` convert to and from `image::GrayImage` so that
// collaborators can load, save and display them with the `image` crate.

use crate::error::{Dimensions, MotionError, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Byte layout of a [`RawFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    /// OpenCV's native channel order.
    Bgr8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

// Rec. 601 luma weights in 14-bit fixed point (0.299, 0.587, 0.114).
const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B;
    ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// A frame as delivered by a frame source, before grayscale conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(MotionError::ShapeMismatch {
                expected: Dimensions::new(width, height),
                found: Dimensions::new((data.len() / format.channels().max(1)) as u32, 1),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn gray(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, PixelFormat::Gray8, data)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Collapses the frame to a single luma channel. Alpha is ignored.
    pub fn to_grayscale(&self) -> Frame {
        let data = match self.format {
            PixelFormat::Gray8 => self.data.clone(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
            PixelFormat::Bgr8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[2], px[1], px[0]))
                .collect(),
            PixelFormat::Rgba8 => self
                .data
                .chunks_exact(4)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
        };
        Frame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

impl RawFrame {
    /// The frame as an RGB image, for drawing on. Gray is replicated, alpha dropped.
    pub fn to_rgb_image(&self) -> RgbImage {
        let channels = self.format.channels();
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let at = (y as usize * self.width as usize + x as usize) * channels;
            let px = &self.data[at..at + channels];
            match self.format {
                PixelFormat::Gray8 => Rgb([px[0], px[0], px[0]]),
                PixelFormat::Rgb8 | PixelFormat::Rgba8 => Rgb([px[0], px[1], px[2]]),
                PixelFormat::Bgr8 => Rgb([px[2], px[1], px[0]]),
            }
        })
    }
}

impl From<GrayImage> for RawFrame {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        RawFrame {
            width,
            height,
            format: PixelFormat::Gray8,
            data: image.into_raw(),
        }
    }
}

/// Dense single-channel 8-bit image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(MotionError::ShapeMismatch {
                expected: Dimensions::new(width, height),
                found: Dimensions::new(data.len() as u32, 1),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let width = self.width as usize;
        self.data[y as usize * width + x as usize] = value;
    }

    /// Fails with `ShapeMismatch` unless `other` has the same dimensions.
    pub fn ensure_same_shape(&self, other: Dimensions) -> Result<()> {
        if self.dimensions() != other {
            return Err(MotionError::ShapeMismatch {
                expected: self.dimensions(),
                found: other,
            });
        }
        Ok(())
    }

    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| Luma([self.get(x, y)]))
    }
}

impl From<GrayImage> for Frame {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Frame {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// On/off image produced by thresholding and refined by morphology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub(crate) fn from_bits(width: u32, height: u32, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        let width = self.width as usize;
        self.data[y as usize * width + x as usize] = on;
    }

    /// Number of "on" pixels.
    pub fn count_on(&self) -> usize {
        self.data.iter().filter(|&&on| on).count()
    }

    /// Renders the mask as 0/255 bytes.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { u8::MAX } else { 0 }])
        })
    }
}
