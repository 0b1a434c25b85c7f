// THEORY:
// The `Smoother` suppresses sensor noise before differencing. Two consecutive
// frames of a static scene never match byte-for-byte; a Gaussian blur pulls those
// single-pixel flickers under the binarization threshold while leaving real,
// spatially coherent changes intact.
//
// The blur is separable: a horizontal 1-D pass into a float buffer, then a vertical
// pass back to bytes. Sigma is never configured directly, it is deduced from the
// kernel extent. Borders are mirrored without repeating the edge sample
// (reflect-101), the same way for every frame of a run.

use crate::core_modules::frame::Frame;
use crate::error::{MotionError, Result};

// Fixed small-kernel weights used in place of the sigma formula.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Extent of the smoothing window. Both sides are odd and at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct KernelSize {
    width: u32,
    height: u32,
}

impl KernelSize {
    pub fn new(width: i64, height: i64) -> Result<Self> {
        Ok(Self {
            width: Self::check_side("kernel_width", width)?,
            height: Self::check_side("kernel_height", height)?,
        })
    }

    fn check_side(name: &'static str, value: i64) -> Result<u32> {
        if value <= 0 {
            return Err(MotionError::invalid(name, format!("{value} must be positive")));
        }
        if value % 2 == 0 {
            return Err(MotionError::invalid(name, format!("{value} must be odd")));
        }
        u32::try_from(value).map_err(|_| MotionError::invalid(name, format!("{value} is too large")))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl std::fmt::Display for KernelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Sigma deduced from a kernel side of `size` taps.
pub fn auto_sigma(size: u32) -> f64 {
    0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights for an odd `size`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    if size % 2 == 1 && size <= 7 {
        return SMALL_KERNELS[(size / 2) as usize].to_vec();
    }

    let sigma = auto_sigma(size);
    let scale = -0.5 / (sigma * sigma);
    let center = (size as f64 - 1.0) * 0.5;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Mirrors an out-of-range index back into `0..len` without repeating the edge.
#[inline]
fn reflect_101(mut index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    loop {
        if index < 0 {
            index = -index;
        } else if index > last {
            index = 2 * last - index;
        } else {
            return index as usize;
        }
    }
}

/// Gaussian-blurs `frame` with a window of `kernel` taps. Output has the same shape.
pub fn smooth(frame: &Frame, kernel: KernelSize) -> Frame {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    if width == 0 || height == 0 {
        return frame.clone();
    }

    let kx = gaussian_kernel(kernel.width());
    let ky = gaussian_kernel(kernel.height());
    let rx = (kx.len() / 2) as isize;
    let ry = (ky.len() / 2) as isize;
    let src = frame.as_slice();

    // Horizontal pass.
    let mut horizontal = vec![0f32; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0f32;
            for (k, weight) in kx.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - rx, width);
                acc += row[sx] as f32 * weight;
            }
            horizontal[y * width + x] = acc;
        }
    }

    // Vertical pass.
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0f32;
            for (k, weight) in ky.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - ry, height);
                acc += horizontal[sy * width + x] * weight;
            }
            out.push(acc.round().clamp(0.0, 255.0) as u8);
        }
    }

    Frame::from_parts(frame.width(), frame.height(), out)
}
