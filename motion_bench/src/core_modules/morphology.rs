// THEORY:
// Dilation with a 3x3 square structuring element. Differencing tends to break one
// moving object into a spray of fragments (edges move, flat interiors do not); a
// couple of dilation passes stitches those fragments back into one region before
// labeling.
//
// A 3x3 square is separable, so each iteration runs as a horizontal max followed by
// a vertical max over the previous iteration's output. Pixels outside the mask count
// as "off".

use crate::core_modules::frame::BinaryMask;

/// Number of dilation passes applied by the motion detector.
pub const DEFAULT_DILATE_ITERATIONS: usize = 2;

/// Grows every "on" region by one pixel in all 8 directions, `iterations` times.
pub fn dilate(mask: &BinaryMask, iterations: usize) -> BinaryMask {
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = dilate_once(&current);
    }
    current
}

fn dilate_once(mask: &BinaryMask) -> BinaryMask {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let src = mask.as_slice();

    let mut horizontal = vec![false; width * height];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(1);
            let hi = (x + 1).min(width - 1);
            horizontal[y * width + x] = row[lo..=hi].iter().any(|&on| on);
        }
    }

    let mut out = vec![false; width * height];
    for y in 0..height {
        let lo = y.saturating_sub(1);
        let hi = (y + 1).min(height - 1);
        for x in 0..width {
            out[y * width + x] = (lo..=hi).any(|sy| horizontal[sy * width + x]);
        }
    }

    BinaryMask::from_bits(mask.width(), mask.height(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pixel_grows_to_square() {
        let mut mask = BinaryMask::new(7, 7);
        mask.set(3, 3, true);
        assert_eq!(dilate(&mask, 1).count_on(), 9);
        assert_eq!(dilate(&mask, 2).count_on(), 25);
    }

    #[test]
    fn corner_pixel_is_clipped_at_the_border() {
        let mut mask = BinaryMask::new(5, 5);
        mask.set(0, 0, true);
        let out = dilate(&mask, 1);
        assert_eq!(out.count_on(), 4);
        assert!(out.get(1, 1));
        assert!(!out.get(2, 0));
    }

    #[test]
    fn iterations_only_ever_add_pixels() {
        let mask = BinaryMask::from_fn(20, 12, |x, y| (x * 7 + y * 3) % 11 == 0);
        let mut previous = dilate(&mask, 0);
        assert_eq!(previous, mask);
        for k in 1..6 {
            let next = dilate(&mask, k);
            for (before, after) in previous.as_slice().iter().zip(next.as_slice()) {
                assert!(!before || *after);
            }
            previous = next;
        }
    }

    #[test]
    fn empty_mask_stays_empty() {
        let mask = BinaryMask::new(4, 3);
        assert_eq!(dilate(&mask, DEFAULT_DILATE_ITERATIONS).count_on(), 0);
    }
}
