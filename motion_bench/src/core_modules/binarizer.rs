// THEORY:
// Binarization turns the difference image into a motion mask. The comparison is a
// strict `>`: a difference exactly equal to the threshold is treated as noise.

use crate::core_modules::frame::{BinaryMask, Frame};

/// Marks every pixel strictly brighter than `t` as "on".
pub fn threshold(frame: &Frame, t: u8) -> BinaryMask {
    let bits = frame.as_slice().iter().map(|&p| p > t).collect();
    BinaryMask::from_bits(frame.width(), frame.height(), bits)
}
