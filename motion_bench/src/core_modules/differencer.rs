// THEORY:
// Temporal differencing: the only place two frames meet. Output pixels are the
// absolute difference of the inputs, which cannot leave 0..=255, so no clamping is
// needed. A shape check guards the invariant that a run never mixes resolutions.

use crate::core_modules::frame::Frame;
use crate::error::Result;

/// Per-pixel `|a - b|`. Fails with `ShapeMismatch` if the frames differ in size.
pub fn abs_diff(a: &Frame, b: &Frame) -> Result<Frame> {
    a.ensure_same_shape(b.dimensions())?;
    let data = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(&pa, &pb)| pa.abs_diff(pb))
        .collect();
    Ok(Frame::from_parts(a.width(), a.height(), data))
}
