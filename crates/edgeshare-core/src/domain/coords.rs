//! Resolution-independent pointer coordinates.

/// Upper bound of the normalised coordinate range.
pub const NORMALIZED_MAX: u16 = u16::MAX;

/// Maps a local pixel coordinate into `0..=65535` (`pos / length * 65535`).
///
/// Returns `None` when `length` is zero.
pub fn normalize(pos: i32, length: u32) -> Option<u16> {
    if length == 0 {
        return None;
    }
    let scaled = f64::from(pos) / f64::from(length) * f64::from(NORMALIZED_MAX);
    Some(scaled.round().clamp(0.0, f64::from(NORMALIZED_MAX)) as u16)
}

/// Maps a normalised coordinate onto a local axis of `length` pixels.
///
/// The result is clamped to `0..length`; a zero-length axis yields 0.
pub fn denormalize(value: u16, length: u32) -> i32 {
    if length == 0 {
        return 0;
    }
    let scaled = f64::from(value) / f64::from(NORMALIZED_MAX) * f64::from(length);
    let max = f64::from(length - 1);
    scaled.round().clamp(0.0, max) as i32
}
