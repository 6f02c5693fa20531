//! Color extraction strategies: full-frame average and edge sampling.

use super::{Frame, Rgb};

/// Default per-pixel channel spread below which a pixel counts as gray noise.
pub const DEFAULT_MIN_DIVERSION: u8 = 15;

/// Whether a pixel is near-gray (white, gray or black) and should be dropped.
///
/// A pixel is kept only if at least one pairwise channel difference exceeds
/// `min_diversion`.
pub fn is_gray(px: Rgb, min_diversion: u8) -> bool {
    px.r.abs_diff(px.g) <= min_diversion
        && px.r.abs_diff(px.b) <= min_diversion
        && px.g.abs_diff(px.b) <= min_diversion
}

/// Average color of all chromatic pixels in the frame.
///
/// Returns `None` when every pixel was dropped as gray noise (or the frame is
/// empty); the caller skips such frames.
pub fn average_color(frame: &Frame<'_>, min_diversion: u8) -> Option<Rgb> {
    let mut totals = [0u64; 3];
    let mut kept = 0u64;

    for px in frame.pixels() {
        if is_gray(px, min_diversion) {
            continue;
        }
        totals[0] += u64::from(px.r);
        totals[1] += u64::from(px.g);
        totals[2] += u64::from(px.b);
        kept += 1;
    }

    if kept == 0 {
        return None;
    }
    // Each average is bounded by the largest channel value, so it fits in u8.
    Some(Rgb::new(
        (totals[0] / kept) as u8,
        (totals[1] / kept) as u8,
        (totals[2] / kept) as u8,
    ))
}

/// Sample the VU meter color from the frame edges.
///
/// Scans rows top to bottom, testing the leftmost and then the rightmost pixel
/// of each row. The first non-black pixel wins; a fully black edge yields black.
pub fn edge_color(frame: &Frame<'_>) -> Rgb {
    if frame.is_empty() {
        return Rgb::BLACK;
    }
    let right = frame.width() - 1;
    for y in 0..frame.height() {
        let left_px = frame.pixel(0, y);
        if !left_px.is_black() {
            return left_px;
        }
        let right_px = frame.pixel(right, y);
        if !right_px.is_black() {
            return right_px;
        }
    }
    Rgb::BLACK
}
