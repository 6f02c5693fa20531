//! Borrowed view over a captured frame.
//!
//! The capture source hands over raw bytes in B, G, R(, X) order together with
//! the frame geometry. The view validates the geometry once so pixel access
//! afterwards never goes out of bounds.

use std::fmt;

use super::Rgb;

/// Frame geometry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Only 24-bit (3) and 32-bit (4) pixels are supported.
    UnsupportedBytesPerPixel(usize),
    /// A row holds fewer bytes than `width * bytes_per_pixel`.
    StrideTooSmall { stride: usize, min: usize },
    /// The buffer is shorter than the geometry requires.
    BufferTooSmall { len: usize, need: usize },
    /// Row or buffer size does not fit in `usize`.
    GeometryOverflow,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::UnsupportedBytesPerPixel(bpp) => {
                write!(f, "Unsupported pixel size: {bpp} bytes (expected 3 or 4)")
            }
            FrameError::StrideTooSmall { stride, min } => {
                write!(f, "Frame stride {stride} is smaller than row size {min}")
            }
            FrameError::BufferTooSmall { len, need } => {
                write!(f, "Frame buffer holds {len} bytes, geometry needs {need}")
            }
            FrameError::GeometryOverflow => write!(f, "Frame geometry is too large"),
        }
    }
}

impl std::error::Error for FrameError {}

/// A validated, read-only frame view. Never outlives the caller's buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    bytes_per_pixel: usize,
}

impl<'a> Frame<'a> {
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
        bytes_per_pixel: usize,
    ) -> Result<Self, FrameError> {
        if bytes_per_pixel != 3 && bytes_per_pixel != 4 {
            return Err(FrameError::UnsupportedBytesPerPixel(bytes_per_pixel));
        }
        let row = width
            .checked_mul(bytes_per_pixel)
            .ok_or(FrameError::GeometryOverflow)?;
        if stride < row {
            return Err(FrameError::StrideTooSmall { stride, min: row });
        }
        // The last row may omit its padding.
        let need = if height == 0 {
            0
        } else {
            stride
                .checked_mul(height - 1)
                .and_then(|n| n.checked_add(row))
                .ok_or(FrameError::GeometryOverflow)?
        };
        if data.len() < need {
            return Err(FrameError::BufferTooSmall {
                len: data.len(),
                need,
            });
        }
        Ok(Frame {
            data,
            width,
            height,
            stride,
            bytes_per_pixel,
        })
    }

    /// A frame whose rows carry no padding (`stride == width * bytes_per_pixel`).
    pub fn packed(
        data: &'a [u8],
        width: usize,
        height: usize,
        bytes_per_pixel: usize,
    ) -> Result<Self, FrameError> {
        let stride = width
            .checked_mul(bytes_per_pixel)
            .ok_or(FrameError::GeometryOverflow)?;
        Self::new(data, width, height, stride, bytes_per_pixel)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at column `x`, row `y`. Both must be in range.
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let idx = y * self.stride + x * self.bytes_per_pixel;
        Rgb::new(self.data[idx + 2], self.data[idx + 1], self.data[idx])
    }

    /// Iterate every pixel row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Rgb> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| self.pixel(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_reads_bgr_order() {
        // One BGRA pixel: blue=1, green=2, red=3
        let data = [1u8, 2, 3, 0];
        let frame = Frame::packed(&data, 1, 1, 4).unwrap();
        assert_eq!(frame.pixel(0, 0), Rgb::new(3, 2, 1));
    }

    #[test]
    fn pixel_respects_stride_padding() {
        // 1x2 frame, 24-bit, stride 4 (one padding byte per row)
        let data = [0u8, 0, 10, 0xEE, 0, 0, 20, 0xEE];
        let frame = Frame::new(&data, 1, 2, 4, 3).unwrap();
        assert_eq!(frame.pixel(0, 0), Rgb::new(10, 0, 0));
        assert_eq!(frame.pixel(0, 1), Rgb::new(20, 0, 0));
    }

    #[test]
    fn last_row_padding_may_be_missing() {
        let data = [0u8, 0, 10, 0xEE, 0, 0, 20];
        assert!(Frame::new(&data, 1, 2, 4, 3).is_ok());
    }

    #[test]
    fn rejects_unsupported_bpp() {
        let err = Frame::packed(&[0u8; 8], 4, 1, 2).unwrap_err();
        assert_eq!(err, FrameError::UnsupportedBytesPerPixel(2));
    }

    #[test]
    fn rejects_small_stride() {
        let err = Frame::new(&[0u8; 64], 4, 2, 8, 4).unwrap_err();
        assert_eq!(err, FrameError::StrideTooSmall { stride: 8, min: 16 });
    }

    #[test]
    fn rejects_short_buffer() {
        let err = Frame::packed(&[0u8; 10], 2, 2, 3).unwrap_err();
        assert_eq!(err, FrameError::BufferTooSmall { len: 10, need: 12 });
    }

    #[test]
    fn huge_width_is_overflow_not_panic() {
        let err = Frame::new(&[], usize::MAX / 4 + 1, 1, 0, 4).unwrap_err();
        assert_eq!(err, FrameError::GeometryOverflow);
        let err = Frame::packed(&[], usize::MAX / 4 + 1, 1, 4).unwrap_err();
        assert_eq!(err, FrameError::GeometryOverflow);
    }

    #[test]
    fn huge_height_is_overflow_not_panic() {
        let err = Frame::new(&[0u8; 16], 1, usize::MAX, 8, 4).unwrap_err();
        assert_eq!(err, FrameError::GeometryOverflow);
    }

    #[test]
    fn empty_frame_is_valid() {
        let frame = Frame::packed(&[], 0, 0, 4).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.pixels().count(), 0);
    }

    #[test]
    fn pixels_iterates_row_major() {
        let data = [
            0u8, 0, 1, 0, 0, 2, // row 0
            0, 0, 3, 0, 0, 4, // row 1
        ];
        let frame = Frame::packed(&data, 2, 2, 3).unwrap();
        let reds: Vec<u8> = frame.pixels().map(|p| p.r).collect();
        assert_eq!(reds, vec![1, 2, 3, 4]);
    }

    #[test]
    fn display_messages() {
        assert!(
            FrameError::UnsupportedBytesPerPixel(2)
                .to_string()
                .contains("3 or 4")
        );
        assert!(
            FrameError::BufferTooSmall { len: 1, need: 2 }
                .to_string()
                .contains("needs 2")
        );
    }
}
